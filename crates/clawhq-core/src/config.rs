//! Configuration resolution for `ClawHQ`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (`--config`, or `~/.config/clawhq/hub.toml` when present)
//! 3. Environment variables (`CLAWHQ_*`)
//! 4. CLI arguments (highest priority, applied by the binary)

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Complete hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub agents: AgentHintsConfig,
}

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    /// Externally visible base URL (e.g. `https://hq.example.com`). When
    /// unset, the base URL is derived from each request's `Host` header.
    pub public_url: Option<String>,
    pub log_level: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            public_url: None,
            log_level: "info".to_string(),
            max_body_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

/// Longest registration throttle window accepted by [`Config::validate`].
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Agent registration settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Shared passphrase agents must present to register.
    pub passphrase: String,
    /// Registrations allowed per client+name within one window.
    pub limit: u32,
    pub window_secs: u64,
    pub throttle_backend: ThrottleBackend,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            limit: 20,
            window_secs: 60,
            throttle_backend: ThrottleBackend::Sqlite,
        }
    }
}

impl fmt::Debug for RegistrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationConfig")
            .field("passphrase", &"<redacted>")
            .field("limit", &self.limit)
            .field("window_secs", &self.window_secs)
            .field("throttle_backend", &self.throttle_backend)
            .finish()
    }
}

/// Where registration rate-limit buckets live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleBackend {
    /// Shared table in the hub database; works across instances.
    Sqlite,
    /// Process-local map; single instance only.
    Memory,
}

impl FromStr for ThrottleBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("Unknown throttle backend: {other}"))),
        }
    }
}

/// Cadence hints handed to agents at registration. Fixed values, not computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentHintsConfig {
    pub heartbeat_seconds: u64,
    pub poll_seconds: u64,
}

impl Default for AgentHintsConfig {
    fn default() -> Self {
        Self {
            heartbeat_seconds: 1800,
            poll_seconds: 5,
        }
    }
}

impl Config {
    /// Reject configurations the hub cannot safely run with.
    pub fn validate(&self) -> Result<()> {
        if self.registration.passphrase.trim().is_empty() {
            return Err(Error::Config(
                "Registration passphrase must be set (CLAWHQ_REGISTRATION_PASSPHRASE)".into(),
            ));
        }
        if self.registration.limit == 0 {
            return Err(Error::Config("Registration limit must be at least 1".into()));
        }
        if self.registration.window_secs == 0 {
            return Err(Error::Config(
                "Registration window must be at least 1 second".into(),
            ));
        }
        if self.registration.window_secs > MAX_WINDOW_SECS {
            return Err(Error::Config(format!(
                "Registration window must be at most {MAX_WINDOW_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Database path from config, falling back to the platform default.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.server
            .database_path
            .clone()
            .or_else(default_database_path)
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicitly given `path` must exist; the global config file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path (`<config dir>/clawhq/hub.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("clawhq").join("hub.toml"))
}

/// Get the default database path (`<config dir>/clawhq/hub.db`).
pub fn default_database_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("clawhq").join("hub.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `CLAWHQ_*` overrides. Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    fn parsed<T: FromStr>(key: &str, val: &str) -> Option<T> {
        let parsed = val.parse().ok();
        if parsed.is_none() {
            warn!(key, "Ignoring unparseable environment override");
        }
        parsed
    }

    if let Some(val) = lookup("CLAWHQ_LISTEN_ADDR") {
        if let Some(addr) = parsed("CLAWHQ_LISTEN_ADDR", &val) {
            config.server.listen_addr = addr;
        }
    }
    if let Some(val) = lookup("CLAWHQ_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("CLAWHQ_PUBLIC_URL") {
        config.server.public_url = Some(val);
    }
    if let Some(val) = lookup("CLAWHQ_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("CLAWHQ_REGISTRATION_PASSPHRASE") {
        config.registration.passphrase = val;
    }
    if let Some(val) = lookup("CLAWHQ_REGISTRATION_LIMIT") {
        if let Some(n) = parsed("CLAWHQ_REGISTRATION_LIMIT", &val) {
            config.registration.limit = n;
        }
    }
    if let Some(val) = lookup("CLAWHQ_REGISTRATION_WINDOW_SECS") {
        if let Some(n) = parsed("CLAWHQ_REGISTRATION_WINDOW_SECS", &val) {
            config.registration.window_secs = n;
        }
    }
    if let Some(val) = lookup("CLAWHQ_THROTTLE_BACKEND") {
        if let Some(backend) = parsed("CLAWHQ_THROTTLE_BACKEND", &val) {
            config.registration.throttle_backend = backend;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_registration_contract() {
        let config = Config::default();
        assert_eq!(config.registration.limit, 20);
        assert_eq!(config.registration.window_secs, 60);
        assert_eq!(config.agents.heartbeat_seconds, 1800);
        assert_eq!(config.agents.poll_seconds, 5);
        assert_eq!(config.registration.throttle_backend, ThrottleBackend::Sqlite);
    }

    #[test]
    fn empty_passphrase_is_rejected() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.registration.passphrase = "   ".into();
        assert!(config.validate().is_err());

        config.registration.passphrase = "change-me".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn window_must_be_between_one_second_and_one_day() {
        let mut config = Config::default();
        config.registration.passphrase = "change-me".into();

        config.registration.window_secs = 0;
        assert!(config.validate().is_err());

        config.registration.window_secs = MAX_WINDOW_SECS;
        assert!(config.validate().is_ok());

        config.registration.window_secs = MAX_WINDOW_SECS + 1;
        assert!(config.validate().is_err());

        config.registration.window_secs = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.toml");
        std::fs::write(
            &path,
            "[registration]\npassphrase = \"from-file\"\nlimit = 3\n\n[server]\npublic_url = \"https://hq.example.com\"\n",
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.registration.passphrase, "from-file");
        assert_eq!(config.registration.limit, 3);
        assert_eq!(config.registration.window_secs, 60);
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://hq.example.com")
        );
        assert_eq!(config.server.listen_addr.port(), 8080);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut config = Config::default();
        config.registration.passphrase = "from-file".into();

        apply_env_overrides(
            &mut config,
            env(&[
                ("CLAWHQ_REGISTRATION_PASSPHRASE", "from-env"),
                ("CLAWHQ_REGISTRATION_LIMIT", "7"),
                ("CLAWHQ_THROTTLE_BACKEND", "memory"),
                ("CLAWHQ_LISTEN_ADDR", "127.0.0.1:9000"),
            ]),
        );

        assert_eq!(config.registration.passphrase, "from-env");
        assert_eq!(config.registration.limit, 7);
        assert_eq!(config.registration.throttle_backend, ThrottleBackend::Memory);
        assert_eq!(config.server.listen_addr.port(), 9000);
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("CLAWHQ_REGISTRATION_LIMIT", "lots"),
                ("CLAWHQ_THROTTLE_BACKEND", "redis"),
            ]),
        );
        assert_eq!(config.registration.limit, 20);
        assert_eq!(config.registration.throttle_backend, ThrottleBackend::Sqlite);
    }

    #[test]
    fn debug_output_redacts_passphrase() {
        let mut config = Config::default();
        config.registration.passphrase = "super-secret".into();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

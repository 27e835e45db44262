//! Bearer token codec.
//!
//! Tokens look like `chq_<agent-id>.<secret>`, where the secret is 32 random
//! bytes encoded as URL-safe base64 without padding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

/// Fixed prefix of every hub bearer token.
pub const TOKEN_PREFIX: &str = "chq_";

/// Raw entropy per secret, in bytes.
pub const SECRET_BYTES: usize = 32;

/// Shortest encoded secret `parse` accepts.
pub const MIN_SECRET_LEN: usize = 24;

/// A freshly minted token and the secret embedded in it.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub secret: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[redacted]")
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Components recovered from a well-formed token.
#[derive(Clone, PartialEq, Eq)]
pub struct ParsedToken {
    pub agent_id: i64,
    pub secret: String,
}

impl fmt::Debug for ParsedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedToken")
            .field("agent_id", &self.agent_id)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Mint a new token for `agent_id` from the OS random source.
pub fn issue(agent_id: i64) -> IssuedToken {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let secret = URL_SAFE_NO_PAD.encode(bytes);

    IssuedToken {
        token: format!("{TOKEN_PREFIX}{agent_id}.{secret}"),
        secret,
    }
}

/// Split a presented token into agent id and secret.
///
/// Returns `None` for anything that is not exactly prefix, digits, `.`, and
/// at least [`MIN_SECRET_LEN`] URL-safe characters after one trim.
pub fn parse(token: &str) -> Option<ParsedToken> {
    let rest = token.trim().strip_prefix(TOKEN_PREFIX)?;
    let (id, secret) = rest.split_once('.')?;

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if secret.len() < MIN_SECRET_LEN || !secret.bytes().all(is_url_safe) {
        return None;
    }

    let agent_id = id.parse::<i64>().ok()?;
    Some(ParsedToken {
        agent_id,
        secret: secret.to_string(),
    })
}

const fn is_url_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

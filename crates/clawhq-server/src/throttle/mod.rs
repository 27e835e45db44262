//! Fixed-window registration throttle.
//!
//! Each key owns a bucket `{count, expires_at}`. A bucket whose window has
//! lapsed is treated as fresh. Rejections never increment the counter.
//!
//! Two requests racing on the same key can both read the same count before
//! either writes, so the limit is enforced best-effort under concurrency.
//! A burst at the end of one window followed by a burst at the start of the
//! next can admit up to twice the limit.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use clawhq_core::db::unix_timestamp;
use sha2::{Digest, Sha256};
use tracing::debug;

pub use memory::MemoryBucketStore;

/// Prefix applied to hashed throttle keys before they reach a store.
pub const KEY_PREFIX: &str = "clawhq_reg_limit_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub count: u32,
    /// Unix timestamp at which the window closes.
    pub expires_at: i64,
}

/// Errors raised by a bucket store.
#[derive(Debug, thiserror::Error)]
pub enum ThrottleError {
    #[error("bucket store error: {0}")]
    Store(String),
}

impl From<clawhq_core::db::DatabaseError> for ThrottleError {
    fn from(e: clawhq_core::db::DatabaseError) -> Self {
        Self::Store(e.to_string())
    }
}

/// Key/value storage for throttle buckets with per-entry TTL.
///
/// Entries whose TTL has elapsed must read back as absent.
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bucket>, ThrottleError>;

    async fn put(&self, key: &str, bucket: Bucket, ttl_secs: i64) -> Result<(), ThrottleError>;
}

/// Outcome of a consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected { retry_after_secs: i64 },
}

impl Decision {
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Fixed-window limiter over a shared [`BucketStore`].
#[derive(Clone)]
pub struct RegistrationThrottle {
    store: Arc<dyn BucketStore>,
    limit: u32,
    window_secs: i64,
}

impl RegistrationThrottle {
    pub fn new(store: Arc<dyn BucketStore>, limit: u32, window_secs: i64) -> Self {
        Self {
            store,
            limit: limit.max(1),
            window_secs: window_secs.max(1),
        }
    }

    /// Consume one attempt for `key` against the wall clock.
    pub async fn consume(&self, key: &str) -> Result<Decision, ThrottleError> {
        self.consume_at(key, unix_timestamp()).await
    }

    /// Consume one attempt for `key` as of `now` (unix seconds).
    pub async fn consume_at(&self, key: &str, now: i64) -> Result<Decision, ThrottleError> {
        let storage_key = storage_key(key);

        let mut bucket = match self.store.get(&storage_key).await? {
            Some(bucket) if bucket.expires_at > now => bucket,
            _ => Bucket {
                count: 0,
                expires_at: now.saturating_add(self.window_secs),
            },
        };

        let remaining = bucket.expires_at.saturating_sub(now).max(1);

        if bucket.count >= self.limit {
            debug!(retry_after = remaining, "Registration throttle tripped");
            return Ok(Decision::Rejected {
                retry_after_secs: remaining,
            });
        }

        bucket.count += 1;
        self.store.put(&storage_key, bucket, remaining).await?;
        Ok(Decision::Accepted)
    }
}

/// Namespace and hash a caller-derived key so raw addresses and names never
/// reach the store.
pub fn storage_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{KEY_PREFIX}{hex}")
}

/// Throttle key for a registration attempt: `<client>:<lowercased name>`.
pub fn registration_key(client: Option<&str>, agent_name: &str) -> String {
    let client = client.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("unknown");
    format!("{client}:{}", agent_name.to_lowercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn throttle(limit: u32, window_secs: i64) -> RegistrationThrottle {
        RegistrationThrottle::new(Arc::new(MemoryBucketStore::new()), limit, window_secs)
    }

    #[tokio::test]
    async fn fourth_attempt_in_window_is_rejected() {
        let throttle = throttle(3, 60);
        let now = 1_000_000;

        for _ in 0..3 {
            assert_eq!(throttle.consume_at("k", now).await.unwrap(), Decision::Accepted);
        }
        assert_eq!(
            throttle.consume_at("k", now + 10).await.unwrap(),
            Decision::Rejected {
                retry_after_secs: 50
            }
        );
    }

    #[tokio::test]
    async fn window_expiry_resets_the_bucket() {
        let throttle = throttle(3, 60);
        let now = 1_000_000;

        for _ in 0..3 {
            throttle.consume_at("k", now).await.unwrap();
        }
        assert!(!throttle.consume_at("k", now + 59).await.unwrap().is_accepted());
        assert!(throttle.consume_at("k", now + 60).await.unwrap().is_accepted());
        assert!(throttle.consume_at("k", now + 61).await.unwrap().is_accepted());
    }

    #[tokio::test]
    async fn rejections_do_not_extend_the_count() {
        let throttle = throttle(1, 60);
        let now = 1_000_000;

        assert!(throttle.consume_at("k", now).await.unwrap().is_accepted());
        for offset in 1..5 {
            assert!(!throttle.consume_at("k", now + offset).await.unwrap().is_accepted());
        }
        // Window still closes at the original boundary.
        assert!(throttle.consume_at("k", now + 60).await.unwrap().is_accepted());
    }

    #[tokio::test]
    async fn retry_after_is_at_least_one_second() {
        let throttle = throttle(1, 60);
        let now = 1_000_000;

        throttle.consume_at("k", now).await.unwrap();
        let decision = throttle.consume_at("k", now + 59).await.unwrap();
        assert_eq!(
            decision,
            Decision::Rejected {
                retry_after_secs: 1
            }
        );
    }

    #[tokio::test]
    async fn oversized_window_saturates_instead_of_overflowing() {
        let throttle = throttle(1, i64::MAX);
        let now = 1_000_000;

        assert!(throttle.consume_at("k", now).await.unwrap().is_accepted());
        assert_eq!(
            throttle.consume_at("k", now + 10).await.unwrap(),
            Decision::Rejected {
                retry_after_secs: i64::MAX - now - 10
            }
        );
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let throttle = throttle(1, 60);
        let now = 1_000_000;

        assert!(throttle.consume_at("a", now).await.unwrap().is_accepted());
        assert!(throttle.consume_at("b", now).await.unwrap().is_accepted());
        assert!(!throttle.consume_at("a", now).await.unwrap().is_accepted());
    }

    #[test]
    fn storage_key_is_prefixed_sha256_hex() {
        let key = storage_key("127.0.0.1:openclaw-main");
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_PREFIX.len() + 64);
        assert!(!key.contains("openclaw"));
        assert_eq!(key, storage_key("127.0.0.1:openclaw-main"));
    }

    #[test]
    fn registration_key_lowercases_name_and_defaults_client() {
        assert_eq!(registration_key(Some("10.0.0.1"), "OpenClaw"), "10.0.0.1:openclaw");
        assert_eq!(registration_key(None, "Bot"), "unknown:bot");
        assert_eq!(registration_key(Some(" "), "bot"), "unknown:bot");
    }
}

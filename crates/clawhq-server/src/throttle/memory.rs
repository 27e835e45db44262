//! In-process bucket store for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use clawhq_core::db::unix_timestamp;
use tokio::sync::Mutex;

use super::{Bucket, BucketStore, ThrottleError};

/// Writes between sweeps of lapsed entries.
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Default)]
struct Entries {
    buckets: HashMap<String, (Bucket, i64)>,
    writes: u64,
}

#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    entries: Mutex<Entries>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get_at(&self, key: &str, now: i64) -> Option<Bucket> {
        let mut entries = self.entries.lock().await;
        match entries.buckets.get(key) {
            Some((bucket, ttl_expires_at)) if *ttl_expires_at > now => Some(*bucket),
            Some(_) => {
                entries.buckets.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put_at(&self, key: &str, bucket: Bucket, ttl_secs: i64, now: i64) {
        let ttl_expires_at = now.saturating_add(ttl_secs.max(1));
        let mut entries = self.entries.lock().await;

        entries.writes = entries.writes.wrapping_add(1);
        if entries.writes % SWEEP_INTERVAL == 0 {
            entries.buckets.retain(|_, (_, expires)| *expires > now);
        }

        entries
            .buckets
            .insert(key.to_string(), (bucket, ttl_expires_at));
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.buckets.len()
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn get(&self, key: &str) -> Result<Option<Bucket>, ThrottleError> {
        Ok(self.get_at(key, unix_timestamp()).await)
    }

    async fn put(&self, key: &str, bucket: Bucket, ttl_secs: i64) -> Result<(), ThrottleError> {
        self.put_at(key, bucket, ttl_secs, unix_timestamp()).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryBucketStore::new();
        let bucket = Bucket {
            count: 2,
            expires_at: unix_timestamp() + 60,
        };
        store.put("k", bucket, 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(bucket));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_entry() {
        let store = MemoryBucketStore::new();
        let expires_at = unix_timestamp() + 60;
        store.put("k", Bucket { count: 1, expires_at }, 60).await.unwrap();
        store.put("k", Bucket { count: 2, expires_at }, 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap().count, 2);
    }

    #[tokio::test]
    async fn lapsed_entries_read_back_absent() {
        let store = MemoryBucketStore::new();
        let bucket = Bucket {
            count: 1,
            expires_at: 1_060,
        };
        store.put_at("k", bucket, 60, 1_000).await;

        assert_eq!(store.get_at("k", 1_059).await, Some(bucket));
        assert_eq!(store.get_at("k", 1_060).await, None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn writes_sweep_entries_whose_ttl_lapsed() {
        let store = MemoryBucketStore::new();
        let start = 1_000;
        let bucket = Bucket {
            count: 1,
            expires_at: start + 1,
        };

        for i in 0..2 * SWEEP_INTERVAL {
            store.put_at(&format!("name-{i}"), bucket, 1, start).await;
        }
        assert_eq!(store.len().await, 2 * SWEEP_INTERVAL as usize);

        let later = start + 10;
        for _ in 0..SWEEP_INTERVAL {
            store.put_at("fresh", bucket, 60, later).await;
        }
        assert_eq!(store.len().await, 1);
        assert!(store.get_at("fresh", later).await.is_some());
    }

    #[tokio::test]
    async fn huge_ttl_saturates() {
        let store = MemoryBucketStore::new();
        let bucket = Bucket {
            count: 1,
            expires_at: i64::MAX,
        };
        store.put("k", bucket, i64::MAX).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(bucket));
    }
}

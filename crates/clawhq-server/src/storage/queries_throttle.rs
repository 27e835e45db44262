//! Rate-limit bucket persistence for the `ClawHQ` hub.
//!
//! Backs [`BucketStore`] so the registration throttle is shared by every
//! server process using the same database. Lapsed rows are purged on each
//! write through the `ttl_expires_at` index.

use async_trait::async_trait;
use clawhq_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use crate::throttle::{Bucket, BucketStore, ThrottleError};

#[derive(sqlx::FromRow)]
struct BucketRow {
    count: i64,
    window_expires_at: i64,
}

impl HubDatabase {
    // =========================================================================
    // Throttle bucket queries
    // =========================================================================

    /// Read a bucket, ignoring entries whose TTL has passed as of `now`.
    pub async fn get_bucket(&self, key: &str, now: i64) -> Result<Option<Bucket>, DatabaseError> {
        let row = sqlx::query_as::<_, BucketRow>(
            "SELECT count, window_expires_at FROM rate_limit_buckets WHERE key = ? AND ttl_expires_at > ?",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| Bucket {
            count: u32::try_from(r.count).unwrap_or(u32::MAX),
            expires_at: r.window_expires_at,
        }))
    }

    /// Insert or replace a bucket with an absolute TTL deadline.
    pub async fn put_bucket(
        &self,
        key: &str,
        bucket: Bucket,
        ttl_expires_at: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO rate_limit_buckets (key, count, window_expires_at, ttl_expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                count = excluded.count,
                window_expires_at = excluded.window_expires_at,
                ttl_expires_at = excluded.ttl_expires_at",
        )
        .bind(key)
        .bind(i64::from(bucket.count))
        .bind(bucket.expires_at)
        .bind(ttl_expires_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Delete buckets whose TTL passed before `now`. Returns rows removed.
    pub async fn purge_expired_buckets(&self, now: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM rate_limit_buckets WHERE ttl_expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BucketStore for HubDatabase {
    async fn get(&self, key: &str) -> Result<Option<Bucket>, ThrottleError> {
        Ok(self.get_bucket(key, unix_timestamp()).await?)
    }

    async fn put(&self, key: &str, bucket: Bucket, ttl_secs: i64) -> Result<(), ThrottleError> {
        let now = unix_timestamp();
        self.put_bucket(key, bucket, now.saturating_add(ttl_secs.max(1)))
            .await?;
        self.purge_expired_buckets(now).await?;
        Ok(())
    }
}

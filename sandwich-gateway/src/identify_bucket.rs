//! The per-bot IDENTIFY concurrency bucket.
//!
//! Discord buckets IDENTIFY by `shard_id % max_concurrency`: shards that land
//! in the same bucket must IDENTIFY one at a time, shards in different
//! buckets may IDENTIFY concurrently. This is owned by the Manager (one
//! bucket array per bot token) rather than by any individual ShardGroup, so
//! that a rolling reshard's old and new ShardGroups share the same budget
//! instead of each getting their own.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Minimum time a shard must hold its bucket permit before another shard in
/// the same bucket may IDENTIFY.
const IDENTIFY_HOLD: Duration = Duration::from_secs(5);

pub struct IdentifyBucket {
    buckets: Vec<Arc<Semaphore>>,
}

impl IdentifyBucket {
    pub fn new(max_concurrency: u32) -> Self {
        let max_concurrency = max_concurrency.max(1) as usize;
        let buckets = (0..max_concurrency).map(|_| Arc::new(Semaphore::new(1))).collect();
        Self { buckets }
    }

    pub fn max_concurrency(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Acquire the bucket for `shard_id`, blocking until it is free. The
    /// permit is released automatically after the identify hold window so
    /// callers don't need to remember to drop it at the right time.
    pub async fn acquire(&self, shard_id: u32) {
        let index = (shard_id as usize) % self.buckets.len();
        let semaphore = self.buckets[index].clone();
        let permit = semaphore.acquire_owned().await.expect("bucket semaphore never closes");
        tokio::spawn(async move {
            sleep(IDENTIFY_HOLD).await;
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn same_bucket_serializes_identify() {
        let bucket = Arc::new(IdentifyBucket::new(1));
        bucket.acquire(0).await;

        let bucket_clone = bucket.clone();
        let second = tokio::spawn(async move {
            bucket_clone.acquire(1).await; // 1 % 1 == 0, same bucket as shard 0
        });

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!second.is_finished());

        tokio::time::advance(IDENTIFY_HOLD).await;
        second.await.unwrap();
    }

    #[tokio::test]
    async fn different_buckets_identify_concurrently() {
        let bucket = IdentifyBucket::new(4);
        bucket.acquire(0).await;
        // Shard 1 lands in a different bucket and must not block.
        tokio::time::timeout(Duration::from_millis(50), bucket.acquire(1))
            .await
            .expect("different bucket should not block");
    }
}

//! A cohort of shards sharing a fixed `{ids, total_count}` and an IDENTIFY
//! budget, with a single readiness gate.
//!
//! A rolling reshard works by starting a brand new `ShardGroup` alongside
//! the one currently serving traffic; once every shard in the new group has
//! reached `READY`, its floodgate opens and the old group is closed. Both
//! groups' shards share the owning Manager's [`crate::identify_bucket::IdentifyBucket`],
//! so the new group's IDENTIFYs queue behind whatever the old group is still
//! doing instead of racing it for the same budget.

use crate::error::GatewayError;
use crate::shard::{Shard, ShardConfig, ShardContext, ShardState};
use dashmap::DashMap;
use sandwich_model::Snowflake;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

struct ShardRunner {
    shard: Arc<Shard>,
    handle: JoinHandle<Result<(), GatewayError>>,
}

/// Identifies a `ShardGroup` within its owning Manager. Auto-incremented by
/// the Manager each time a group is started.
pub type ShardGroupId = u32;

pub struct ShardGroupConfig {
    pub shard_ids: Vec<u32>,
    pub shard_count: u32,
    pub shard_config: ShardConfig,
}

/// A running cohort of shards. `floodgate` starts closed: every shard still
/// publishes nothing downstream, only updating the shared state cache,
/// until the whole cohort has reported ready.
pub struct ShardGroup {
    id: ShardGroupId,
    shard_ids: Vec<u32>,
    shard_count: u32,
    shards: DashMap<u32, ShardRunner>,
    floodgate: Arc<AtomicBool>,
}

impl ShardGroup {
    /// Spawns every shard in `config.shard_ids` and returns once they have
    /// all been launched (not once they are ready — call
    /// [`ShardGroup::wait_until_ready`] for that).
    pub fn start(
        id: ShardGroupId,
        config: ShardGroupConfig,
        context_for: impl Fn() -> ShardContext,
    ) -> Self {
        let floodgate = Arc::new(AtomicBool::new(false));
        let shards = DashMap::new();

        for &shard_id in &config.shard_ids {
            let mut ctx = context_for();
            ctx.floodgate = floodgate.clone();
            let shard = Arc::new(Shard::new(
                shard_id,
                config.shard_count,
                config.shard_config.clone(),
                ctx,
            ));

            let shard_clone = shard.clone();
            let handle = tokio::spawn(async move { shard_clone.run().await });

            shards.insert(shard_id, ShardRunner { shard, handle });
            info!(group_id = id, shard_id, "shard spawned");
        }

        Self {
            id,
            shard_ids: config.shard_ids,
            shard_count: config.shard_count,
            shards,
            floodgate,
        }
    }

    pub fn id(&self) -> ShardGroupId {
        self.id
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    pub fn shard_ids(&self) -> &[u32] {
        &self.shard_ids
    }

    pub fn is_floodgated(&self) -> bool {
        self.floodgate.load(Ordering::SeqCst)
    }

    pub fn shard_state(&self, shard_id: u32) -> Option<ShardState> {
        self.shards.get(&shard_id).map(|r| r.shard.state())
    }

    pub fn shard(&self, shard_id: u32) -> Option<Arc<Shard>> {
        self.shards.get(&shard_id).map(|r| r.shard.clone())
    }

    pub fn owns_guild(&self, guild_id: Snowflake) -> bool {
        self.shards.iter().any(|r| r.shard.owns_guild(guild_id))
    }

    pub fn guild_count(&self) -> usize {
        self.shards.iter().map(|r| r.shard.owned_guild_count()).sum()
    }

    /// Waits for every shard in the cohort to reach `READY`/`RESUMED`, then
    /// opens the floodgate. Returns once the gate is open; the caller
    /// doesn't need to poll `is_floodgated` afterward.
    pub async fn wait_until_ready(&self) {
        let waiters: Vec<_> = self
            .shards
            .iter()
            .map(|r| {
                let shard = r.shard.clone();
                async move { shard.wait_for_ready().await }
            })
            .collect();
        futures_util::future::join_all(waiters).await;
        self.floodgate.store(true, Ordering::SeqCst);
        info!(group_id = self.id, "shard group fully ready, floodgate open");
    }

    /// Requests every shard stop, then closes their sockets with code 1000
    /// by waiting for their run loops to exit. The floodgate is closed
    /// first so a shard racing to publish during teardown sees it drop.
    pub async fn close(&self) {
        self.floodgate.store(false, Ordering::SeqCst);
        for entry in self.shards.iter() {
            entry.shard.shutdown();
        }

        let ids: Vec<u32> = self.shards.iter().map(|r| *r.key()).collect();
        for shard_id in ids {
            if let Some((_, runner)) = self.shards.remove(&shard_id) {
                if let Err(e) = runner.handle.await {
                    error!(group_id = self.id, shard_id, error = %e, "shard task panicked during close");
                }
            }
        }
        info!(group_id = self.id, "shard group closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchTable;
    use crate::identify_bucket::IdentifyBucket;
    use parking_lot::RwLock;
    use sandwich_producer::LocalProducer;
    use sandwich_state::{CacheConfig, SandwichState};
    use std::collections::HashSet;

    fn base_context() -> ShardContext {
        ShardContext {
            state: Arc::new(SandwichState::new(CacheConfig::default())),
            dispatch: Arc::new(DispatchTable::new()),
            identify_bucket: Arc::new(IdentifyBucket::new(1)),
            producer: Arc::new(LocalProducer::new(Default::default())),
            channel_name: "test".to_string(),
            manager_name: "test-manager".to_string(),
            event_blacklist: Arc::new(RwLock::new(HashSet::new())),
            produce_blacklist: Arc::new(RwLock::new(HashSet::new())),
            floodgate: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn new_group_starts_without_floodgate() {
        let group = ShardGroup {
            id: 0,
            shard_ids: vec![0, 1],
            shard_count: 2,
            shards: DashMap::new(),
            floodgate: Arc::new(AtomicBool::new(false)),
        };
        assert!(!group.is_floodgated());
        assert_eq!(group.guild_count(), 0);
    }

    #[tokio::test]
    async fn wait_until_ready_opens_the_floodgate_once_every_shard_reports() {
        let floodgate = Arc::new(AtomicBool::new(false));
        let mut ctx_a = base_context();
        ctx_a.floodgate = floodgate.clone();
        let mut ctx_b = base_context();
        ctx_b.floodgate = floodgate.clone();

        let config = ShardConfig::new("token", sandwich_model::Intents::GUILDS);
        let shard_a = Arc::new(Shard::new(0, 2, config.clone(), ctx_a));
        let shard_b = Arc::new(Shard::new(1, 2, config, ctx_b));

        let shards = DashMap::new();
        // Give each a trivially-completed handle since we aren't calling run().
        shards.insert(
            0,
            ShardRunner {
                shard: shard_a.clone(),
                handle: tokio::spawn(async { Ok(()) }),
            },
        );
        shards.insert(
            1,
            ShardRunner {
                shard: shard_b.clone(),
                handle: tokio::spawn(async { Ok(()) }),
            },
        );

        let group = ShardGroup {
            id: 0,
            shard_ids: vec![0, 1],
            shard_count: 2,
            shards,
            floodgate,
        };

        let wait_handle = tokio::spawn({
            let group = Arc::new(group);
            let group_for_wait = group.clone();
            async move {
                group_for_wait.wait_until_ready().await;
                group
            }
        });

        tokio::task::yield_now().await;
        shard_a.mark_ready_for_test();
        shard_b.mark_ready_for_test();

        let group = wait_handle.await.unwrap();
        assert!(group.is_floodgated());
    }
}

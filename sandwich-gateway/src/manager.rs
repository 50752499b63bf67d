//! Owns everything scoped to a single bot token: the REST client used to
//! learn how many shards to run, the IDENTIFY budget every `ShardGroup` it
//! starts shares, the producer events are published to, and the mutable
//! runtime configuration (blacklists, intents, caching flags) shards read
//! from on every dispatch.

use crate::error::GatewayError;
use crate::identify_bucket::IdentifyBucket;
use crate::payload::PresenceUpdate;
use crate::shard::{ShardConfig, ShardContext};
use crate::shard_group::{ShardGroup, ShardGroupConfig, ShardGroupId};

use dashmap::DashMap;
use parking_lot::RwLock;
use sandwich_http::{GatewayBotResponse, HttpClient};
use sandwich_model::Intents;
use sandwich_producer::Producer;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

/// Mutable, hot-reloadable knobs a running Manager exposes. Everything here
/// can change between shard group scales without requiring a restart.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub intents: Intents,
    pub compress: bool,
    pub large_threshold: u8,
    pub chunk_guilds_on_startup: bool,
    pub default_presence: Option<PresenceUpdate>,
}

impl ManagerConfig {
    pub fn new(intents: Intents) -> Self {
        Self {
            intents,
            compress: false,
            large_threshold: 250,
            chunk_guilds_on_startup: false,
            default_presence: None,
        }
    }
}

/// One bot token's worth of sharding. Owns zero or more `ShardGroup`s; more
/// than one only exists transiently, during a rolling reshard.
pub struct Manager {
    name: String,
    token: String,
    http: HttpClient,
    config: RwLock<ManagerConfig>,

    state: Arc<sandwich_state::SandwichState>,
    dispatch: Arc<crate::dispatch::DispatchTable>,
    identify_bucket: RwLock<Arc<IdentifyBucket>>,
    producer: Arc<dyn Producer>,
    channel_name: String,

    event_blacklist: Arc<RwLock<HashSet<String>>>,
    produce_blacklist: Arc<RwLock<HashSet<String>>>,

    gateway_info: RwLock<Option<GatewayBotResponse>>,
    shard_groups: DashMap<ShardGroupId, Arc<ShardGroup>>,
    next_group_id: AtomicU32,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Manager {
    pub fn new(
        name: impl Into<String>,
        token: impl Into<String>,
        config: ManagerConfig,
        state: Arc<sandwich_state::SandwichState>,
        producer: Arc<dyn Producer>,
        channel_name: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let token = token.into();
        let http = HttpClient::new(&token)?;

        Ok(Self {
            name: name.into(),
            token,
            http,
            config: RwLock::new(config),
            state,
            dispatch: Arc::new(crate::dispatch::DispatchTable::new()),
            identify_bucket: RwLock::new(Arc::new(IdentifyBucket::new(1))),
            producer,
            channel_name: channel_name.into(),
            event_blacklist: Arc::new(RwLock::new(HashSet::new())),
            produce_blacklist: Arc::new(RwLock::new(HashSet::new())),
            gateway_info: RwLock::new(None),
            shard_groups: DashMap::new(),
            next_group_id: AtomicU32::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> ManagerConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: ManagerConfig) {
        *self.config.write() = config;
    }

    pub fn set_event_blacklist(&self, events: HashSet<String>) {
        *self.event_blacklist.write() = events;
    }

    pub fn set_produce_blacklist(&self, events: HashSet<String>) {
        *self.produce_blacklist.write() = events;
    }

    pub fn gateway_info(&self) -> Option<GatewayBotResponse> {
        self.gateway_info.read().clone()
    }

    pub fn shard_group(&self, id: ShardGroupId) -> Option<Arc<ShardGroup>> {
        self.shard_groups.get(&id).map(|g| g.clone())
    }

    pub fn shard_group_ids(&self) -> Vec<ShardGroupId> {
        self.shard_groups.iter().map(|g| *g.key()).collect()
    }

    pub fn total_guild_count(&self) -> usize {
        self.shard_groups.iter().map(|g| g.guild_count()).sum()
    }

    /// Fetches `/gateway/bot`, sizes the IDENTIFY bucket to its
    /// `max_concurrency`, and starts a single `ShardGroup` covering every
    /// recommended shard. If a group is already running and
    /// `force_restart_producers` is set, the producer is reconnected before
    /// the new group is stood up; otherwise the existing connection is left
    /// alone.
    pub async fn initialize(&self, force_restart_producers: bool) -> Result<(), GatewayError> {
        if force_restart_producers {
            self.producer.close();
            self.producer.connect()?;
        } else if self.producer.is_closed() {
            self.producer.connect()?;
        }

        let info = self.http.get_gateway_bot().await?;
        info!(
            manager = %self.name,
            shards = info.shards,
            max_concurrency = info.session_start_limit.max_concurrency,
            "fetched gateway info"
        );

        self.identify_bucket_resize(info.session_start_limit.max_concurrency);
        *self.gateway_info.write() = Some(info.clone());

        let group = self
            .start_group((0..info.shards).collect(), info.shards, &info.url)
            .await;
        group.wait_until_ready().await;

        self.shard_groups.insert(group.id(), group);
        Ok(())
    }

    /// Starts a replacement `ShardGroup` with a new total shard count,
    /// waits for it to become fully ready, then closes every previously
    /// running group. Guild ownership moves implicitly: the new group's
    /// shards receive fresh `GUILD_CREATE`s for everything, so nothing
    /// needs to be copied from the old group's state.
    pub async fn scale(&self, new_shard_count: u32) -> Result<(), GatewayError> {
        let gateway_url = self
            .gateway_info
            .read()
            .as_ref()
            .map(|i| i.url.clone())
            .unwrap_or_else(|| crate::DEFAULT_GATEWAY_URL.to_string());

        let old_group_ids = self.shard_group_ids();

        let new_group = self
            .start_group((0..new_shard_count).collect(), new_shard_count, &gateway_url)
            .await;
        new_group.wait_until_ready().await;
        self.shard_groups.insert(new_group.id(), new_group);

        for old_id in old_group_ids {
            if let Some((_, old_group)) = self.shard_groups.remove(&old_id) {
                old_group.close().await;
            }
        }
        Ok(())
    }

    /// Stops every shard group and disconnects the producer.
    pub async fn close(&self) {
        let ids = self.shard_group_ids();
        for id in ids {
            if let Some((_, group)) = self.shard_groups.remove(&id) {
                group.close().await;
            }
        }
        self.producer.close();
    }

    async fn start_group(
        &self,
        shard_ids: Vec<u32>,
        shard_count: u32,
        gateway_url: &str,
    ) -> Arc<ShardGroup> {
        let id = self.next_group_id.fetch_add(1, Ordering::SeqCst);
        let config = self.config.read().clone();

        let shard_config = ShardConfig {
            token: self.token.clone(),
            intents: config.intents,
            gateway_url: gateway_url.to_string(),
            large_threshold: config.large_threshold,
            compress: config.compress,
            chunk_guilds_on_startup: config.chunk_guilds_on_startup,
            ready_timeout: std::time::Duration::from_secs(5),
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60_000,
        };

        let group_config = ShardGroupConfig {
            shard_ids,
            shard_count,
            shard_config,
        };

        let state = self.state.clone();
        let dispatch = self.dispatch.clone();
        let identify_bucket = self.identify_bucket.read().clone();
        let producer = self.producer.clone();
        let channel_name = self.channel_name.clone();
        let manager_name = self.name.clone();
        let event_blacklist = self.event_blacklist.clone();
        let produce_blacklist = self.produce_blacklist.clone();

        let context_for = move || ShardContext {
            state: state.clone(),
            dispatch: dispatch.clone(),
            identify_bucket: identify_bucket.clone(),
            producer: producer.clone(),
            channel_name: channel_name.clone(),
            manager_name: manager_name.clone(),
            event_blacklist: event_blacklist.clone(),
            produce_blacklist: produce_blacklist.clone(),
            floodgate: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        };

        info!(manager = %self.name, group_id = id, "starting shard group");
        Arc::new(ShardGroup::start(id, group_config, context_for))
    }

    fn identify_bucket_resize(&self, max_concurrency: u32) {
        if self.identify_bucket.read().max_concurrency() != max_concurrency {
            // A fresh IdentifyBucket is fine here: a resize only happens on
            // (re)initialize, before any shard in this manager has started
            // acquiring permits.
            *self.identify_bucket.write() = Arc::new(IdentifyBucket::new(max_concurrency));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_producer::LocalProducer;

    fn test_manager() -> Manager {
        Manager::new(
            "test-manager",
            "test-token",
            ManagerConfig::new(Intents::GUILDS),
            Arc::new(sandwich_state::SandwichState::new(
                sandwich_state::CacheConfig::default(),
            )),
            Arc::new(LocalProducer::new(Default::default())),
            "sandwich",
        )
        .unwrap()
    }

    #[test]
    fn manager_starts_with_no_shard_groups() {
        let manager = test_manager();
        assert!(manager.shard_group_ids().is_empty());
        assert_eq!(manager.total_guild_count(), 0);
    }

    #[test]
    fn set_config_replaces_the_live_configuration() {
        let manager = test_manager();
        manager.set_config(ManagerConfig::new(Intents::GUILDS | Intents::GUILD_MESSAGES));
        assert!(manager
            .config()
            .intents
            .contains(Intents::GUILD_MESSAGES));
    }

    #[test]
    fn blacklists_start_empty_and_can_be_replaced() {
        let manager = test_manager();
        let mut blacklist = HashSet::new();
        blacklist.insert("PRESENCE_UPDATE".to_string());
        manager.set_event_blacklist(blacklist.clone());
        assert!(manager.event_blacklist.read().contains("PRESENCE_UPDATE"));
    }
}

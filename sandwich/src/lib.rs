//! Sandwich - a Discord gateway multiplexer.
//!
//! This crate is the process-wide registry on top of the `sandwich-gateway`
//! sharding engine: it owns every [`Manager`] (one per bot token) running in
//! this process, the [`SandwichState`] they share, and the aggregate status
//! a health endpoint or CLI would want to read.
//!
//! # Example
//!
//! ```no_run
//! use sandwich_rs::Sandwich;
//! use sandwich_gateway::{Manager, ManagerConfig};
//! use sandwich_model::Intents;
//! use sandwich_producer::LocalProducer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sandwich = Sandwich::new(sandwich_state::CacheConfig::default());
//!
//!     let manager = Arc::new(Manager::new(
//!         "main",
//!         std::env::var("DISCORD_TOKEN")?,
//!         ManagerConfig::new(Intents::GUILDS),
//!         sandwich.state().clone(),
//!         Arc::new(LocalProducer::new(Default::default())),
//!         "sandwich",
//!     )?);
//!
//!     sandwich.register_manager(manager.clone())?;
//!     manager.initialize(false).await?;
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::SandwichError;

// Re-exports so a caller only needs to depend on this crate.
pub use sandwich_gateway as gateway;
pub use sandwich_http as http;
pub use sandwich_model as model;
pub use sandwich_producer as producer;
pub use sandwich_state as state;

use dashmap::DashMap;
use sandwich_gateway::Manager;
use sandwich_state::SandwichState;
use std::sync::Arc;

#[cfg(feature = "performance")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// A snapshot of every manager's sharding state, cheap enough to build on
/// every health-check request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ManagerStatus {
    pub name: String,
    pub shard_group_count: usize,
    pub guild_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SandwichStatus {
    pub managers: Vec<ManagerStatus>,
}

/// Owns every [`Manager`] running in this process and the [`SandwichState`]
/// they all publish into. One process can run several bot tokens against
/// the same cache, the same way the reference daemon lets one process
/// multiplex several bots.
pub struct Sandwich {
    state: Arc<SandwichState>,
    managers: DashMap<String, Arc<Manager>, ahash::RandomState>,
}

impl Sandwich {
    pub fn new(cache_config: sandwich_state::CacheConfig) -> Self {
        Self {
            state: Arc::new(SandwichState::new(cache_config)),
            managers: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn state(&self) -> &Arc<SandwichState> {
        &self.state
    }

    /// Registers a manager under its own name. Fails if that name is
    /// already taken — callers are expected to construct managers with
    /// unique names up front rather than silently overwrite one.
    pub fn register_manager(&self, manager: Arc<Manager>) -> Result<(), SandwichError> {
        let name = manager.name().to_string();
        if self.managers.contains_key(&name) {
            return Err(SandwichError::DuplicateManager(name));
        }
        self.managers.insert(name, manager);
        Ok(())
    }

    pub fn manager(&self, name: &str) -> Option<Arc<Manager>> {
        self.managers.get(name).map(|m| m.clone())
    }

    /// Looks up a manager by name, failing loudly instead of returning
    /// `None` — for call sites where an unrecognized name is a caller bug
    /// (a CLI command, a REST-introspection handler) rather than a
    /// routine "might not exist yet" check.
    pub fn require_manager(&self, name: &str) -> Result<Arc<Manager>, SandwichError> {
        self.manager(name)
            .ok_or_else(|| SandwichError::UnknownManager(name.to_string()))
    }

    pub fn manager_names(&self) -> Vec<String> {
        self.managers.iter().map(|m| m.key().clone()).collect()
    }

    /// Closes and unregisters a single manager by name.
    pub async fn close_manager(&self, name: &str) -> Result<(), SandwichError> {
        let manager = self.require_manager(name)?;
        manager.close().await;
        self.managers.remove(name);
        Ok(())
    }

    pub fn status(&self) -> SandwichStatus {
        let managers = self
            .managers
            .iter()
            .map(|m| ManagerStatus {
                name: m.key().clone(),
                shard_group_count: m.value().shard_group_ids().len(),
                guild_count: m.value().total_guild_count(),
            })
            .collect();
        SandwichStatus { managers }
    }

    /// Initializes every registered manager concurrently.
    pub async fn initialize_all(&self, force_restart_producers: bool) -> Result<(), SandwichError> {
        let managers: Vec<_> = self.managers.iter().map(|m| m.value().clone()).collect();
        let results = futures_util::future::join_all(
            managers.iter().map(|m| m.initialize(force_restart_producers)),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }

    /// Closes every registered manager.
    pub async fn close_all(&self) {
        let managers: Vec<_> = self.managers.iter().map(|m| m.value().clone()).collect();
        for manager in managers {
            manager.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandwich_gateway::ManagerConfig;
    use sandwich_model::Intents;
    use sandwich_producer::LocalProducer;

    fn sandwich() -> Sandwich {
        Sandwich::new(sandwich_state::CacheConfig::default())
    }

    fn manager(sandwich: &Sandwich, name: &str) -> Arc<Manager> {
        Arc::new(
            Manager::new(
                name,
                "test-token",
                ManagerConfig::new(Intents::GUILDS),
                sandwich.state().clone(),
                Arc::new(LocalProducer::new(Default::default())),
                "sandwich",
            )
            .unwrap(),
        )
    }

    #[test]
    fn registering_a_manager_makes_it_discoverable_by_name() {
        let sandwich = sandwich();
        let manager = manager(&sandwich, "main");
        sandwich.register_manager(manager).unwrap();
        assert!(sandwich.manager("main").is_some());
        assert_eq!(sandwich.manager_names(), vec!["main".to_string()]);
    }

    #[test]
    fn registering_the_same_name_twice_fails() {
        let sandwich = sandwich();
        sandwich.register_manager(manager(&sandwich, "main")).unwrap();
        let err = sandwich.register_manager(manager(&sandwich, "main")).unwrap_err();
        assert!(matches!(err, SandwichError::DuplicateManager(_)));
    }

    #[test]
    fn status_reflects_every_registered_manager_with_no_shard_groups_yet() {
        let sandwich = sandwich();
        sandwich.register_manager(manager(&sandwich, "main")).unwrap();
        let status = sandwich.status();
        assert_eq!(status.managers.len(), 1);
        assert_eq!(status.managers[0].shard_group_count, 0);
    }

    #[test]
    fn require_manager_fails_for_an_unregistered_name() {
        let sandwich = sandwich();
        let err = sandwich.require_manager("missing").unwrap_err();
        assert!(matches!(err, SandwichError::UnknownManager(name) if name == "missing"));
    }

    #[tokio::test]
    async fn close_manager_unregisters_it() {
        let sandwich = sandwich();
        sandwich.register_manager(manager(&sandwich, "main")).unwrap();
        sandwich.close_manager("main").await.unwrap();
        assert!(sandwich.manager("main").is_none());
    }
}

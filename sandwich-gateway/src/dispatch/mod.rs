//! The dispatch pipeline: `Shard.OnDispatch` → panic recovery → blacklist
//! check → trace stamping → state handler → publish gate.
//!
//! State handlers are registered in a lookup table keyed by event name
//! rather than expressed as an enum match — the table is built once at
//! startup and is otherwise read-only, so adding a new event type never
//! touches the read loop. `READY`/`RESUMED` are not in the table: both carry
//! shard-lifecycle side effects (firing the ready signal, driving the
//! lazy-load loop) that a `(ctx, raw) -> HandlerOutcome` handler can't
//! express, so the shard's read loop special-cases them before consulting
//! this table at all.

pub mod handlers;

use crate::error::GatewayError;
use ahash::RandomState;
use dashmap::DashSet;
use sandwich_model::Snowflake;
use sandwich_state::SandwichState;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chunking::ChunkRegistry;

/// What a successful handler produced: extras to attach to the published
/// payload (`{before, lazy, unavailable, ...}` depending on the event
/// family) and whether the event should continue on to the publish gate at
/// all.
#[derive(Debug, Default, Clone)]
pub struct HandlerOutcome {
    pub extras: Option<serde_json::Value>,
    pub continuable: bool,
}

impl HandlerOutcome {
    /// No extras, forwarded downstream — the common case for events that
    /// mutate nothing interesting beyond their own raw payload.
    pub fn routed() -> Self {
        Self {
            extras: None,
            continuable: true,
        }
    }

    pub fn with_extras(extras: serde_json::Value) -> Self {
        Self {
            extras: Some(extras),
            continuable: true,
        }
    }

    /// Handled, but nothing should reach the publish gate (e.g. a
    /// deduplicated membership event).
    pub fn dropped() -> Self {
        Self {
            extras: None,
            continuable: false,
        }
    }
}

/// Per-shard state a handler needs beyond the global cache: which guilds
/// this shard's group currently owns, which are still mid lazy-load, and
/// which were reported unavailable on `GUILD_DELETE`.
pub struct DispatchContext {
    pub state: Arc<SandwichState>,
    pub shard_id: u32,
    pub guilds: Arc<DashSet<Snowflake, RandomState>>,
    pub lazy: Arc<DashSet<Snowflake, RandomState>>,
    pub unavailable: Arc<DashSet<Snowflake, RandomState>>,
    pub chunking: Arc<ChunkRegistry>,
}

pub type HandlerFn = fn(&DispatchContext, &RawValue) -> Result<HandlerOutcome, GatewayError>;

/// Immutable lookup table from Discord event name to state handler, built
/// once per manager and shared by every shard it owns.
pub struct DispatchTable {
    handlers: HashMap<&'static str, HandlerFn>,
}

impl DispatchTable {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, HandlerFn> = HashMap::new();

        handlers.insert("GUILD_CREATE", handlers::guild::on_create);
        handlers.insert("GUILD_UPDATE", handlers::guild::on_update);
        handlers.insert("GUILD_DELETE", handlers::guild::on_delete);
        handlers.insert("GUILD_MEMBER_ADD", handlers::member::on_add);
        handlers.insert("GUILD_MEMBER_REMOVE", handlers::member::on_remove);
        handlers.insert("GUILD_MEMBER_UPDATE", handlers::member::on_update);
        handlers.insert("GUILD_MEMBERS_CHUNK", handlers::member::on_chunk);
        handlers.insert("CHANNEL_CREATE", handlers::channel::on_create);
        handlers.insert("CHANNEL_UPDATE", handlers::channel::on_update);
        handlers.insert("CHANNEL_DELETE", handlers::channel::on_delete);
        handlers.insert("THREAD_UPDATE", handlers::channel::on_update);
        handlers.insert("CHANNEL_PINS_UPDATE", handlers::channel::on_pins_update);
        handlers.insert("GUILD_ROLE_CREATE", handlers::role::on_create_or_update);
        handlers.insert("GUILD_ROLE_UPDATE", handlers::role::on_create_or_update);
        handlers.insert("GUILD_ROLE_DELETE", handlers::role::on_delete);
        handlers.insert("GUILD_EMOJIS_UPDATE", handlers::role::on_emojis_update);
        handlers.insert("GUILD_STICKERS_UPDATE", handlers::role::on_stickers_update);
        handlers.insert("VOICE_STATE_UPDATE", handlers::voice::on_state_update);
        handlers.insert("USER_UPDATE", handlers::misc::on_user_update);
        handlers.insert("MESSAGE_CREATE", handlers::misc::route_by_guild);
        handlers.insert("MESSAGE_UPDATE", handlers::misc::route_by_guild);
        handlers.insert("MESSAGE_DELETE", handlers::misc::route_by_guild);
        handlers.insert("MESSAGE_DELETE_BULK", handlers::misc::route_by_guild);
        handlers.insert("MESSAGE_REACTION_ADD", handlers::misc::route_by_guild);
        handlers.insert("MESSAGE_REACTION_REMOVE", handlers::misc::route_by_guild);
        handlers.insert(
            "MESSAGE_REACTION_REMOVE_ALL",
            handlers::misc::route_by_guild,
        );
        handlers.insert(
            "MESSAGE_REACTION_REMOVE_EMOJI",
            handlers::misc::route_by_guild,
        );
        handlers.insert("TYPING_START", handlers::misc::route_by_guild);
        handlers.insert("INVITE_CREATE", handlers::misc::route_by_guild);
        handlers.insert("INVITE_DELETE", handlers::misc::route_by_guild);
        handlers.insert("PRESENCE_UPDATE", handlers::misc::route_by_guild);
        handlers.insert("ENTITLEMENT_CREATE", handlers::misc::route_by_guild);
        handlers.insert("ENTITLEMENT_UPDATE", handlers::misc::route_by_guild);
        handlers.insert("ENTITLEMENT_DELETE", handlers::misc::route_by_guild);
        handlers.insert("GUILD_BAN_ADD", handlers::misc::route_by_guild);
        handlers.insert("GUILD_BAN_REMOVE", handlers::misc::route_by_guild);
        handlers.insert(
            "GUILD_INTEGRATIONS_UPDATE",
            handlers::misc::route_by_guild,
        );
        handlers.insert(
            "GUILD_AUDIT_LOG_ENTRY_CREATE",
            handlers::misc::route_by_guild,
        );

        Self { handlers }
    }

    /// Looks up `event_name` and runs its handler, falling back to the
    /// wildcard route for anything not registered: best-effort
    /// `{guild_id, user_id}` extraction so an unrecognized event is still
    /// routed sensibly instead of dropped outright.
    pub fn dispatch(
        &self,
        ctx: &DispatchContext,
        event_name: &str,
        data: &RawValue,
    ) -> Result<HandlerOutcome, GatewayError> {
        match self.handlers.get(event_name) {
            Some(handler) => handler(ctx, data),
            None => handlers::misc::wildcard(ctx, data),
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> DispatchContext {
        DispatchContext {
            state: Arc::new(SandwichState::new(sandwich_state::CacheConfig::default())),
            shard_id: 0,
            guilds: Arc::new(DashSet::with_hasher(RandomState::new())),
            lazy: Arc::new(DashSet::with_hasher(RandomState::new())),
            unavailable: Arc::new(DashSet::with_hasher(RandomState::new())),
            chunking: Arc::new(ChunkRegistry::new()),
        }
    }

    #[test]
    fn unknown_event_falls_back_to_wildcard() {
        let table = DispatchTable::new();
        let ctx = context();
        let raw: Box<RawValue> = serde_json::from_str(r#"{"guild_id":"1","user_id":"2"}"#).unwrap();
        let outcome = table.dispatch(&ctx, "SOME_FUTURE_EVENT", &raw).unwrap();
        assert!(outcome.continuable);
    }

    #[test]
    fn known_event_is_routed_to_its_handler() {
        let table = DispatchTable::new();
        let ctx = context();
        let raw: Box<RawValue> =
            serde_json::from_str(r#"{"channel_id":"1","message_id":"2","user_id":"3"}"#).unwrap();
        let outcome = table.dispatch(&ctx, "MESSAGE_REACTION_ADD", &raw).unwrap();
        assert!(outcome.continuable);
    }
}

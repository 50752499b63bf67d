//! Shard lifecycle, sharding hierarchy, and dispatch pipeline for the
//! Sandwich gateway daemon.
//!
//! This crate owns everything downstream of a Discord bot token: dialing
//! and maintaining individual shard WebSocket sessions, grouping them into
//! `ShardGroup`s that share an IDENTIFY budget, and routing each shard's
//! dispatched events through a registration-table pipeline into the shared
//! state cache and out to a [`sandwich_producer::Producer`].
//!
//! # Sharding hierarchy
//!
//! ```text
//! Manager (one bot token)
//!   └── ShardGroup (a cohort sharing a shard-count and an IDENTIFY budget)
//!         └── Shard (one WebSocket session)
//! ```
//!
//! A rolling reshard works by standing up a new `ShardGroup` alongside the
//! old one; guild ownership transfers once the new group reports ready,
//! and the old group is torn down after.

pub mod backoff;
pub mod chunking;
pub mod compression;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod identify_bucket;
pub mod manager;
pub mod opcode;
pub mod payload;
pub mod shard;
pub mod shard_group;

pub use backoff::{exponential_backoff, with_jitter};
pub use chunking::{ChunkRegistry, GuildChunks};
pub use compression::ZlibDecompressor;
pub use dispatch::{DispatchContext, DispatchTable, HandlerOutcome};
pub use error::{CloseCode, GatewayError};
pub use heartbeat::HeartbeatHandler;
pub use identify_bucket::IdentifyBucket;
pub use manager::{Manager, ManagerConfig};
pub use opcode::OpCode;
pub use payload::{
    ConnectionProperties, GatewayPayload, HelloPayload, IdentifyPayload,
    RequestGuildMembersPayload, ResumePayload, SandwichPayload, ShardMetadata,
};
pub use shard::{Shard, ShardConfig, ShardContext, ShardState};
pub use shard_group::{ShardGroup, ShardGroupConfig, ShardGroupId};

/// Discord Gateway API version used by this library.
pub const GATEWAY_VERSION: u8 = 10;

/// Default gateway URL; overridden at runtime by the `/gateway/bot` response.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

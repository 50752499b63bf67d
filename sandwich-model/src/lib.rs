//! Wire types for the Discord gateway and the events the multiplexer
//! dispatches downstream.
//!
//! Every struct that can be parsed from an inbound frame is generic over a
//! lifetime so a shard can deserialize straight out of its read buffer
//! without an allocation per field; call `into_owned()` before a value
//! crosses into the state cache or a producer's outbound queue, both of
//! which require `'static` data.

pub mod audit;
pub mod channel;
pub mod entitlement;
pub mod guild;
pub mod intents;
pub mod invite;
pub mod json;
pub mod member;
pub mod message;
pub mod snowflake;
pub mod string;
pub mod user;
pub mod voice_state;

pub use audit::AuditLogEntry;
pub use channel::{Channel, ChannelPinsUpdateEvent};
pub use entitlement::Entitlement;
pub use guild::{
    Guild, GuildEmojisUpdateEvent, GuildMemberAddEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent,
    GuildStickersUpdateEvent, ReadyEventData, UnavailableGuild,
};
pub use intents::Intents;
pub use invite::{InviteCreateEvent, InviteDeleteEvent};
pub use member::{Emoji, GuildMember, Role, Sticker};
pub use message::{
    Message, MessageDeleteBulkEvent, MessageDeleteEvent, MessageReactionAddEvent,
    MessageReactionRemoveAllEvent, MessageReactionRemoveEvent,
};
pub use snowflake::Snowflake;
pub use string::SandwichStr;
pub use user::{PartialUser, User};
pub use voice_state::VoiceState;

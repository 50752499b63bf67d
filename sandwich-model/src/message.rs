use crate::member::GuildMember;
use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// Minimal message payload. The multiplexer never stores messages — it only
/// routes `MESSAGE_*` events downstream — so this carries just enough for a
/// dispatch handler to fill trace fields and forward the raw payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message<'a> {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<User<'a>>,
    #[serde(default)]
    pub member: Option<GuildMember<'a>>,
    #[serde(default)]
    pub content: SandwichStr<'a>,
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDeleteBulkEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageReactionAddEvent<'a> {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub member: Option<GuildMember<'a>>,
    pub emoji: crate::member::Emoji<'a>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageReactionRemoveEvent<'a> {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: crate::member::Emoji<'a>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageReactionRemoveAllEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

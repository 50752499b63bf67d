use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// A Discord channel. `guild_id` is `None` for DMs and group DMs, which live
/// in the state cache's `dm_channels` map keyed by recipient user ID instead
/// of the per-guild channel map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Channel<'a> {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub name: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub topic: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    /// User-limit for voice channels; `MemberCount` for them is derived
    /// separately from the voice-state map, never from this field.
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub rate_limit_per_user: Option<u32>,
    #[serde(default)]
    pub recipients: Vec<User<'a>>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub last_pin_timestamp: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub member_count: Option<u32>,
    #[serde(default)]
    pub flags: u64,
}

pub const CHANNEL_TYPE_DM: u8 = 1;
pub const CHANNEL_TYPE_GROUP_DM: u8 = 3;

impl Channel<'_> {
    pub fn is_dm(&self) -> bool {
        matches!(self.channel_type, CHANNEL_TYPE_DM | CHANNEL_TYPE_GROUP_DM)
    }

    pub fn into_owned(self) -> Channel<'static> {
        Channel {
            id: self.id,
            channel_type: self.channel_type,
            guild_id: self.guild_id,
            position: self.position,
            name: self.name.map(|s| s.into_owned().into()),
            topic: self.topic.map(|s| s.into_owned().into()),
            nsfw: self.nsfw,
            last_message_id: self.last_message_id,
            bitrate: self.bitrate,
            user_limit: self.user_limit,
            rate_limit_per_user: self.rate_limit_per_user,
            recipients: self.recipients.into_iter().map(User::into_owned).collect(),
            parent_id: self.parent_id,
            last_pin_timestamp: self.last_pin_timestamp.map(|s| s.into_owned().into()),
            member_count: self.member_count,
            flags: self.flags,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelPinsUpdateEvent {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub last_pin_timestamp: Option<String>,
}

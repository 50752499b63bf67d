use crate::channel::Channel;
use crate::member::{Emoji, GuildMember, Role, Sticker};
use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use crate::user::User;
use crate::voice_state::VoiceState;
use serde::{Deserialize, Serialize};

/// A guild, as stored in the state cache. **Invariant**: `roles`, `channels`,
/// `members`, `emojis` and `voice_states` are always empty on the copy held
/// in the top-level guild map — the authoritative data lives in the
/// per-guild sub-maps and is reassembled by `sandwich_state::get_guild`.
/// `stickers` is the one sub-collection kept directly on the guild, matching
/// upstream's own embedding of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Guild<'a> {
    pub id: Snowflake,
    pub name: SandwichStr<'a>,
    #[serde(default)]
    pub icon: Option<SandwichStr<'a>>,
    pub owner_id: Snowflake,
    #[serde(default)]
    pub afk_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub afk_timeout: u32,
    #[serde(default)]
    pub verification_level: u8,
    #[serde(default)]
    pub roles: Vec<Role<'a>>,
    #[serde(default)]
    pub emojis: Vec<Emoji<'a>>,
    #[serde(default)]
    pub features: Vec<SandwichStr<'a>>,
    #[serde(default)]
    pub system_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub rules_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub premium_tier: u8,
    #[serde(default)]
    pub premium_subscription_count: Option<u32>,
    #[serde(default)]
    pub preferred_locale: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub nsfw_level: u8,
    #[serde(default)]
    pub stickers: Vec<Sticker<'a>>,
    #[serde(default)]
    pub premium_progress_bar_enabled: bool,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub joined_at: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub unavailable: bool,
    // The following four arrive only in GUILD_CREATE and are fanned out to
    // sub-maps by `sandwich_state::set_guild`; they are never populated on a
    // GUILD_UPDATE payload, so `GUILD_UPDATE`'s handler must carry the
    // previous values forward (see dispatch::handlers::guild::on_update).
    #[serde(default)]
    pub channels: Vec<Channel<'a>>,
    #[serde(default)]
    pub members: Vec<GuildMember<'a>>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState<'a>>,
    #[serde(default)]
    pub stage_instances: Option<Vec<crate::json::Value>>,
}

impl Guild<'_> {
    pub fn into_owned(self) -> Guild<'static> {
        Guild {
            id: self.id,
            name: self.name.into_owned().into(),
            icon: self.icon.map(|s| s.into_owned().into()),
            owner_id: self.owner_id,
            afk_channel_id: self.afk_channel_id,
            afk_timeout: self.afk_timeout,
            verification_level: self.verification_level,
            roles: self.roles.into_iter().map(Role::into_owned).collect(),
            emojis: self.emojis.into_iter().map(Emoji::into_owned).collect(),
            features: self
                .features
                .into_iter()
                .map(|s| s.into_owned().into())
                .collect(),
            system_channel_id: self.system_channel_id,
            rules_channel_id: self.rules_channel_id,
            max_members: self.max_members,
            premium_tier: self.premium_tier,
            premium_subscription_count: self.premium_subscription_count,
            preferred_locale: self.preferred_locale.map(|s| s.into_owned().into()),
            nsfw_level: self.nsfw_level,
            stickers: self.stickers.into_iter().map(Sticker::into_owned).collect(),
            premium_progress_bar_enabled: self.premium_progress_bar_enabled,
            member_count: self.member_count,
            large: self.large,
            joined_at: self.joined_at.map(|s| s.into_owned().into()),
            unavailable: self.unavailable,
            channels: self.channels.into_iter().map(Channel::into_owned).collect(),
            members: self.members.into_iter().map(GuildMember::into_owned).collect(),
            voice_states: self
                .voice_states
                .into_iter()
                .map(VoiceState::into_owned)
                .collect(),
            stage_instances: self.stage_instances,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadyEventData<'a> {
    pub v: u8,
    pub user: User<'a>,
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: SandwichStr<'a>,
    pub resume_gateway_url: SandwichStr<'a>,
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberAddEvent<'a> {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: GuildMember<'a>,
    pub user: User<'a>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberRemoveEvent<'a> {
    pub guild_id: Snowflake,
    pub user: User<'a>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberUpdateEvent<'a> {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub user: User<'a>,
    #[serde(default)]
    pub nick: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub avatar: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub joined_at: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub deaf: Option<bool>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub communication_disabled_until: Option<SandwichStr<'a>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMembersChunkEvent<'a> {
    pub guild_id: Snowflake,
    pub members: Vec<GuildMember<'a>>,
    pub chunk_index: i32,
    pub chunk_count: i32,
    #[serde(default)]
    pub not_found: Vec<Snowflake>,
    #[serde(default)]
    pub nonce: Option<SandwichStr<'a>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildRoleEvent<'a> {
    pub guild_id: Snowflake,
    pub role: Role<'a>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildRoleDeleteEvent {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildEmojisUpdateEvent<'a> {
    pub guild_id: Snowflake,
    pub emojis: Vec<Emoji<'a>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildStickersUpdateEvent<'a> {
    pub guild_id: Snowflake,
    pub stickers: Vec<Sticker<'a>>,
}


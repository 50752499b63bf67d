use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use crate::user::User;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A guild member. `joined_at` is a required field on the wire but the state
/// cache clears it to an empty string when it fails RFC3339 parsing on read
/// (see `sandwich_state::guild::member::joined_at_or_empty`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMember<'a> {
    #[serde(default)]
    pub user: Option<User<'a>>,
    #[serde(default)]
    pub nick: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub avatar: Option<SandwichStr<'a>>,
    pub roles: SmallVec<[Snowflake; 5]>,
    #[serde(default)]
    pub joined_at: SandwichStr<'a>,
    #[serde(default)]
    pub premium_since: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub flags: u64,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub communication_disabled_until: Option<SandwichStr<'a>>,
}

impl GuildMember<'_> {
    pub fn into_owned(self) -> GuildMember<'static> {
        GuildMember {
            user: self.user.map(User::into_owned),
            nick: self.nick.map(|s| s.into_owned().into()),
            avatar: self.avatar.map(|s| s.into_owned().into()),
            roles: self.roles,
            joined_at: self.joined_at.into_owned().into(),
            premium_since: self.premium_since.map(|s| s.into_owned().into()),
            deaf: self.deaf,
            mute: self.mute,
            flags: self.flags,
            pending: self.pending,
            communication_disabled_until: self
                .communication_disabled_until
                .map(|s| s.into_owned().into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Role<'a> {
    pub id: Snowflake,
    pub name: SandwichStr<'a>,
    pub color: u32,
    pub hoist: bool,
    #[serde(default)]
    pub icon: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub unicode_emoji: Option<SandwichStr<'a>>,
    pub position: i32,
    pub permissions: SandwichStr<'a>,
    pub managed: bool,
    pub mentionable: bool,
    #[serde(default)]
    pub flags: u64,
}

impl Role<'_> {
    pub fn into_owned(self) -> Role<'static> {
        Role {
            id: self.id,
            name: self.name.into_owned().into(),
            color: self.color,
            hoist: self.hoist,
            icon: self.icon.map(|s| s.into_owned().into()),
            unicode_emoji: self.unicode_emoji.map(|s| s.into_owned().into()),
            position: self.position,
            permissions: self.permissions.into_owned().into(),
            managed: self.managed,
            mentionable: self.mentionable,
            flags: self.flags,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Emoji<'a> {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub roles: SmallVec<[Snowflake; 2]>,
    #[serde(default)]
    pub user: Option<User<'a>>,
    #[serde(default)]
    pub require_colons: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub available: bool,
}

impl Emoji<'_> {
    pub fn into_owned(self) -> Emoji<'static> {
        Emoji {
            id: self.id,
            name: self.name.map(|s| s.into_owned().into()),
            roles: self.roles,
            user: self.user.map(User::into_owned),
            require_colons: self.require_colons,
            managed: self.managed,
            animated: self.animated,
            available: self.available,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sticker<'a> {
    pub id: Snowflake,
    #[serde(default)]
    pub pack_id: Option<Snowflake>,
    pub name: SandwichStr<'a>,
    #[serde(default)]
    pub description: Option<SandwichStr<'a>>,
    pub tags: SandwichStr<'a>,
    pub sticker_type: u8,
    pub format_type: u8,
}

impl Sticker<'_> {
    pub fn into_owned(self) -> Sticker<'static> {
        Sticker {
            id: self.id,
            pack_id: self.pack_id,
            name: self.name.into_owned().into(),
            description: self.description.map(|s| s.into_owned().into()),
            tags: self.tags.into_owned().into(),
            sticker_type: self.sticker_type,
            format_type: self.format_type,
        }
    }
}

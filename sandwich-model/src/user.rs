use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use serde::{Deserialize, Serialize};

/// Discord user representation, as embedded in members, messages and the
/// `READY` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User<'a> {
    pub id: Snowflake,
    pub username: SandwichStr<'a>,
    pub discriminator: SandwichStr<'a>,
    #[serde(default)]
    pub global_name: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub avatar: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub banner: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub accent_color: Option<u32>,
    #[serde(default)]
    pub public_flags: Option<u64>,
}

impl User<'_> {
    pub fn into_owned(self) -> User<'static> {
        User {
            id: self.id,
            username: self.username.into_owned().into(),
            discriminator: self.discriminator.into_owned().into(),
            global_name: self.global_name.map(|s| s.into_owned().into()),
            avatar: self.avatar.map(|s| s.into_owned().into()),
            bot: self.bot,
            system: self.system,
            banner: self.banner.map(|s| s.into_owned().into()),
            accent_color: self.accent_color,
            public_flags: self.public_flags,
        }
    }
}

/// Minimal user reference used by presence updates; the multiplexer does
/// not track presence, only routes the event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartialUser {
    pub id: Snowflake,
}

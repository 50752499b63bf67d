use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use crate::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InviteCreateEvent<'a> {
    pub channel_id: Snowflake,
    pub code: SandwichStr<'a>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub inviter: Option<User<'a>>,
    pub max_age: u32,
    pub max_uses: u32,
    pub temporary: bool,
    pub uses: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InviteDeleteEvent<'a> {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub code: SandwichStr<'a>,
}

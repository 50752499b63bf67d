use crate::snowflake::Snowflake;
use serde::{Deserialize, Serialize};

/// Monetization entitlement. Routed only — the multiplexer does not track
/// entitlement state beyond forwarding the payload downstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Entitlement {
    pub id: Snowflake,
    pub sku_id: Snowflake,
    pub application_id: Snowflake,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub entitlement_type: u8,
    #[serde(default)]
    pub consumed: bool,
}

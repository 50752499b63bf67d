use crate::snowflake::Snowflake;
use crate::string::SandwichStr;
use serde::{Deserialize, Serialize};

/// A single audit log entry, as delivered by `GUILD_AUDIT_LOG_ENTRY_CREATE`.
/// Routed only; the multiplexer does not interpret `action_type` or `changes`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditLogEntry<'a> {
    pub id: Snowflake,
    #[serde(default)]
    pub target_id: Option<SandwichStr<'a>>,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    pub action_type: u32,
    #[serde(default)]
    pub reason: Option<SandwichStr<'a>>,
}

use serde::Deserialize;

/// Response from `GET /gateway/bot` — the one endpoint a manager needs
/// before it can start any shard: the connect URL, the recommended shard
/// count, and the identify concurrency bucket size.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBotResponse {
    pub url: String,
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    pub reset_after: u64,
    pub max_concurrency: u32,
}

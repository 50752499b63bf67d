use sandwich_model::Snowflake;
use thiserror::Error;

/// Errors surfaced by state cache operations. Most operations here are
/// infallible upserts; this enum exists for the handful that aren't.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("guild {0} not found")]
    GuildNotFound(Snowflake),
    #[error("channel {0} not found")]
    ChannelNotFound(Snowflake),
}

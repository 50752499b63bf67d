//! Gateway error types and the close-code policy table.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON decode error: {0}")]
    JsonDecode(String),

    #[error("session invalidated, resumable: {resumable}")]
    InvalidSession { resumable: bool },

    #[error("connection closed: code={code}, reason={reason}")]
    Closed { code: u16, reason: String },

    #[error("heartbeat acknowledgment timeout")]
    HeartbeatTimeout,

    #[error("fatal close code {0:?}: sharding cannot proceed")]
    Fatal(CloseCode),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shard is not connected")]
    NotConnected,

    #[error("producer error: {0}")]
    Producer(#[from] sandwich_producer::ProducerError),

    #[error("REST request failed: {0}")]
    Http(#[from] sandwich_http::HttpError),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::JsonDecode(err.to_string())
    }
}

impl<T> From<flume::SendError<T>> for GatewayError {
    fn from(_err: flume::SendError<T>) -> Self {
        GatewayError::Closed {
            code: 0,
            reason: "internal event channel closed".to_string(),
        }
    }
}

/// Discord Gateway close codes in the 4000-4014 range (4006 is reserved and
/// never sent to clients).
///
/// See: <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-close-event-codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSeq = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            4000 => Some(CloseCode::UnknownError),
            4001 => Some(CloseCode::UnknownOpcode),
            4002 => Some(CloseCode::DecodeError),
            4003 => Some(CloseCode::NotAuthenticated),
            4004 => Some(CloseCode::AuthenticationFailed),
            4005 => Some(CloseCode::AlreadyAuthenticated),
            4007 => Some(CloseCode::InvalidSeq),
            4008 => Some(CloseCode::RateLimited),
            4009 => Some(CloseCode::SessionTimedOut),
            4010 => Some(CloseCode::InvalidShard),
            4011 => Some(CloseCode::ShardingRequired),
            4012 => Some(CloseCode::InvalidApiVersion),
            4013 => Some(CloseCode::InvalidIntents),
            4014 => Some(CloseCode::DisallowedIntents),
            _ => None,
        }
    }

    /// Fatal codes stop the shard outright: no reconnect, the owning
    /// ShardGroup reports failure.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            CloseCode::AuthenticationFailed
                | CloseCode::InvalidShard
                | CloseCode::ShardingRequired
                | CloseCode::InvalidApiVersion
                | CloseCode::InvalidIntents
                | CloseCode::DisallowedIntents
        )
    }

    /// Codes that reconnect but must not attempt RESUME: the shard clears
    /// its session/sequence and re-IDENTIFYs from scratch.
    pub const fn forces_fresh_identify(self) -> bool {
        matches!(self, CloseCode::InvalidSeq | CloseCode::SessionTimedOut)
    }

    /// Whether a reconnect should be attempted at all. Fatal codes never
    /// reconnect; everything else does (either RESUME or fresh IDENTIFY).
    pub const fn can_reconnect(self) -> bool {
        !self.is_fatal()
    }

    /// Whether reconnecting should attempt RESUME (as opposed to a fresh
    /// IDENTIFY). Fatal codes never reach here because `can_reconnect` is
    /// checked first.
    pub const fn is_resumable(self) -> bool {
        self.can_reconnect() && !self.forces_fresh_identify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_intents_is_fatal_and_never_reconnects() {
        let code = CloseCode::InvalidIntents;
        assert!(code.is_fatal());
        assert!(!code.can_reconnect());
    }

    #[test]
    fn session_timed_out_reconnects_with_a_fresh_identify() {
        let code = CloseCode::SessionTimedOut;
        assert!(code.can_reconnect());
        assert!(code.forces_fresh_identify());
        assert!(!code.is_resumable());
    }

    #[test]
    fn unknown_error_reconnects_and_resumes() {
        let code = CloseCode::UnknownError;
        assert!(code.can_reconnect());
        assert!(code.is_resumable());
    }

    #[test]
    fn from_code_rejects_the_reserved_4006() {
        assert!(CloseCode::from_code(4006).is_none());
    }
}

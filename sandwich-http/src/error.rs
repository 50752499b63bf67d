use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64, global: bool },

    #[error("Discord API error {code}: {message}")]
    Discord { code: u32, message: String },

    #[error("unauthorized: invalid token")]
    Unauthorized,

    #[error("Discord server error: {0}")]
    ServerError(u16),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(Debug, serde::Deserialize)]
pub struct DiscordError {
    pub code: u32,
    pub message: String,
}

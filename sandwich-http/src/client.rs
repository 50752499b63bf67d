use crate::error::{DiscordError, HttpError};
use crate::ratelimit::RateLimiter;
use crate::routes::GatewayBotResponse;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};

const API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT_VALUE: &str = concat!(
    "DiscordBot (https://github.com/WelcomerTeam/sandwich-rs, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Discord REST client, trimmed to the single call a manager needs before it
/// can start sharding: `GET /gateway/bot`.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    pub fn new(token: impl AsRef<str>) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bot {}", token.as_ref()))
                .map_err(HttpError::InvalidHeaderValue)?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(),
        })
    }

    pub async fn get_gateway_bot(&self) -> Result<GatewayBotResponse, HttpError> {
        self.rate_limiter.acquire().await;

        let url = format!("{API_BASE}/gateway/bot");
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse().ok())
        {
            let reset_after = response
                .headers()
                .get("x-ratelimit-reset-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .map(|f| (f * 1000.0) as u64)
                .unwrap_or(1000);
            self.rate_limiter.update(remaining, reset_after);
        }

        match status {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                let body: serde_json::Value = response.json().await?;
                let retry_after = body
                    .get("retry_after")
                    .and_then(|v| v.as_f64())
                    .map(|f| (f * 1000.0) as u64)
                    .unwrap_or(5000);
                let global = body
                    .get("global")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if global {
                    self.rate_limiter.set_global(retry_after);
                }
                Err(HttpError::RateLimited {
                    retry_after_ms: retry_after,
                    global,
                })
            }
            StatusCode::UNAUTHORIZED => Err(HttpError::Unauthorized),
            _ if status.is_server_error() => Err(HttpError::ServerError(status.as_u16())),
            _ => {
                let error: DiscordError = response.json().await?;
                Err(HttpError::Discord {
                    code: error.code,
                    message: error.message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_succeeds_with_a_token() {
        let client = HttpClient::new("test_token");
        assert!(client.is_ok());
    }
}

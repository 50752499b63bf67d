use thiserror::Error;

/// Unified error type for the Sandwich daemon.
#[derive(Debug, Error)]
pub enum SandwichError {
    /// Errors from the Gateway (WebSocket, sharding, dispatch).
    #[error("gateway error: {0}")]
    Gateway(#[from] sandwich_gateway::error::GatewayError),

    /// Errors from the REST client used for `/gateway/bot`.
    #[error("HTTP error: {0}")]
    Http(#[from] sandwich_http::HttpError),

    /// Errors from the producer transport.
    #[error("producer error: {0}")]
    Producer(#[from] sandwich_producer::ProducerError),

    /// A manager name was looked up that doesn't exist in the registry.
    #[error("unknown manager: {0}")]
    UnknownManager(String),

    /// A manager name was registered twice.
    #[error("manager already registered: {0}")]
    DuplicateManager(String),
}

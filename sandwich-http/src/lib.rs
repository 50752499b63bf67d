//! REST surface needed before sharding can start.
//!
//! Everything else Discord's REST API exposes (channels, interactions,
//! moderation, webhooks, ...) is out of scope for a gateway multiplexer —
//! this crate exists only to answer "how many shards, and how fast can I
//! identify them".

pub mod client;
pub mod error;
pub mod ratelimit;
pub mod routes;

pub use client::HttpClient;
pub use error::HttpError;
pub use routes::GatewayBotResponse;

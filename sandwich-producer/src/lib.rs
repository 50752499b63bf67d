//! Abstract message-producer contract.
//!
//! Every concrete wire transport (NATS JetStream, Kafka, ...) is an external
//! collaborator this crate doesn't implement — it only defines the contract
//! a transport must satisfy, plus one concrete, in-process reference
//! transport (`LocalProducer`) that is enough to exercise the contract
//! end-to-end without a network dependency.

pub mod error;
pub mod local;

pub use error::ProducerError;
pub use local::{LocalProducer, LocalProducerConfig};

/// Why a shard's outbound queue is being closed. Mirrors the two cases the
/// reference transport this was modelled on actually distinguishes: a
/// resharding operation reassigning the shard elsewhere, versus the owning
/// manager shutting down entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseShardReason {
    Resharding,
    ManagerClosed,
}

/// A destination a dispatched event is published to.
pub struct PublishMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

/// Transport used to hand dispatched events off to whatever consumes them
/// downstream. `close_shard`/`stop_session` are frequently no-ops for
/// transports with no per-shard routing concept — this isn't a bug in a
/// given implementation, it's a transport that doesn't need to do anything
/// there.
pub trait Producer: Send + Sync {
    fn connect(&self) -> Result<(), ProducerError>;
    fn publish(&self, channel: &str, message: PublishMessage) -> Result<(), ProducerError>;
    fn close_shard(&self, shard_id: u32, reason: CloseShardReason);
    fn stop_session(&self, session_id: &str);
    fn close(&self);
    fn is_closed(&self) -> bool;
}

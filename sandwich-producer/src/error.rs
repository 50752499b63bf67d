use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("producer is closed")]
    Closed,
    #[error("channel {0} has no configured subject capacity")]
    UnknownChannel(String),
}

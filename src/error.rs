use thiserror::Error;

/// Errors raised by the feature pipeline
///
/// `UnknownPlayer` and `MalformedRecord` indicate a broken event sequence
/// or a corrupt game log and must propagate to the caller
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("no registered state for player {0}")]
    UnknownPlayer(String),
    #[error("invalid card label {0:?}")]
    InvalidCard(String),
    #[error("malformed game record: {0}")]
    MalformedRecord(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

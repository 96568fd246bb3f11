use thiserror::Error;

/// Errors raised by protocol engines.
///
/// None of these abort a pass: the pipeline logs them and moves on to the
/// next unit of work.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine destroyed")]
    Destroyed,

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("invalid tracker url {url}: {reason}")]
    InvalidTracker { url: String, reason: String },

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

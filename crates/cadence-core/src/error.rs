use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRRule(String),

    #[error("Invalid exception: {0}")]
    InvalidException(String),

    #[error("Event {0} does not recur")]
    NotRecurring(Uuid),
}

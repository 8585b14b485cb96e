use thiserror::Error;

use crate::state::Phase;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Cannot move from {from} to {to}: {reason}")]
    TransitionBlocked { from: Phase, to: Phase, reason: String },

    #[error("No active session: start a campaign before issuing phase actions")]
    SessionNotStarted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

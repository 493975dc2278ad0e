//! Error taxonomy for the irrigation pipeline.
//!
//! - [`InputError`] rejects a single malformed ingest event.
//! - [`CollaboratorError`] describes a failed side effect (store, weather,
//!   actuator, notifier). It is logged and the pipeline moves on.

use std::time::Duration;

use thiserror::Error;

// ---

/// A required ingest field is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl InputError {
    /// Name of the offending field, echoed back to the client.
    pub fn field(&self) -> &'static str {
        match self {
            InputError::MissingField(field) => field,
            InputError::InvalidField { field, .. } => field,
        }
    }
}

/// An external collaborator failed to complete a call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("rejected with status {status}")]
    Rejected { status: u16 },

    #[error("unexpected response: {0}")]
    Malformed(String),
}

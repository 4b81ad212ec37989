//! Errors raised at the input boundary.
//!
//! The pipeline itself never fails; only turning caller-supplied JSON into a
//! [`crate::SessionInput`] can.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized input shape: {0}")]
    UnrecognizedInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

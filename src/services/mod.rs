//! Filesystem-facing services.

pub mod session_store;

pub use session_store::{Project, SessionStore};

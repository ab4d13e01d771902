//! Error types for throttle configuration and setup.
//!
//! Task errors are not represented here: a run returns the task's own error
//! type verbatim. These errors cover the configuration surface, which fails
//! before any task is dispatched.

use thiserror::Error;

/// Errors produced while building or configuring a throttle.
#[derive(Debug, Error)]
pub enum ThrottleError {
    /// A concurrency limit that is not a non-negative integer.
    #[error("invalid concurrency limit: {0}")]
    InvalidLimit(i64),
    /// Configuration could not be parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

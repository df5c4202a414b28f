//! Error taxonomy for session start.
//!
//! Only configuration and connection problems block a session from starting.
//! Everything that can go wrong after start (a field that fails its cast, a
//! point the endpoint rejects, a 429) is recovered locally by the loop that
//! hit it and reported through the log stream instead of a typed error.

use thiserror::Error;

/// Validation failures for a [`SessionConfig`](crate::config::SessionConfig).
///
/// Raised before a session starts; a config that fails validation never
/// reaches the pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("API key must not be empty")]
    MissingApiKey,
    #[error("endpoint URL must not be empty")]
    MissingEndpoint,
    #[error("device port must not be empty")]
    MissingDevicePort,
    #[error("collection interval must be at least 1 second (got {0})")]
    IntervalTooShort(u64),
    #[error("inter-request delay must be zero or a positive number (got {0})")]
    InvalidDelay(f64),
}

/// Errors that abort `Session::start` before any task is launched.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("device connection failed: {0:#}")]
    Connection(anyhow::Error),
    #[error("session is already running")]
    AlreadyRunning,
}

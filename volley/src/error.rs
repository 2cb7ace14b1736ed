use thiserror::Error;

use crate::config::ConfigError;

/// Errors that prevent a run from being constructed or completed.
///
/// Failures of individual requests are never reported through this type, they are recorded
/// in the [`crate::RunSummary`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// An engine task (ticket source or aggregator) panicked or was cancelled.
    #[error("engine task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

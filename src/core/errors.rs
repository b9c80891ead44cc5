/*!
 * Error Types
 * Centralized error handling with thiserror and serde support
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process-descriptor validation errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("pid is required and must be non-empty")]
    MissingPid,

    #[error("pid '{0}' already exists")]
    DuplicatePid(String),

    #[error("pid '{0}' is not a known process")]
    UnknownPid(String),

    #[error("invalid bursts: {0}")]
    InvalidBursts(String),

    #[error("arrival_time must be >= 0")]
    InvalidArrival,

    #[error("queue must be either USER or SYS")]
    InvalidQueue,

    #[error("invalid memory profile: {0}")]
    InvalidMemoryProfile(String),
}

/// Simulator boundary errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("simulator is not initialized")]
    NotInitialized,

    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SimError {
    /// Shorthand for a configuration rejection
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Config(msg.into())
    }
}

impl From<String> for SimError {
    fn from(msg: String) -> Self {
        SimError::Internal(msg)
    }
}

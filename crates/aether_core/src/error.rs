//! Error types for the Aether engine.

use std::path::PathBuf;

/// Errors that can occur while building, stepping, persisting or restoring a run.
///
/// None of these are retried internally: a failed step leaves the last completed
/// checkpoint as the recovery point.
#[derive(Debug, thiserror::Error)]
pub enum AetherError {
    /// Invalid construction parameters (seed out of the safe range, bad dimension, ...)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Memory budget too small to hold the minimal block shape
    #[error(
        "Grid block starting at outer coordinate {min_outer} cannot hold {min_length} slices within {budget_bytes} bytes"
    )]
    Capacity {
        min_outer: i64,
        min_length: usize,
        budget_bytes: u64,
    },

    /// A persisted block that should exist cannot be found
    #[error("No grid block with min outer coordinate {min_outer} could be found at {}", location.display())]
    MissingBlock { min_outer: i64, location: PathBuf },

    /// Checkpoint or block file unreadable or mismatched
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Durable storage failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A region processor failed
    #[error("Region processor failed: {0}")]
    Processor(#[from] anyhow::Error),
}

impl From<bincode::Error> for AetherError {
    fn from(err: bincode::Error) -> Self {
        AetherError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for AetherError {
    fn from(err: serde_json::Error) -> Self {
        AetherError::Serialization(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, AetherError>;

//! Error types
//!
//! Only startup errors are fatal. Network errors never leave the peer sync
//! loop and the simulation itself has no error states.

use std::path::PathBuf;

use thiserror::Error;

/// Conditions that stop the client before the session starts
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("epoch {epoch} is less than 3 seconds away (try {suggested})")]
    EpochTooSoon { epoch: u64, suggested: u64 },
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
    #[error("system clock is before the unix epoch")]
    Clock,
    #[error("failed to read config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build http client: {0}")]
    Http(String),
    #[error("failed to start peer sync thread: {0}")]
    Worker(#[source] std::io::Error),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// A failed position exchange; always non-fatal
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("server answered with status {0}")]
    Status(u16),
}

/// Rejected shell mesh
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{colors} colors supplied for {vertices} vertices")]
    ColorCountMismatch { vertices: usize, colors: usize },
    #[error("index count {0} is not a multiple of 3")]
    NotTriangles(usize),
}

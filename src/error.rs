//! Error types for the in-memory tracer
//!
//! Nothing in here is ever surfaced to a host from the recording path: the
//! hot path logs and swallows. These errors exist for the explicit APIs
//! (registry resolution, configuration, dump parsing) that callers can act on.

use thiserror::Error;

/// Errors produced by the tracer and its offline tooling
#[derive(Error, Debug)]
pub enum TraceError {
    /// The event registry is full of other call sites
    #[error("event registry overflow: cannot track {file}:{line}")]
    Overflow { file: String, line: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("tracer configuration already installed")]
    AlreadyConfigured,

    /// No trace could be created for the calling thread (teardown or re-entry)
    #[error("thread trace unavailable")]
    Unavailable,

    #[error("registry capacity must be > 0, got {0}")]
    InvalidCapacity(usize),

    /// Malformed line in a dump file (1-indexed line number)
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Result type for tracer operations
pub type Result<T> = std::result::Result<T, TraceError>;

impl TraceError {
    /// True if this is a registry overflow
    pub fn is_overflow(&self) -> bool {
        matches!(self, TraceError::Overflow { .. })
    }
}

//! Error types for slurmstat
//!
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations. Note that malformed accounting
//! records and unrecognized job states are *not* errors: they are counted
//! by the accumulator and surfaced in the report instead.

use thiserror::Error;

/// Main error type for slurmstat operations
#[derive(Error, Debug)]
pub enum SlurmstatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid date format
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The accounting command exited non-zero; no partial report is produced
    #[error("{command} exited with code {code}: {output}")]
    SacctFailed {
        /// The full command line that was invoked
        command: String,
        /// Exit code (-1 when terminated by a signal)
        code: i32,
        /// Captured output from the failed invocation
        output: String,
    },
}

/// Convenience type alias for Results in slurmstat
pub type Result<T> = std::result::Result<T, SlurmstatError>;

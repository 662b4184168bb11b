//! Error types for channel operations

use thiserror::Error;

/// Errors that can occur during channel operations
///
/// Every error return leaves shared state unchanged: no cursor, register,
/// or ledger mutation survives a failed call. A short count from `write`
/// or `read` is NOT an error - truncation is policy and is reported
/// through the `Ok` count.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Unrecognized or out-of-range control command code
    #[error("Invalid control command code: {code}")]
    InvalidCommand {
        /// The rejected command code
        code: u32,
    },

    /// Caller-memory validation or transfer failure
    #[error("Access fault: {reason}")]
    AccessFault {
        /// What the transfer needed and the cell could not provide
        reason: &'static str,
    },

    /// Blocking wait aborted by an external cancellation signal
    #[error("Operation interrupted before completion")]
    Interrupted,

    /// Construction-time parameter validation failure
    #[error("Invalid device configuration: {reason}")]
    InvalidConfig {
        /// Which parameter was rejected and why
        reason: String,
    },

    /// IO error while capturing a task snapshot
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

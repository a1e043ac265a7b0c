//! Error types for lnmock operations.
//!
//! All failures are reported as structured [`LnMockError`] values; the
//! only place an error becomes a process exit is the CLI binary, which
//! prints it as a `{code, message}` object on stderr. The display
//! strings double as the wire-level error messages, so the subprocess
//! backend can map a remote message back onto the same variant.

use crate::client::Operation;
use crate::invoice::InvoiceStatus;

/// Comprehensive error type for lnmock operations.
#[derive(thiserror::Error, Debug)]
pub enum LnMockError {
    /// Invoice creation with a label that already exists.
    #[error("label already in use: {0}")]
    DuplicateLabel(String),

    /// Operation on a label no invoice carries.
    #[error("label not found: {0}")]
    NotFound(String),

    /// Delete with an expected status the invoice is not in.
    #[error("invoice {label} is {actual}, expected {expected}")]
    StatusMismatch {
        /// The targeted invoice label.
        label: String,
        /// Status the caller asserted.
        expected: InvoiceStatus,
        /// Status the invoice actually has.
        actual: InvoiceStatus,
    },

    /// Preimage that is not valid hex.
    #[error("invalid preimage: {0}")]
    InvalidPreimage(String),

    /// Simulation-only operation issued against the real-RPC backend.
    #[error("{0} is not supported on this backend")]
    Unsupported(Operation),

    /// Subprocess or RPC client failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// State file could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed state document or wire payload.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LnMockError {
    /// Reconstructs a variant from a remote backend's error message.
    ///
    /// Messages produced by [`std::fmt::Display`] on this type survive
    /// the round trip; anything unrecognized becomes `Transport`.
    pub fn from_remote(message: &str) -> Self {
        if let Some(label) = message.strip_prefix("label already in use: ") {
            return Self::DuplicateLabel(label.to_string());
        }
        if let Some(label) = message.strip_prefix("label not found: ") {
            return Self::NotFound(label.to_string());
        }
        if let Some(reason) = message.strip_prefix("invalid preimage: ") {
            return Self::InvalidPreimage(reason.to_string());
        }
        if let Some(rest) = message.strip_prefix("invoice ") {
            if let Some((label, tail)) = rest.split_once(" is ") {
                if let Some((actual, expected)) = tail.split_once(", expected ") {
                    if let (Ok(actual), Ok(expected)) = (actual.parse(), expected.parse()) {
                        return Self::StatusMismatch {
                            label: label.to_string(),
                            expected,
                            actual,
                        };
                    }
                }
            }
        }
        Self::Transport(message.to_string())
    }
}

impl From<serde_json::Error> for LnMockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LnMockError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

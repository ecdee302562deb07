//! Primitive parsing errors

use thiserror::Error;

/// Error parsing a primitive from its textual form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

//! Core Error Types
//!
//! Errors raised by parameter/run-state access and input-data loading.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Named-field access on an unknown model parameter
    #[error("invalid model parameter: {0}")]
    UnknownParameter(String),

    /// Named-field access on an unknown run variable
    #[error("invalid run variable: {0}")]
    UnknownRunVariable(String),

    /// Value kind does not match the addressed field
    #[error("type mismatch for '{key}': expected {expected}")]
    TypeMismatch {
        /// Field key
        key: &'static str,
        /// Expected value kind
        expected: &'static str,
    },

    /// Derived field that cannot be written
    #[error("{0} is read-only")]
    ReadOnly(&'static str),

    /// Input file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-numeric or malformed field in an input file
    #[error("parse error at line {line}, column {column}: '{value}'")]
    Parse {
        /// 1-based line number
        line: usize,
        /// 0-based column index
        column: usize,
        /// Offending text
        value: String,
    },

    /// Input file ended before the expected content
    #[error("missing data: {0}")]
    MissingData(&'static str),

    /// Matrix or vector has the wrong shape
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// What was being shaped
        what: &'static str,
        /// Expected (rows, cols)
        expected: (usize, usize),
        /// Actual (rows, cols)
        actual: (usize, usize),
    },
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

// ============================================================================
// Tests
// ============================================================================

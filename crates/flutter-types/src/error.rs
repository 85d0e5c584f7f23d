// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all code search failures.
#[derive(Error, Debug)]
pub enum FlutterError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input (code bits, weight, lengths).
    #[error("validation error: {0}")]
    Validation(String),

    /// Candidate generation broke one of its own invariants.
    ///
    /// Signals a logic defect, never a recoverable condition.
    #[error("internal consistency violation: {0}")]
    Consistency(String),

    /// External random search process could not be run or failed.
    #[error("delegation error: {0}")]
    Delegation(String),

    /// Result file of the external search is missing or malformed.
    #[error("result file error: {path}: {reason}")]
    ResultFile { path: String, reason: String },

    /// Packed sequence could not be expanded into a code.
    #[error("decode error: {0}")]
    Decode(String),

    /// Numerical error (NaN/Inf, singular matrix).
    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FlutterResult<T> = Result<T, FlutterError>;

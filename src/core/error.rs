// This module defines error types for the fence insertion pass using the thiserror crate
// for idiomatic Rust error handling. The analysis itself is total: none of these errors
// abort a pass run. FenceError::OracleUnavailable is produced when the alias oracle has
// no information for a function; the orchestrator logs it, records it in the run result
// and carries on with the rest of the module. The remaining variants belong to the
// surfaces around the pass (looking up functions by name, parsing TIR input, reading
// files in the command-line driver). FenceResult<T> is a convenience alias.

//! Error types for the fence insertion pass.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Main error type for the pass and its drivers.
#[derive(Error, Debug)]
pub enum FenceError {
    #[error("Alias information unavailable for function {function}")]
    OracleUnavailable {
        function: String,
    },

    #[error("Function not found: {name}")]
    UnknownFunction {
        name: String,
    },

    #[error("Parse error: {reason}")]
    Parse {
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for fallible operations around the pass.
pub type FenceResult<T> = Result<T, FenceError>;

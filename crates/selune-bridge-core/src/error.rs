//! Bridge error types.

use crate::tag::TypeTag;
use thiserror::Error;

/// Text carried by a compile error when the engine failed without leaving a
/// describable value on the stack.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Result alias used across the bridge.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Every recoverable failure the bridge reports.
///
/// Faults raised by the engine outside a protected call are not represented
/// here: they go to the fatal-error hook and never return.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BridgeError {
    /// A stack index was zero or resolved outside `[1, depth]`.
    #[error("stack index {index} out of range (depth {depth})")]
    Index { index: i32, depth: i32 },

    /// A chunk failed to load.
    #[error("compile error: {0}")]
    Compile(String),

    /// A protected call failed; carries the error value converted to text.
    #[error("{0}")]
    Call(String),

    /// An opaque handle no longer matches the value at its captured position.
    #[error("stale handle at position {position}: expected {expected}, found {found}")]
    StaleHandle {
        position: i32,
        expected: String,
        found: String,
    },

    /// A host value could not be pushed as-is.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// The engine refused to grow the stack.
    #[error("stack overflow (cannot reserve {requested} slots)")]
    StackOverflow { requested: i32 },

    /// Raised by a host function; surfaces in the VM as a string error.
    #[error("{0}")]
    Runtime(String),

    /// The engine could not allocate a new state.
    #[error("cannot allocate interpreter state")]
    Allocation,
}

impl BridgeError {
    /// Convenience constructor for host functions reporting a failure.
    pub fn runtime(msg: impl Into<String>) -> Self {
        BridgeError::Runtime(msg.into())
    }

    /// Build a compile error from an optional engine description.
    pub fn compile(description: Option<String>) -> Self {
        BridgeError::Compile(description.unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
    }

    /// Build a stale-handle error from the expected and found slot descriptions.
    pub fn stale(position: i32, expected: (TypeTag, &str), found: (TypeTag, &str)) -> Self {
        BridgeError::StaleHandle {
            position,
            expected: format!("{} `{}`", expected.0, expected.1),
            found: format!("{} `{}`", found.0, found.1),
        }
    }

    /// True for errors that indicate a caller bug rather than bad input.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, BridgeError::Index { .. } | BridgeError::StaleHandle { .. })
    }
}

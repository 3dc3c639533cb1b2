//! Error types for converse-state operations.

use crate::storage::StorageError;
use thiserror::Error;

/// Result type alias for converse-state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while resolving paths or mutating scoped memory.
///
/// Missing values are deliberately not represented here: a read of an
/// absent key resolves to `None` (or a caller default), never an error.
#[derive(Debug, Error)]
pub enum StateError {
    /// A path (or a required argument) was null or empty.
    #[error("path is required: {what}")]
    PathRequired {
        /// Description of the missing argument.
        what: &'static str,
    },

    /// The leading path token does not match any registered memory scope.
    #[error("'{name}' does not match any memory scope")]
    NoSuchScope {
        /// The scope name that was attempted.
        name: String,
    },

    /// The operation is not supported by the target scope.
    #[error("{operation} is not supported by the '{scope}' memory scope")]
    NotSupported {
        /// Name of the scope that rejected the operation.
        scope: String,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The path text or its use is malformed.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A segment was applied to a node of the wrong kind.
    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: String,
        /// The expected node kind.
        expected: &'static str,
        /// The actual node kind found.
        found: &'static str,
    },

    /// Array index is out of bounds.
    ///
    /// Arrays are never auto-created or grown by `set`; the caller must
    /// pre-initialize them.
    #[error("index {index} out of bounds (len: {len}) at '{path}'")]
    IndexOutOfBounds {
        /// The path to the array.
        path: String,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the array.
        len: usize,
    },

    /// Invalid operation error.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong.
        message: String,
    },

    /// A storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// Create a path required error.
    #[inline]
    pub fn path_required(what: &'static str) -> Self {
        StateError::PathRequired { what }
    }

    /// Create an unknown scope error.
    #[inline]
    pub fn no_such_scope(name: impl Into<String>) -> Self {
        StateError::NoSuchScope { name: name.into() }
    }

    /// Create a not supported error.
    #[inline]
    pub fn not_supported(scope: impl Into<String>, operation: &'static str) -> Self {
        StateError::NotSupported {
            scope: scope.into(),
            operation,
        }
    }

    /// Create an invalid path error.
    #[inline]
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        StateError::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: impl Into<String>, index: usize, len: usize) -> Self {
        StateError::IndexOutOfBounds {
            path: path.into(),
            index,
            len,
        }
    }

    /// Create an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StateError::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        StateError::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }
}

/// Get the kind name of a JSON node, for diagnostics.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

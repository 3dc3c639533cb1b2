//! Shared mutable document backing a turn-lifetime memory scope.
//!
//! `Document` wraps a `Mutex<Value>` so a scope can hand out snapshots
//! and accept replacements without the caller holding a borrow across
//! the turn.

use crate::error::{StateError, StateResult};
use serde_json::Value;
use std::sync::Mutex;

/// Shared mutable JSON document.
pub struct Document(Mutex<Value>);

impl Document {
    /// Create a new document with the given initial value.
    pub fn new(value: Value) -> Self {
        Self(Mutex::new(value))
    }

    /// Clone the current document value.
    pub fn snapshot(&self) -> StateResult<Value> {
        Ok(self.lock()?.clone())
    }

    /// Replace the document value.
    pub fn replace(&self, value: Value) -> StateResult<()> {
        *self.lock()? = value;
        Ok(())
    }

    /// Run a closure with mutable access to the document.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> StateResult<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Consume the document and return the inner value.
    pub fn into_inner(self) -> StateResult<Value> {
        self.0
            .into_inner()
            .map_err(|_| StateError::invalid_operation("document mutex poisoned"))
    }

    fn lock(&self) -> StateResult<std::sync::MutexGuard<'_, Value>> {
        self.0
            .lock()
            .map_err(|_| StateError::invalid_operation("document mutex poisoned"))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self::new(self.snapshot().unwrap_or(Value::Null))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Document").field(&"<Value>").finish()
    }
}

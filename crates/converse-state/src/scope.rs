//! Memory scope contract and registry.
//!
//! A memory scope is one named root namespace in the memory tree
//! (`user`, `conversation`, `turn`, ...). Each scope knows how to fetch
//! and replace its backing node for the current turn and whether it
//! participates in diagnostic snapshots.

use crate::error::{StateError, StateResult};
use crate::scopes;
use crate::turn::TurnContext;
use serde_json::Value;
use std::sync::Arc;

/// A named root namespace over turn state.
pub trait MemoryScope: Send + Sync {
    /// The unique scope name used as the leading path token.
    fn name(&self) -> &str;

    /// Whether this scope's memory appears in diagnostic snapshots.
    fn include_in_snapshot(&self) -> bool {
        true
    }

    /// Fetch the scope's backing node for this turn.
    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value>;

    /// Replace the scope's backing node.
    ///
    /// Read-only scopes fail with a not-supported error.
    fn set_memory(&self, turn: &TurnContext, memory: Value) -> StateResult<()>;
}

/// Registry of memory scopes, constructed per state-manager instance.
///
/// Scope names are globally unique within a registry and are matched
/// case-insensitively during path resolution.
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    scopes: Vec<Arc<dyn MemoryScope>>,
}

impl ScopeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard scope set: `turn`,
    /// `dialog`, `this`, `class`, `settings`, `user`, `conversation`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for scope in scopes::standard_scopes() {
            // Names in the standard set are disjoint.
            let _ = registry.register(scope);
        }
        registry
    }

    /// Register a scope. Fails if the name is already taken.
    pub fn register(&mut self, scope: Arc<dyn MemoryScope>) -> StateResult<()> {
        if self.get(scope.name()).is_some() {
            return Err(StateError::invalid_operation(format!(
                "memory scope '{}' is already registered",
                scope.name()
            )));
        }
        self.scopes.push(scope);
        Ok(())
    }

    /// Look up a scope by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn MemoryScope>> {
        self.scopes
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Iterate the registered scopes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MemoryScope>> {
        self.scopes.iter()
    }

    /// The registered scope names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_names() {
        let registry = ScopeRegistry::standard();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "turn",
                "dialog",
                "this",
                "class",
                "settings",
                "user",
                "conversation"
            ]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ScopeRegistry::standard();
        assert!(registry.get("TURN").is_some());
        assert!(registry.get("Conversation").is_some());
        assert!(registry.get("xxx").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ScopeRegistry::standard();
        let err = registry
            .register(std::sync::Arc::new(crate::scopes::TurnScope))
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidOperation { .. }));
    }
}

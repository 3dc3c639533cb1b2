//! State manager facade: resolvers + scopes + evaluator behind typed
//! get/set/remove operations.
//!
//! One manager is constructed per turn around that turn's context. All
//! path strings accepted here may be shorthand (`$foo`, `#intent`,
//! `@entity`) or canonical (`dialog.foo`); resolvers rewrite shorthand
//! before scope lookup.

use crate::error::{StateError, StateResult};
use crate::eval;
use crate::path::{parse_path, Seg};
use crate::resolver::{default_resolvers, PathResolver};
use crate::scope::{MemoryScope, ScopeRegistry};
use crate::storage::Storage;
use crate::turn::TurnContext;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// A path resolved down to its scope and concrete segments.
struct Resolved {
    scope: Arc<dyn MemoryScope>,
    segs: Vec<Seg>,
    canonical: String,
}

/// Typed, path-addressed access to scoped dialog memory.
pub struct DialogStateManager {
    turn: Arc<TurnContext>,
    registry: ScopeRegistry,
    resolvers: Vec<Box<dyn PathResolver>>,
}

impl DialogStateManager {
    /// Create a manager over `turn` with the standard scope registry
    /// and resolver set.
    pub fn new(turn: Arc<TurnContext>) -> Self {
        Self::new_with(turn, ScopeRegistry::standard(), default_resolvers())
    }

    /// Create a manager with an explicit registry and resolver chain.
    pub fn new_with(
        turn: Arc<TurnContext>,
        registry: ScopeRegistry,
        resolvers: Vec<Box<dyn PathResolver>>,
    ) -> Self {
        Self {
            turn,
            registry,
            resolvers,
        }
    }

    /// The turn context this manager operates on.
    pub fn turn(&self) -> &TurnContext {
        &self.turn
    }

    /// Rewrite shorthand prefixes to canonical form by running every
    /// registered resolver in order.
    pub fn transform_path(&self, path: &str) -> StateResult<String> {
        if path.is_empty() {
            return Err(StateError::path_required("path"));
        }
        let mut out = path.to_string();
        for resolver in &self.resolvers {
            out = resolver.transform_path(&out)?;
        }
        Ok(out)
    }

    /// Read the raw node at `path`, or `None` if anything along the way
    /// is missing.
    ///
    /// Fails only on malformed paths or unknown scope names; absent
    /// values are not errors.
    pub fn try_get_value(&self, path: &str) -> StateResult<Option<Value>> {
        let resolved = self.resolve(path)?;
        let memory = resolved.scope.get_memory(&self.turn)?;
        Ok(eval::get_at(&memory, &resolved.segs)?.cloned())
    }

    /// Read and deserialize the value at `path`.
    pub fn get_value<T: DeserializeOwned>(&self, path: &str) -> StateResult<Option<T>> {
        match self.try_get_value(path)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read the value at `path`, falling back to `default` when it is
    /// missing.
    pub fn get_value_or<T, F>(&self, path: &str, default: F) -> StateResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        Ok(self.get_value(path)?.unwrap_or_else(default))
    }

    /// Set the value at `path`, creating intermediate mappings as
    /// needed. A bare scope name replaces that scope's whole memory.
    pub fn set_value(&self, path: &str, value: impl Serialize) -> StateResult<()> {
        let value = serde_json::to_value(value)?;
        let resolved = self.resolve(path)?;
        trace!(path = %resolved.canonical, "set value");

        if resolved.segs.is_empty() {
            return resolved.scope.set_memory(&self.turn, value);
        }

        let mut memory = resolved.scope.get_memory(&self.turn)?;
        eval::set_at(&mut memory, &resolved.segs, value, &resolved.canonical)?;
        resolved.scope.set_memory(&self.turn, memory)
    }

    /// Remove the value at `path`. Missing values are a no-op; removing
    /// a bare scope root is rejected.
    pub fn remove_value(&self, path: &str) -> StateResult<()> {
        let resolved = self.resolve(path)?;
        if resolved.segs.is_empty() {
            return Err(StateError::path_required("a property path below the scope root"));
        }
        trace!(path = %resolved.canonical, "remove value");

        let mut memory = resolved.scope.get_memory(&self.turn)?;
        if eval::remove_at(&mut memory, &resolved.segs, &resolved.canonical)? {
            resolved.scope.set_memory(&self.turn, memory)?;
        }
        Ok(())
    }

    /// Build a composite snapshot of every snapshot-eligible scope,
    /// keyed by scope name. Consumed by tracing/telemetry collaborators.
    pub fn snapshot(&self) -> StateResult<Value> {
        let mut out = Map::new();
        for scope in self.registry.iter() {
            if !scope.include_in_snapshot() {
                continue;
            }
            out.insert(scope.name().to_string(), scope.get_memory(&self.turn)?);
        }
        Ok(Value::Object(out))
    }

    /// The registered scope names. Recomputed from the live registry on
    /// each call, never cached.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.registry.names().map(str::to_owned)
    }

    /// Hydrate the persisted scopes (user/conversation) from storage.
    /// Missing rows become empty documents with no e-tag.
    pub async fn load_all(&self, storage: &dyn Storage) -> StateResult<()> {
        let targets: Vec<(String, String)> = self
            .turn
            .persisted_scopes()
            .filter_map(|scope| {
                self.turn
                    .storage_key(scope)
                    .map(|key| (scope.to_string(), key.to_string()))
            })
            .collect();

        for (scope, key) in targets {
            match storage.read(&key).await? {
                Some(item) => {
                    debug!(scope = %scope, key = %key, "loaded scope state");
                    self.turn.hydrate(&scope, item.value, Some(item.etag))?;
                }
                None => {
                    debug!(scope = %scope, key = %key, "no stored state, starting empty");
                    self.turn
                        .hydrate(&scope, Value::Object(Default::default()), None)?;
                }
            }
        }
        Ok(())
    }

    /// Persist every dirty scope. Scopes that were never written are
    /// skipped. A stale e-tag surfaces as a storage conflict error with
    /// no retry.
    pub async fn save_all(&self, storage: &dyn Storage) -> StateResult<()> {
        for (scope, key, value, etag) in self.turn.dirty_states()? {
            let new_etag = storage.write(&key, &value, etag.as_deref()).await?;
            debug!(scope = %scope, key = %key, etag = %new_etag, "saved scope state");
            self.turn.mark_saved(&scope, new_etag)?;
        }
        Ok(())
    }

    /// Transform, parse and resolve a path down to concrete segments.
    fn resolve(&self, path: &str) -> StateResult<Resolved> {
        let canonical = self.transform_path(path)?;
        let parsed = parse_path(&canonical)?;
        let (scope_name, rest) = parsed.scope_split()?;

        let scope = self
            .registry
            .get(scope_name)
            .ok_or_else(|| StateError::no_such_scope(scope_name))?
            .clone();

        let mut segs = Vec::with_capacity(rest.len());
        for seg in rest {
            segs.push(match seg {
                Seg::Expr(expr) => self.resolve_expr(&canonical, expr)?,
                concrete => concrete.clone(),
            });
        }

        Ok(Resolved {
            scope,
            segs,
            canonical,
        })
    }

    /// Evaluate a bracket expression against live memory and convert
    /// the result into a key or index segment.
    fn resolve_expr(&self, canonical: &str, expr: &str) -> StateResult<Seg> {
        match self.try_get_value(expr)? {
            Some(Value::String(key)) => Ok(Seg::Key(key)),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(idx) => Ok(Seg::Index(idx as usize)),
                None => Err(StateError::invalid_path(
                    canonical,
                    format!("bracket expression '{}' is not a valid index", expr),
                )),
            },
            Some(other) => Err(StateError::invalid_path(
                canonical,
                format!(
                    "bracket expression '{}' resolved to {}, expected string or number",
                    expr,
                    crate::error::value_type_name(&other)
                ),
            )),
            None => Err(StateError::invalid_path(
                canonical,
                format!("bracket expression '{}' did not resolve", expr),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> DialogStateManager {
        DialogStateManager::new(Arc::new(TurnContext::new("test", "conv1", "user1")))
    }

    #[test]
    fn test_round_trip_scalar() {
        let m = manager();
        m.set_value("user.name", "kia").unwrap();
        assert_eq!(m.get_value::<String>("user.name").unwrap().unwrap(), "kia");
    }

    #[test]
    fn test_round_trip_nested_object() {
        let m = manager();
        m.set_value("conversation.order", json!({"items": [1, 2], "total": 3}))
            .unwrap();
        assert_eq!(
            m.try_get_value("conversation.order.items").unwrap(),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn test_shorthand_set_and_get() {
        let m = manager();
        m.set_value("$foo", json!({"bar": [10]})).unwrap();
        assert_eq!(
            m.get_value::<i64>("$foo.bar[0]").unwrap(),
            Some(10)
        );
        assert_eq!(
            m.get_value::<i64>("dialog.foo.bar[0]").unwrap(),
            Some(10)
        );
    }

    #[test]
    fn test_unknown_scope_errors() {
        let m = manager();
        let err = m.set_value("xxx", 13).unwrap_err();
        assert!(matches!(err, StateError::NoSuchScope { name } if name == "xxx"));
    }

    #[test]
    fn test_empty_path_errors() {
        let m = manager();
        let err = m.set_value("", 13).unwrap_err();
        assert!(matches!(err, StateError::PathRequired { .. }));
    }

    #[test]
    fn test_missing_value_reads_default() {
        let m = manager();
        let v = m
            .get_value_or("user.doesNotExist", || "default".to_string())
            .unwrap();
        assert_eq!(v, "default");
    }

    #[test]
    fn test_scope_root_get_and_set() {
        let m = manager();
        m.set_value("turn", json!({"a": 1})).unwrap();
        assert_eq!(m.try_get_value("turn").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_scope_root_remove_rejected() {
        let m = manager();
        let err = m.remove_value("turn").unwrap_err();
        assert!(matches!(err, StateError::PathRequired { .. }));
    }

    #[test]
    fn test_bracket_expression_resolves_against_memory() {
        let m = manager();
        m.set_value("turn.key", "alpha").unwrap();
        m.set_value("user.entries", json!({"alpha": 42})).unwrap();

        assert_eq!(
            m.get_value::<i64>("user.entries[turn.key]").unwrap(),
            Some(42)
        );
    }

    #[test]
    fn test_bracket_expression_numeric_index() {
        let m = manager();
        m.set_value("turn.idx", 1).unwrap();
        m.set_value("user.names", json!(["a", "b"])).unwrap();

        assert_eq!(
            m.get_value::<String>("user.names[turn.idx]").unwrap(),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_unresolved_bracket_expression_errors() {
        let m = manager();
        m.set_value("user.entries", json!({})).unwrap();
        let err = m.try_get_value("user.entries[turn.missing]").unwrap_err();
        assert!(matches!(err, StateError::InvalidPath { .. }));
    }

    #[test]
    fn test_keys_enumeration_is_restartable() {
        let m = manager();
        let first: Vec<String> = m.keys().collect();
        let second: Vec<String> = m.keys().collect();
        assert_eq!(first, second);
        assert!(first.contains(&"user".to_string()));
    }
}

//! Per-turn context: the backing stores every memory scope reads from.
//!
//! One `TurnContext` is created for each conversational turn and owns
//! the turn-lifetime documents, the configuration entries feeding the
//! settings scope, a turn-local memo cache, and the cached
//! user/conversation states hydrated from persistent storage.

use crate::document::Document;
use crate::error::{StateError, StateResult};
use crate::settings::ConfigEntries;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A persisted scope's cached state for the current turn.
#[derive(Clone, Debug)]
pub struct CachedBotState {
    /// The cached document.
    pub value: Value,
    /// E-tag observed when the document was loaded, if it existed.
    pub etag: Option<String>,
    /// Whether the document changed since load and needs saving.
    pub dirty: bool,
}

impl CachedBotState {
    fn empty() -> Self {
        Self {
            value: Value::Object(Default::default()),
            etag: None,
            dirty: false,
        }
    }
}

/// Context for one conversational turn.
///
/// Each turn owns an isolated context, so no memory operation needs
/// internal locking beyond the per-document cells.
pub struct TurnContext {
    turn: Document,
    dialog: Document,
    this_state: Document,
    class: Value,
    config: ConfigEntries,
    memo: Mutex<HashMap<String, Value>>,
    bot_state: Mutex<HashMap<String, CachedBotState>>,
    storage_keys: HashMap<String, String>,
}

impl TurnContext {
    /// Create a turn context with storage keys derived from the
    /// channel, conversation and user identities.
    pub fn new(channel_id: &str, conversation_id: &str, user_id: &str) -> Self {
        let mut storage_keys = HashMap::new();
        storage_keys.insert(
            "conversation".to_string(),
            format!("{}/conversations/{}", channel_id, conversation_id),
        );
        storage_keys.insert(
            "user".to_string(),
            format!("{}/users/{}", channel_id, user_id),
        );
        Self {
            turn: Document::default(),
            dialog: Document::default(),
            this_state: Document::default(),
            class: Value::Object(Default::default()),
            config: ConfigEntries::new(),
            memo: Mutex::new(HashMap::new()),
            bot_state: Mutex::new(HashMap::new()),
            storage_keys,
        }
    }

    /// Attach configuration entries for the settings scope.
    pub fn with_settings(mut self, config: ConfigEntries) -> Self {
        self.config = config;
        self
    }

    /// Attach the active dialog's declared properties (class scope).
    pub fn with_class(mut self, class: Value) -> Self {
        self.class = class;
        self
    }

    /// The turn-scope document.
    pub fn turn_document(&self) -> &Document {
        &self.turn
    }

    /// The dialog-scope document.
    pub fn dialog_document(&self) -> &Document {
        &self.dialog
    }

    /// The this-scope document (active dialog instance state).
    pub fn this_document(&self) -> &Document {
        &self.this_state
    }

    /// The read-only class document.
    pub fn class(&self) -> &Value {
        &self.class
    }

    /// The configuration entries backing the settings scope.
    pub fn config(&self) -> &ConfigEntries {
        &self.config
    }

    /// Fetch a turn-local memo cell, computing and caching it on first
    /// access. The settings scope uses this so the configuration
    /// flatten runs at most once per turn.
    pub fn memo(&self, key: &str, compute: impl FnOnce() -> Value) -> StateResult<Value> {
        let mut memo = self
            .memo
            .lock()
            .map_err(|_| StateError::invalid_operation("turn memo mutex poisoned"))?;
        if let Some(cached) = memo.get(key) {
            return Ok(cached.clone());
        }
        let value = compute();
        memo.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Names of the scopes persisted through external storage.
    pub fn persisted_scopes(&self) -> impl Iterator<Item = &str> {
        self.storage_keys.keys().map(String::as_str)
    }

    /// The storage key for a persisted scope, if it is one.
    pub fn storage_key(&self, scope: &str) -> Option<&str> {
        self.storage_keys.get(scope).map(String::as_str)
    }

    /// Snapshot a persisted scope's cached document. Scopes that were
    /// never hydrated read as an empty mapping.
    pub fn cached_state(&self, scope: &str) -> StateResult<Value> {
        let cache = self.lock_bot_state()?;
        Ok(cache
            .get(scope)
            .map(|c| c.value.clone())
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    /// Replace a persisted scope's cached document and mark it dirty.
    pub fn replace_cached_state(&self, scope: &str, value: Value) -> StateResult<()> {
        let mut cache = self.lock_bot_state()?;
        let entry = cache
            .entry(scope.to_string())
            .or_insert_with(CachedBotState::empty);
        entry.value = value;
        entry.dirty = true;
        Ok(())
    }

    /// Hydrate a persisted scope from storage. Clears the dirty flag.
    pub fn hydrate(&self, scope: &str, value: Value, etag: Option<String>) -> StateResult<()> {
        let mut cache = self.lock_bot_state()?;
        cache.insert(
            scope.to_string(),
            CachedBotState {
                value,
                etag,
                dirty: false,
            },
        );
        Ok(())
    }

    /// Collect the persisted scopes that changed this turn, with their
    /// storage keys and load-time e-tags.
    pub fn dirty_states(&self) -> StateResult<Vec<(String, String, Value, Option<String>)>> {
        let cache = self.lock_bot_state()?;
        let mut out = Vec::new();
        for (scope, state) in cache.iter() {
            if !state.dirty {
                continue;
            }
            if let Some(key) = self.storage_key(scope) {
                out.push((
                    scope.clone(),
                    key.to_string(),
                    state.value.clone(),
                    state.etag.clone(),
                ));
            }
        }
        Ok(out)
    }

    /// Record a successful save: store the new e-tag and clear dirty.
    pub fn mark_saved(&self, scope: &str, etag: String) -> StateResult<()> {
        let mut cache = self.lock_bot_state()?;
        if let Some(state) = cache.get_mut(scope) {
            state.etag = Some(etag);
            state.dirty = false;
        }
        Ok(())
    }

    fn lock_bot_state(
        &self,
    ) -> StateResult<std::sync::MutexGuard<'_, HashMap<String, CachedBotState>>> {
        self.bot_state
            .lock()
            .map_err(|_| StateError::invalid_operation("bot state cache mutex poisoned"))
    }
}

//! Built-in memory scopes.
//!
//! | name | backing | writable | in snapshot |
//! |---|---|---|---|
//! | `turn` | turn document, dies at end of turn | yes | yes |
//! | `dialog` | active dialog memory | yes | yes |
//! | `this` | active dialog instance state | yes | yes |
//! | `class` | active dialog's declared properties | no | no |
//! | `settings` | configuration flatten, memoized per turn | no | no |
//! | `user` | persistent storage, cached per turn | yes | yes |
//! | `conversation` | persistent storage, cached per turn | yes | yes |

use crate::error::{StateError, StateResult};
use crate::scope::MemoryScope;
use crate::settings::flatten_settings;
use crate::turn::TurnContext;
use serde_json::Value;
use std::sync::Arc;

/// Turn-lifetime scratch memory.
pub struct TurnScope;

impl MemoryScope for TurnScope {
    fn name(&self) -> &str {
        "turn"
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        turn.turn_document().snapshot()
    }

    fn set_memory(&self, turn: &TurnContext, memory: Value) -> StateResult<()> {
        turn.turn_document().replace(memory)
    }
}

/// Memory of the active dialog on the dialog stack.
pub struct DialogScope;

impl MemoryScope for DialogScope {
    fn name(&self) -> &str {
        "dialog"
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        turn.dialog_document().snapshot()
    }

    fn set_memory(&self, turn: &TurnContext, memory: Value) -> StateResult<()> {
        turn.dialog_document().replace(memory)
    }
}

/// Instance state of the active dialog.
pub struct ThisScope;

impl MemoryScope for ThisScope {
    fn name(&self) -> &str {
        "this"
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        turn.this_document().snapshot()
    }

    fn set_memory(&self, turn: &TurnContext, memory: Value) -> StateResult<()> {
        turn.this_document().replace(memory)
    }
}

/// Read-only view of the active dialog's declared properties.
pub struct ClassScope;

impl MemoryScope for ClassScope {
    fn name(&self) -> &str {
        "class"
    }

    fn include_in_snapshot(&self) -> bool {
        false
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        Ok(turn.class().clone())
    }

    fn set_memory(&self, _turn: &TurnContext, _memory: Value) -> StateResult<()> {
        Err(StateError::not_supported("class", "set_memory"))
    }
}

/// Read-only configuration view.
///
/// The configuration flatten is expensive, so the result is memoized in
/// turn-local storage under the scope's name: repeated reads within one
/// turn hit the cache.
pub struct SettingsScope;

impl MemoryScope for SettingsScope {
    fn name(&self) -> &str {
        "settings"
    }

    fn include_in_snapshot(&self) -> bool {
        false
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        turn.memo(self.name(), || flatten_settings(turn.config()))
    }

    fn set_memory(&self, _turn: &TurnContext, _memory: Value) -> StateResult<()> {
        Err(StateError::not_supported("settings", "set_memory"))
    }
}

/// A scope backed by external persistent storage, cached in the turn
/// context between `load_all` and `save_all`.
pub struct BotStateScope {
    name: &'static str,
}

impl BotStateScope {
    /// The user scope: persists across conversations for one user.
    pub fn user() -> Self {
        Self { name: "user" }
    }

    /// The conversation scope: persists across turns of one conversation.
    pub fn conversation() -> Self {
        Self {
            name: "conversation",
        }
    }
}

impl MemoryScope for BotStateScope {
    fn name(&self) -> &str {
        self.name
    }

    fn get_memory(&self, turn: &TurnContext) -> StateResult<Value> {
        turn.cached_state(self.name)
    }

    fn set_memory(&self, turn: &TurnContext, memory: Value) -> StateResult<()> {
        turn.replace_cached_state(self.name, memory)
    }
}

/// The standard scope set, in registration order.
pub fn standard_scopes() -> Vec<Arc<dyn MemoryScope>> {
    vec![
        Arc::new(TurnScope),
        Arc::new(DialogScope),
        Arc::new(ThisScope),
        Arc::new(ClassScope),
        Arc::new(SettingsScope),
        Arc::new(BotStateScope::user()),
        Arc::new(BotStateScope::conversation()),
    ]
}

//! Scoped dialog memory with path-expression access.
//!
//! This crate is the state core of the converse bot framework: it maps
//! path strings such as `user.name`, `$foo.bar[0]`, `#intent` and
//! `@entity` onto a layered memory model of named scopes with distinct
//! lifetimes (turn, dialog, conversation, user, settings, ...).
//!
//! # Overview
//!
//! - [`resolver`] rewrites shorthand prefixes to canonical paths.
//! - [`path`] parses canonical paths into segments.
//! - [`scope`] and [`scopes`] define the named memory scopes.
//! - [`settings`] flattens configuration entries into a memory tree.
//! - [`storage`] is the persistence collaborator for user and
//!   conversation state.
//! - [`DialogStateManager`] ties it all together.
//!
//! # Example
//!
//! ```
//! use converse_state::{DialogStateManager, TurnContext};
//! use std::sync::Arc;
//!
//! let turn = Arc::new(TurnContext::new("test", "conv-1", "user-1"));
//! let state = DialogStateManager::new(turn);
//!
//! state.set_value("user.name", "kia").unwrap();
//! state.set_value("$step", 2).unwrap();
//!
//! assert_eq!(state.get_value::<String>("user.name").unwrap().as_deref(), Some("kia"));
//! assert_eq!(state.get_value::<i64>("dialog.step").unwrap(), Some(2));
//! ```

#![warn(missing_docs)]

mod document;
mod error;
mod eval;
mod manager;
pub mod path;
pub mod resolver;
pub mod scope;
pub mod scopes;
pub mod settings;
pub mod storage;
mod turn;

pub use document::Document;
pub use error::{value_type_name, StateError, StateResult};
pub use manager::DialogStateManager;
pub use path::{parse_path, Path, Seg};
pub use resolver::{default_resolvers, PathResolver};
pub use scope::{MemoryScope, ScopeRegistry};
pub use settings::{flatten_settings, ConfigEntries};
pub use storage::{MemoryStorage, Storage, StorageError, StoreItem};
pub use turn::{CachedBotState, TurnContext};

//! Path resolvers: stateless rewrite rules for shorthand path prefixes.
//!
//! Resolvers run left-to-right in registration order before any scope
//! lookup. Each one acts only on paths that literally start with its
//! alias and passes everything else through unchanged.
//!
//! | shorthand | canonical |
//! |---|---|
//! | `$foo` | `dialog.foo` |
//! | `#foo` | `turn.recognized.intents.foo` |
//! | `@foo` | `turn.recognized.entities.foo.first()` |
//! | `@@foo` | `turn.recognized.entities.foo` |
//! | `%foo` | `class.foo` |

use crate::error::{StateError, StateResult};

/// A stateless shorthand-to-canonical path rewrite rule.
pub trait PathResolver: Send + Sync {
    /// Rewrite `path` if it starts with this resolver's alias.
    ///
    /// Fails with a path-required error when `path` is empty.
    fn transform_path(&self, path: &str) -> StateResult<String>;
}

/// Generic alias resolver: replaces a leading alias with a prefix and
/// appends a postfix, then trims any trailing dot.
pub struct AliasResolver {
    alias: &'static str,
    prefix: &'static str,
    postfix: &'static str,
}

impl AliasResolver {
    /// Create an alias resolver.
    pub const fn new(alias: &'static str, prefix: &'static str, postfix: &'static str) -> Self {
        Self {
            alias,
            prefix,
            postfix,
        }
    }
}

impl PathResolver for AliasResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        if path.is_empty() {
            return Err(StateError::path_required("path"));
        }
        match path.strip_prefix(self.alias) {
            Some(rest) => {
                let mut out = format!("{}{}{}", self.prefix, rest, self.postfix);
                while out.ends_with('.') {
                    out.pop();
                }
                Ok(out)
            }
            None => Ok(path.to_string()),
        }
    }
}

/// `$` — dialog scope shorthand.
pub struct DollarPathResolver(AliasResolver);

impl DollarPathResolver {
    /// Create the `$` resolver.
    pub const fn new() -> Self {
        Self(AliasResolver::new("$", "dialog.", ""))
    }
}

impl Default for DollarPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for DollarPathResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        self.0.transform_path(path)
    }
}

/// `#` — recognized-intent shorthand.
pub struct HashPathResolver(AliasResolver);

impl HashPathResolver {
    /// Create the `#` resolver.
    pub const fn new() -> Self {
        Self(AliasResolver::new("#", "turn.recognized.intents.", ""))
    }
}

impl Default for HashPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for HashPathResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        self.0.transform_path(path)
    }
}

/// `@@` — plural entity shorthand: the whole recognized-entity array.
pub struct AtAtPathResolver(AliasResolver);

impl AtAtPathResolver {
    /// Create the `@@` resolver.
    pub const fn new() -> Self {
        Self(AliasResolver::new("@@", "turn.recognized.entities.", ""))
    }
}

impl Default for AtAtPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for AtAtPathResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        self.0.transform_path(path)
    }
}

/// `@` — singular entity shorthand: first element of the recognized-entity
/// array. The `first()` accessor is inserted after the entity name so a
/// trailing property path keeps working: `@foo.bar` becomes
/// `turn.recognized.entities.foo.first().bar`.
pub struct AtPathResolver;

impl AtPathResolver {
    /// Create the `@` resolver.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AtPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for AtPathResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        if path.is_empty() {
            return Err(StateError::path_required("path"));
        }
        // Leave `@@` for the plural resolver.
        if path.starts_with("@@") || !path.starts_with('@') {
            return Ok(path.to_string());
        }

        let rest = &path[1..];
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        let (entity, tail) = rest.split_at(end);
        if entity.is_empty() {
            return Ok(format!("turn.recognized.entities.first(){}", tail));
        }
        Ok(format!(
            "turn.recognized.entities.{}.first(){}",
            entity, tail
        ))
    }
}

/// `%` — class scope shorthand (the active dialog's declared properties).
pub struct PercentPathResolver(AliasResolver);

impl PercentPathResolver {
    /// Create the `%` resolver.
    pub const fn new() -> Self {
        Self(AliasResolver::new("%", "class.", ""))
    }
}

impl Default for PercentPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver for PercentPathResolver {
    fn transform_path(&self, path: &str) -> StateResult<String> {
        self.0.transform_path(path)
    }
}

/// The standard resolver set, in application order.
///
/// `@@` must run before `@` so plural entity paths are not rewritten as
/// singular accessors.
pub fn default_resolvers() -> Vec<Box<dyn PathResolver>> {
    vec![
        Box::new(DollarPathResolver::new()),
        Box::new(HashPathResolver::new()),
        Box::new(AtAtPathResolver::new()),
        Box::new(AtPathResolver::new()),
        Box::new(PercentPathResolver::new()),
    ]
}

//! Parsed path representation for scoped memory access.
//!
//! A path string such as `user.profile.names[0]` or
//! `conversation.members['Jo.Bob'].role` is parsed into a sequence of
//! segments. The first segment names a memory scope; the remainder is
//! walked against that scope's backing node.

use crate::error::{StateError, StateResult};
use std::fmt;

/// A single segment of a parsed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seg {
    /// Mapping key access, from a dotted identifier or a bracketed
    /// quoted string. Matched case-insensitively during evaluation.
    Key(String),
    /// Positional array access: `[0]`.
    Index(usize),
    /// Bracketed sub-path expression: `[turn.index]`. The inner path is
    /// evaluated against live memory and the result is used as a key
    /// or index.
    Expr(String),
    /// The `first()` accessor: first element of an array node.
    First,
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) if k.contains('.') || k.contains('[') => write!(f, "['{}']", k),
            Seg::Key(k) => write!(f, ".{}", k),
            Seg::Index(i) => write!(f, "[{}]", i),
            Seg::Expr(e) => write!(f, "[{}]", e),
            Seg::First => write!(f, ".first()"),
        }
    }
}

/// A parsed path: an ordered sequence of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path.
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path has no segments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Split into the leading scope name and the remaining segments.
    ///
    /// The first segment of every canonical path must be a bare key
    /// naming a registered scope.
    pub fn scope_split(&self) -> StateResult<(&str, &[Seg])> {
        match self.0.split_first() {
            Some((Seg::Key(name), rest)) => Ok((name, rest)),
            Some(_) => Err(StateError::invalid_path(
                self.to_string(),
                "path must begin with a scope name",
            )),
            None => Err(StateError::path_required("path")),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                // No leading dot on the first dotted segment.
                Seg::Key(k) if i == 0 && !k.contains('.') && !k.contains('[') => {
                    write!(f, "{}", k)?
                }
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

/// Parse a canonical path string into a [`Path`].
///
/// Grammar (informal): `path := segment (('.' segment) | bracket)*` where
/// `segment` is an identifier or `first()`, and `bracket` holds a
/// non-negative integer, a quoted string, or a sub-path expression.
///
/// Empty segments produced by doubled or trailing dots are skipped.
pub fn parse_path(path: &str) -> StateResult<Path> {
    if path.is_empty() {
        return Err(StateError::path_required("path"));
    }

    let mut segs = Vec::new();
    let mut ident = String::new();
    let chars: Vec<char> = path.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                flush_ident(path, &mut ident, &mut segs)?;
                i += 1;
            }
            '[' => {
                flush_ident(path, &mut ident, &mut segs)?;
                let (inner, next) = scan_bracket(path, &chars, i + 1)?;
                segs.push(classify_bracket(path, &inner)?);
                i = next;
            }
            c => {
                ident.push(c);
                i += 1;
            }
        }
    }
    flush_ident(path, &mut ident, &mut segs)?;

    if segs.is_empty() {
        return Err(StateError::path_required("path"));
    }
    Ok(Path(segs))
}

/// Turn the accumulated identifier into a segment, if non-empty.
fn flush_ident(path: &str, ident: &mut String, segs: &mut Vec<Seg>) -> StateResult<()> {
    if ident.is_empty() {
        return Ok(());
    }
    let text = std::mem::take(ident);
    if let Some(name) = text.strip_suffix("()") {
        if name.eq_ignore_ascii_case("first") {
            segs.push(Seg::First);
            return Ok(());
        }
        return Err(StateError::invalid_path(
            path,
            format!("unknown function '{}()'", name),
        ));
    }
    segs.push(Seg::Key(text));
    Ok(())
}

/// Scan from just after `[` to the matching `]`, honoring nested
/// brackets and quoted strings. Returns the inner text and the index
/// just past the closing bracket.
fn scan_bracket(path: &str, chars: &[char], start: usize) -> StateResult<(String, usize)> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut inner = String::new();
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                inner.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    inner.push(c);
                }
                '[' => {
                    depth += 1;
                    inner.push(c);
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((inner, i + 1));
                    }
                    inner.push(c);
                }
                _ => inner.push(c),
            },
        }
        i += 1;
    }
    Err(StateError::invalid_path(path, "unbalanced '[' in path"))
}

/// Classify bracket contents as an index, a quoted key, or a sub-path
/// expression to evaluate later.
fn classify_bracket(path: &str, inner: &str) -> StateResult<Seg> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Err(StateError::invalid_path(path, "empty '[]' in path"));
    }

    if let Some(q) = trimmed.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let body = &trimmed[1..];
        return match body.strip_suffix(q) {
            Some(key) if !key.contains(q) => Ok(Seg::Key(key.to_string())),
            _ => Err(StateError::invalid_path(path, "unterminated quoted key")),
        };
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let idx: usize = trimmed
            .parse()
            .map_err(|_| StateError::invalid_path(path, "index out of range"))?;
        return Ok(Seg::Index(idx));
    }

    Ok(Seg::Expr(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let p = parse_path("user.profile.name").unwrap();
        assert_eq!(
            p.segments(),
            &[Seg::key("user"), Seg::key("profile"), Seg::key("name")]
        );
    }

    #[test]
    fn test_parse_numeric_index() {
        let p = parse_path("dialog.items[2]").unwrap();
        assert_eq!(
            p.segments(),
            &[Seg::key("dialog"), Seg::key("items"), Seg::index(2)]
        );
    }

    #[test]
    fn test_parse_quoted_key_with_dot() {
        let p = parse_path("conversation.members['Jo.Bob']").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Seg::key("conversation"),
                Seg::key("members"),
                Seg::key("Jo.Bob")
            ]
        );
    }

    #[test]
    fn test_parse_double_quoted_key() {
        let p = parse_path("user.friends[\"susan\"]").unwrap();
        assert_eq!(p.segments()[2], Seg::key("susan"));
    }

    #[test]
    fn test_parse_expression_bracket() {
        let p = parse_path("user.names[turn.index]").unwrap();
        assert_eq!(p.segments()[2], Seg::Expr("turn.index".into()));
    }

    #[test]
    fn test_parse_nested_expression_bracket() {
        let p = parse_path("user.names[turn.picks[0]]").unwrap();
        assert_eq!(p.segments()[2], Seg::Expr("turn.picks[0]".into()));
    }

    #[test]
    fn test_parse_first_accessor() {
        let p = parse_path("turn.recognized.entities.test.first()").unwrap();
        assert_eq!(p.segments().last(), Some(&Seg::First));
    }

    #[test]
    fn test_parse_unknown_function_rejected() {
        let err = parse_path("turn.foo.last()").unwrap_err();
        assert!(matches!(err, StateError::InvalidPath { .. }));
    }

    #[test]
    fn test_parse_empty_path_rejected() {
        let err = parse_path("").unwrap_err();
        assert!(matches!(err, StateError::PathRequired { .. }));
    }

    #[test]
    fn test_parse_unbalanced_bracket_rejected() {
        let err = parse_path("user.items[0").unwrap_err();
        assert!(matches!(err, StateError::InvalidPath { .. }));
    }

    #[test]
    fn test_parse_skips_doubled_dots() {
        let p = parse_path("user..name.").unwrap();
        assert_eq!(p.segments(), &[Seg::key("user"), Seg::key("name")]);
    }

    #[test]
    fn test_scope_split() {
        let p = parse_path("user.name").unwrap();
        let (scope, rest) = p.scope_split().unwrap();
        assert_eq!(scope, "user");
        assert_eq!(rest, &[Seg::key("name")]);
    }

    #[test]
    fn test_scope_split_bare_scope() {
        let p = parse_path("turn").unwrap();
        let (scope, rest) = p.scope_split().unwrap();
        assert_eq!(scope, "turn");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        let p = parse_path("dialog.foo.bar[0]").unwrap();
        assert_eq!(p.to_string(), "dialog.foo.bar[0]");
    }

    #[test]
    fn test_display_quotes_dotted_key() {
        let p = parse_path("user.m['a.b']").unwrap();
        assert_eq!(p.to_string(), "user.m['a.b']");
    }
}

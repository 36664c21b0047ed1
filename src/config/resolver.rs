//! Delayed substitution of `%{...}` references.
//!
//! Values are expanded lazily and recursively: a reference to another key
//! resolves that key first (memoizing the result in the registry), and a
//! conditional block collapses to the branch selected by the truthiness of
//! the referenced value. The surviving branch is scanned again, so nested
//! blocks and references inside it are expanded as well.

use super::scan::{self, DirectiveKind, INDIRECT};
use super::types::IndirectPrefixes;
use crate::error::{ResolveError, ResolveResult};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::debug;

/// Values considered true, compared case-insensitively.
pub const TRUE_WORDS: [&str; 5] = ["true", "1", "yes", "y", "on"];

/// Truthiness predicate shared by conditionals and boolean accessors.
pub fn is_truthy(value: &str) -> bool {
    TRUE_WORDS.iter().any(|w| value.eq_ignore_ascii_case(w))
}

/// Collapse `%%{` to `%{` in every value. Run once after all keys resolved.
pub fn unescape_all(values: &mut HashMap<String, String>) {
    for value in values.values_mut() {
        if value.contains(scan::ESCAPED_OPEN) {
            *value = scan::unescape(value);
        }
    }
}

/// Recursive resolver over a working registry.
///
/// A key is expanded only while it is in the pending set; once expanded
/// its registry value is replaced and it leaves the set.
pub struct Resolver<'a> {
    values: &'a mut HashMap<String, String>,
    pending: &'a mut HashSet<String>,
    prefixes: &'a IndirectPrefixes,
    /// Raw values of keys committed during the current top-level call.
    journal: Vec<(String, String)>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        values: &'a mut HashMap<String, String>,
        pending: &'a mut HashSet<String>,
        prefixes: &'a IndirectPrefixes,
    ) -> Self {
        Self {
            values,
            pending,
            prefixes,
            journal: Vec::new(),
        }
    }

    /// Fully expand `key`.
    ///
    /// On failure every key expanded during this call is restored, so the
    /// registry and pending set look as if the call never happened.
    pub fn resolve(&mut self, key: &str) -> ResolveResult<String> {
        self.journal.clear();
        let mut visited = vec![key.to_string()];
        let result = self.resolve_key(key, &mut visited);
        if result.is_err() {
            for (committed, raw) in self.journal.drain(..).rev() {
                self.pending.insert(committed.clone());
                self.values.insert(committed, raw);
            }
        }
        result
    }

    /// Resolve every key in order, stopping at the first failure.
    pub fn resolve_all<I, S>(&mut self, keys: I) -> ResolveResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.resolve(key.as_ref())?;
        }
        Ok(())
    }

    fn resolve_key(&mut self, key: &str, visited: &mut Vec<String>) -> ResolveResult<String> {
        let raw = self.values.get(key).cloned().unwrap_or_default();
        if !self.pending.contains(key) {
            return Ok(raw);
        }
        let expanded = self.expand(key, &raw, visited)?;
        debug!(key, value = %expanded, "resolved delayed references");
        self.values.insert(key.to_string(), expanded.clone());
        self.pending.remove(key);
        self.journal.push((key.to_string(), raw));
        Ok(expanded)
    }

    /// Resolve the key named by a directive inside `key`'s value.
    fn reference(
        &mut self,
        key: &str,
        name: &str,
        visited: &mut Vec<String>,
    ) -> ResolveResult<String> {
        let target = match name.strip_prefix(INDIRECT) {
            Some(suffix) => self.prefixes.lookup_key(suffix),
            None => name.to_string(),
        };
        if visited.contains(&target) {
            let mut chain = visited.clone();
            chain.push(target);
            return Err(ResolveError::self_reference(key, &chain));
        }
        visited.push(target.clone());
        let result = self.resolve_key(&target, visited);
        visited.pop();
        result
    }

    /// Expand `raw` in place, scanning on from a cursor.
    ///
    /// Substituted text is skipped but stays part of the buffer, so a `%`
    /// at its end escapes a directive directly after it. A collapsed block
    /// is scanned again from where it started.
    fn expand(&mut self, key: &str, raw: &str, visited: &mut Vec<String>) -> ResolveResult<String> {
        let mut value = raw.to_string();
        let mut pos = 0;
        while let Some(directive) = scan::find_next(&value, pos) {
            let (start, end) = (directive.start, directive.end());
            match directive.kind {
                DirectiveKind::End => return Err(ResolveError::unmatched_end(key)),
                DirectiveKind::Else => return Err(ResolveError::unmatched_else(key)),
                DirectiveKind::Variable => {
                    let name = directive.name.to_string();
                    let text = self.reference(key, &name, visited)?;
                    value.replace_range(start..end, &text);
                    pos = start + text.len();
                }
                kind @ (DirectiveKind::If | DirectiveKind::Notif) => {
                    let name = directive.name.to_string();
                    let text = self.reference(key, &name, visited)?;
                    let taken = is_truthy(&text) == (kind == DirectiveKind::If);
                    let block = Block::find(key, &value, end)?;
                    let kept = value[block.kept(taken, end)].to_string();
                    value.replace_range(start..block.end.end, &kept);
                    pos = start;
                }
            }
        }
        Ok(value)
    }
}

/// Positions of the depth-zero `%{else}` and `%{}` closing a block.
#[derive(Debug)]
struct Block {
    else_tag: Option<Range<usize>>,
    end: Range<usize>,
}

impl Block {
    /// Scan from `body_start` for the tags closing the block opened just before.
    fn find(key: &str, text: &str, body_start: usize) -> ResolveResult<Self> {
        let mut depth = 0usize;
        let mut else_tag: Option<Range<usize>> = None;
        let mut pos = body_start;
        while let Some(d) = scan::find_next(text, pos) {
            pos = d.end();
            match d.kind {
                DirectiveKind::If | DirectiveKind::Notif => depth += 1,
                DirectiveKind::End if depth > 0 => depth -= 1,
                DirectiveKind::End => {
                    return Ok(Self {
                        else_tag,
                        end: d.start..d.end(),
                    });
                }
                DirectiveKind::Else if depth > 0 => {}
                DirectiveKind::Else if else_tag.is_some() => {
                    return Err(ResolveError::double_else(key));
                }
                DirectiveKind::Else => else_tag = Some(d.start..d.end()),
                DirectiveKind::Variable => {}
            }
        }
        Err(ResolveError::unterminated_if(key))
    }

    /// Range of the branch that survives.
    fn kept(&self, taken: bool, body_start: usize) -> Range<usize> {
        match (taken, &self.else_tag) {
            (true, Some(else_tag)) => body_start..else_tag.start,
            (true, None) => body_start..self.end.start,
            (false, Some(else_tag)) => else_tag.end..self.end.start,
            (false, None) => self.end.start..self.end.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveErrorKind;

    struct Fixture {
        values: HashMap<String, String>,
        pending: HashSet<String>,
        prefixes: IndirectPrefixes,
    }

    impl Fixture {
        fn new(pairs: &[(&str, &str)]) -> Self {
            let values: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let pending = values
                .iter()
                .filter(|(_, v)| scan::has_reference(v))
                .map(|(k, _)| k.clone())
                .collect();
            Self {
                values,
                pending,
                prefixes: IndirectPrefixes::new(["P_", "Q_"], "P_"),
            }
        }

        fn resolve(&mut self, key: &str) -> ResolveResult<String> {
            Resolver::new(&mut self.values, &mut self.pending, &self.prefixes).resolve(key)
        }
    }

    fn resolve_with(pairs: &[(&str, &str)], key: &str) -> ResolveResult<String> {
        Fixture::new(pairs).resolve(key)
    }

    fn kind(result: ResolveResult<String>) -> ResolveErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_truthiness() {
        for word in ["true", "TRUE", "1", "yes", "Y", "On"] {
            assert!(is_truthy(word), "{word}");
        }
        for word in ["", "false", "0", "no", "off", " true", "yes ", "2", "t"] {
            assert!(!is_truthy(word), "{word:?}");
        }
    }

    #[test]
    fn test_variable_substitution() {
        let r = resolve_with(&[("A", "x%{FOO}y"), ("FOO", "bar")], "A");
        assert_eq!(r.unwrap(), "xbary");
    }

    #[test]
    fn test_chained_substitution_memoizes() {
        let mut f = Fixture::new(&[("A", "%{B}%{B}"), ("B", "<%{C}>"), ("C", "c")]);
        assert_eq!(f.resolve("A").unwrap(), "<c><c>");
        assert_eq!(f.values["B"], "<c>");
        assert!(f.pending.is_empty());
    }

    #[test]
    fn test_indirect_uses_active_prefix() {
        let r = resolve_with(&[("A", "%{*X}"), ("P_X", "p"), ("Q_X", "q")], "A");
        assert_eq!(r.unwrap(), "p");
    }

    #[test]
    fn test_if_block() {
        let value = "%{?FLAG}yes-branch%{}";
        assert_eq!(resolve_with(&[("A", value), ("FLAG", "true")], "A").unwrap(), "yes-branch");
        assert_eq!(resolve_with(&[("A", value), ("FLAG", "false")], "A").unwrap(), "");
        assert_eq!(resolve_with(&[("A", value), ("FLAG", "")], "A").unwrap(), "");
        assert_eq!(resolve_with(&[("A", value)], "A").unwrap(), "");
    }

    #[test]
    fn test_if_else_block() {
        let value = "<%{?FLAG}A%{else}B%{}>";
        assert_eq!(resolve_with(&[("V", value), ("FLAG", "yes")], "V").unwrap(), "<A>");
        assert_eq!(resolve_with(&[("V", value), ("FLAG", "no")], "V").unwrap(), "<B>");
    }

    #[test]
    fn test_notif_else_block() {
        let value = "%{!FLAG}A%{ELSE}B%{}";
        assert_eq!(resolve_with(&[("V", value), ("FLAG", "on")], "V").unwrap(), "B");
        assert_eq!(resolve_with(&[("V", value), ("FLAG", "off")], "V").unwrap(), "A");
    }

    #[test]
    fn test_nested_blocks() {
        let value = "%{?OUTER}%{?INNER}AB%{}%{}";
        for (outer, inner, expected) in [
            ("1", "1", "AB"),
            ("1", "0", ""),
            ("0", "1", ""),
            ("0", "0", ""),
        ] {
            let r = resolve_with(&[("V", value), ("OUTER", outer), ("INNER", inner)], "V");
            assert_eq!(r.unwrap(), expected, "OUTER={outer} INNER={inner}");
        }
    }

    #[test]
    fn test_nested_else_belongs_to_inner_block() {
        let value = "%{?OUTER}[%{?INNER}i%{else}n%{}]%{else}-%{}";
        let r = resolve_with(&[("V", value), ("OUTER", "0"), ("INNER", "1")], "V");
        assert_eq!(r.unwrap(), "-");
        let r = resolve_with(&[("V", value), ("OUTER", "1"), ("INNER", "0")], "V");
        assert_eq!(r.unwrap(), "[n]");
    }

    #[test]
    fn test_condition_and_text_references() {
        let value = "%{?Q}%{NAME}%{else}none%{} end";
        let r = resolve_with(&[("V", value), ("Q", "%{R}"), ("R", "y"), ("NAME", "n")], "V");
        assert_eq!(r.unwrap(), "n end");
    }

    #[test]
    fn test_dropped_branch_is_not_resolved() {
        // the dropped branch would be a self-reference
        let value = "%{?F}%{SELF}%{else}ok%{}";
        let r = resolve_with(&[("SELF", value), ("F", "no")], "SELF");
        assert_eq!(r.unwrap(), "ok");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(kind(resolve_with(&[("V", "%{A}%{}"), ("A", "")], "V")), ResolveErrorKind::UnmatchedEnd);
        assert_eq!(kind(resolve_with(&[("V", "%{A}%{else}"), ("A", "")], "V")), ResolveErrorKind::UnmatchedElse);
        assert_eq!(
            kind(resolve_with(&[("V", "%{?A}x%{else}y%{else}z%{}")], "V")),
            ResolveErrorKind::DoubleElse
        );
        assert_eq!(kind(resolve_with(&[("V", "%{?A}x%{?B}y%{}")], "V")), ResolveErrorKind::UnterminatedIf);
        assert_eq!(kind(resolve_with(&[("V", "a%{V}")], "V")), ResolveErrorKind::SelfReference);
    }

    #[test]
    fn test_end_inside_kept_branch_is_checked() {
        // the surviving branch is rescanned, so a stray terminator there fails
        let r = resolve_with(&[("V", "%{!A}%{B}%{else}x%{}%{}"), ("B", "")], "V");
        assert_eq!(kind(r), ResolveErrorKind::UnmatchedEnd);
    }

    #[test]
    fn test_cycle_reports_chain_and_rolls_back() {
        let mut f = Fixture::new(&[("A", "a%{C}%{B}"), ("B", "b%{A}"), ("C", "c%{D}"), ("D", "d")]);
        let err = f.resolve("A").unwrap_err();
        assert_eq!(err.kind, ResolveErrorKind::SelfReference);
        assert_eq!(err.key, "B");
        assert_eq!(err.chain, vec!["A", "B", "A"]);
        // C and D were expanded on the way but must be restored
        assert_eq!(f.values["C"], "c%{D}");
        assert_eq!(f.values["A"], "a%{C}%{B}");
        assert!(f.pending.contains("C"));
        assert!(f.pending.contains("A"));
        assert!(f.pending.contains("B"));
    }

    #[test]
    fn test_not_pending_is_untouched() {
        let mut f = Fixture::new(&[("A", "%{}"), ("B", "plain")]);
        assert_eq!(f.resolve("A").unwrap(), "%{}");
        assert_eq!(f.resolve("B").unwrap(), "plain");
        assert_eq!(f.resolve("MISSING").unwrap(), "");
        assert!(!f.values.contains_key("MISSING"));
    }

    #[test]
    fn test_resolving_twice_is_noop() {
        let mut f = Fixture::new(&[("A", "%{B}!"), ("B", "b")]);
        let first = f.resolve("A").unwrap();
        let snapshot = f.values.clone();
        assert_eq!(f.resolve("A").unwrap(), first);
        assert_eq!(f.values, snapshot);
    }

    #[test]
    fn test_escaped_marker_survives_until_unescape() {
        let mut f = Fixture::new(&[("A", "%{B}%%{?X}lit"), ("B", "b"), ("C", "%%{C}")]);
        assert_eq!(f.resolve("A").unwrap(), "b%%{?X}lit");
        assert_eq!(f.resolve("C").unwrap(), "%%{C}");
        unescape_all(&mut f.values);
        assert_eq!(f.values["A"], "b%{?X}lit");
        assert_eq!(f.values["C"], "%{C}");
    }

    #[test]
    fn test_substituted_percent_escapes_following_marker() {
        let mut f = Fixture::new(&[("A", "5%"), ("B", "b"), ("V", "%{A}%{B}")]);
        assert_eq!(f.resolve("V").unwrap(), "5%%{B}");
        unescape_all(&mut f.values);
        assert_eq!(f.values["V"], "5%{B}");
    }

    #[test]
    fn test_substituted_percent_escapes_following_block() {
        let r = resolve_with(&[("A", "5%"), ("F", "yes"), ("V", "%{A}%{?F}x%{}")], "V");
        assert_eq!(kind(r), ResolveErrorKind::UnmatchedEnd);
    }

    #[test]
    fn test_empty_value() {
        assert_eq!(resolve_with(&[("A", "")], "A").unwrap(), "");
    }

    #[test]
    fn test_resolve_all_stops_at_first_error() {
        let mut f = Fixture::new(&[("A", "%{B}"), ("B", "ok"), ("C", "%{C}")]);
        let err = {
            let mut resolver = Resolver::new(&mut f.values, &mut f.pending, &f.prefixes);
            resolver.resolve_all(["A", "C"]).unwrap_err()
        };
        assert_eq!(err.key, "C");
        assert_eq!(f.values["A"], "ok");
    }
}

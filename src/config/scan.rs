//! Directive scanner for delayed references.
//!
//! Recognised forms, all opened by `%{` and closed by `}`:
//!
//! | Text            | Kind       |
//! |-----------------|------------|
//! | `%{NAME}`       | `Variable` |
//! | `%{?NAME}`      | `If`       |
//! | `%{!NAME}`      | `Notif`    |
//! | `%{else}`       | `Else`     |
//! | `%{}`           | `End`      |
//!
//! `%%{` is an escaped literal and never starts a directive.

/// Opening marker of a directive.
pub const OPEN: &str = "%{";

/// Escaped form of [`OPEN`]; collapsed to `%{` once resolution is done.
pub const ESCAPED_OPEN: &str = "%%{";

/// Marker for indirect references (`%{*SUFFIX}`).
pub const INDIRECT: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Variable,
    If,
    Notif,
    Else,
    End,
}

impl DirectiveKind {
    /// Whether the directive names another key.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            DirectiveKind::Variable | DirectiveKind::If | DirectiveKind::Notif
        )
    }
}

/// A directive found in a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    pub kind: DirectiveKind,
    /// Byte offset of the `%`.
    pub start: usize,
    /// Total length including markers.
    pub len: usize,
    /// Referenced name, possibly starting with `*`. Empty for `End`.
    pub name: &'a str,
}

impl<'a> Directive<'a> {
    /// Byte offset just past the closing `}`.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The suffix of an indirect reference, without the `*`.
    pub fn indirect_suffix(&self) -> Option<&'a str> {
        self.name.strip_prefix(INDIRECT)
    }
}

/// Find the next directive in `text` at or after byte offset `from`.
pub fn find_next(text: &str, from: usize) -> Option<Directive<'_>> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(found) = text.get(pos..).and_then(|rest| rest.find(OPEN)) {
        let start = pos + found;
        pos = start + OPEN.len();
        if start > 0 && bytes[start - 1] == b'%' {
            continue;
        }
        if let Some(directive) = classify(text, start) {
            return Some(directive);
        }
    }
    None
}

fn classify(text: &str, start: usize) -> Option<Directive<'_>> {
    let bytes = text.as_bytes();
    let mut i = start + OPEN.len();
    let kind = match bytes.get(i)? {
        b'}' => {
            return Some(Directive {
                kind: DirectiveKind::End,
                start,
                len: OPEN.len() + 1,
                name: "",
            });
        }
        b'?' => {
            i += 1;
            DirectiveKind::If
        }
        b'!' => {
            i += 1;
            DirectiveKind::Notif
        }
        _ => DirectiveKind::Variable,
    };

    let name_start = i;
    match bytes.get(i) {
        Some(&c) if c == b'*' || c == b'_' || c.is_ascii_alphabetic() => i += 1,
        _ => return None,
    }
    while bytes
        .get(i)
        .is_some_and(|&c| c == b'_' || c.is_ascii_alphanumeric())
    {
        i += 1;
    }
    if bytes.get(i) != Some(&b'}') {
        return None;
    }

    let name = &text[name_start..i];
    let kind = if kind == DirectiveKind::Variable && name.eq_ignore_ascii_case("else") {
        DirectiveKind::Else
    } else {
        kind
    };
    Some(Directive {
        kind,
        start,
        len: i + 1 - start,
        name,
    })
}

/// Iterate over every directive in `text`, left to right.
pub fn directives(text: &str) -> impl Iterator<Item = Directive<'_>> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let directive = find_next(text, pos)?;
        pos = directive.end();
        Some(directive)
    })
}

/// Whether `text` contains a directive that refers to another key.
pub fn has_reference(text: &str) -> bool {
    directives(text).any(|d| d.kind.is_reference())
}

/// Collapse every `%%{` into a literal `%{`.
pub fn unescape(text: &str) -> String {
    text.replace(ESCAPED_OPEN, OPEN)
}

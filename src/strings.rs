//! Small string helpers used by the rc reader and the option accessors.

use std::collections::BTreeSet;
use tracing::warn;

/// Whitespace set used as the default split delimiters.
pub const SPACES: &str = " \t\r\n";

/// Split `s` at any character of `delims`.
///
/// With `handle_escape`, a delimiter preceded by an odd number of
/// backslashes does not split, and backslashes escaping a delimiter or a
/// backslash are removed from the pieces.
pub fn split_string(s: &str, delims: &str, handle_escape: bool, ignore_empty: bool) -> Vec<String> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut last = 0;
    for (pos, c) in s.char_indices() {
        if !delims.contains(c) {
            continue;
        }
        if handle_escape {
            let backslashes = bytes[..pos].iter().rev().take_while(|&&b| b == b'\\').count();
            if backslashes % 2 == 1 {
                continue;
            }
        }
        push_piece(&mut out, &s[last..pos], delims, handle_escape, ignore_empty);
        last = pos + c.len_utf8();
    }
    push_piece(&mut out, &s[last..], delims, handle_escape, ignore_empty);
    out
}

fn push_piece(out: &mut Vec<String>, piece: &str, delims: &str, handle_escape: bool, ignore_empty: bool) {
    let piece = if handle_escape {
        erase_escapes(piece, delims)
    } else {
        piece.to_string()
    };
    if !piece.is_empty() || !ignore_empty {
        out.push(piece);
    }
}

fn erase_escapes(s: &str, delims: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            // trailing backslash is dropped
            None => {}
            Some(&next) if next == '\\' || delims.contains(next) => {
                out.push(next);
                chars.next();
            }
            Some(_) => out.push(c),
        }
    }
    out
}

/// Split on whitespace, dropping empty pieces.
pub fn split_words(s: &str) -> Vec<String> {
    split_string(s, SPACES, false, true)
}

/// Join `items` with `glue`.
pub fn join<I, S>(items: I, glue: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for item in items {
        if !out.is_empty() {
            out.push_str(glue);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Strip any characters of `charset` from both ends.
pub fn trim<'a>(s: &'a str, charset: &str) -> &'a str {
    s.trim_matches(|c| charset.contains(c))
}

/// ASCII case-insensitive equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Apply `+flag`/`-flag` tokens to `set`.
///
/// `-*` clears the set and `-~*` drops every `~`-prefixed entry. A `-x`
/// that removes nothing is kept as a literal `-x` entry and makes the
/// function return `true`, unless `x` is listed in `warn_ignore`. A
/// leading `+` is accepted but warned about.
pub fn resolve_plus_minus<S: AsRef<str>>(
    set: &mut BTreeSet<String>,
    tokens: &[S],
    warn_ignore: Option<&BTreeSet<String>>,
) -> bool {
    let mut unmatched_minus = false;
    for token in tokens {
        let token = token.as_ref();
        if token.is_empty() {
            continue;
        }
        if let Some(flag) = token.strip_prefix('+') {
            warn!(token, "flags should not start with a '+'");
            set.insert(flag.to_string());
            continue;
        }
        if let Some(flag) = token.strip_prefix('-') {
            if flag == "*" {
                set.clear();
                continue;
            }
            if flag == "~*" {
                set.retain(|s| !(s.len() >= 2 && s.starts_with('~')));
            }
            if set.remove(flag) {
                continue;
            }
            if !warn_ignore.is_some_and(|ignore| ignore.contains(flag)) {
                unmatched_minus = true;
            }
        }
        set.insert(token.to_string());
    }
    unmatched_minus
}

//! rc file reading.
//!
//! rc files are shell-like assignment lists:
//!
//! ```text
//! # comment
//! FORCE_COLORS=true
//! FORMAT='%{FORMAT_NAME} <installedversions>'
//! CACHE="${EPREFIX}/var/cache/eix"
//! source /etc/eixrc.d/local
//! ```
//!
//! `$NAME` and `${NAME}` are substituted immediately from the values read
//! so far; `%{...}` directives are left alone for delayed substitution.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Nested `source` depth after which inclusion stops.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Which layer an rc file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcSource {
    /// System-wide rc file
    System,
    /// Per-user rc file
    User,
    /// File pulled in via `source`
    Included,
}

impl fmt::Display for RcSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RcSource::System => write!(f, "system"),
            RcSource::User => write!(f, "user"),
            RcSource::Included => write!(f, "included"),
        }
    }
}

/// Produces raw key/value pairs from a file into the working map.
pub trait SourceLoader {
    /// Load `path` into `map`, later assignments overriding earlier ones.
    ///
    /// Returns `Ok(false)` if the file does not exist.
    fn load(
        &self,
        path: &Path,
        source: RcSource,
        map: &mut HashMap<String, String>,
    ) -> Result<bool, ConfigError>;
}

/// Reader for shell-like rc files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RcFileReader;

impl SourceLoader for RcFileReader {
    fn load(
        &self,
        path: &Path,
        source: RcSource,
        map: &mut HashMap<String, String>,
    ) -> Result<bool, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), %source, "rc file not present");
                return Ok(false);
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        debug!(path = %path.display(), %source, "reading rc file");
        let mut stack = vec![path.to_path_buf()];
        parse_into(&content, path, map, &mut stack);
        Ok(true)
    }
}

/// Parse rc text into `map` without touching the filesystem except for
/// `source` lines, which are resolved relative to `origin`.
pub fn parse_str(content: &str, origin: &Path, map: &mut HashMap<String, String>) {
    let mut stack = vec![origin.to_path_buf()];
    parse_into(content, origin, map, &mut stack);
}

fn parse_into(
    content: &str,
    origin: &Path,
    map: &mut HashMap<String, String>,
    stack: &mut Vec<PathBuf>,
) {
    let mut parser = Parser::new(content, origin);
    while let Some(statement) = parser.next_statement(map) {
        match statement {
            Statement::Assign(key, value) => {
                map.insert(key, value);
            }
            Statement::Source(target) => include(&target, origin, map, stack),
        }
    }
}

fn include(
    target: &str,
    origin: &Path,
    map: &mut HashMap<String, String>,
    stack: &mut Vec<PathBuf>,
) {
    let mut path = PathBuf::from(target);
    if path.is_relative()
        && let Some(dir) = origin.parent()
    {
        path = dir.join(path);
    }
    if stack.len() >= MAX_INCLUDE_DEPTH || stack.contains(&path) {
        warn!(path = %path.display(), "not sourcing rc file again: include loop or depth exceeded");
        return;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            debug!(path = %path.display(), source = %RcSource::Included, "reading rc file");
            stack.push(path.clone());
            parse_into(&content, &path, map, stack);
            stack.pop();
        }
        Err(e) => warn!(path = %path.display(), error = %e, "cannot source rc file"),
    }
}

enum Statement {
    Assign(String, String),
    Source(String),
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    origin: &'a Path,
}

impl<'a> Parser<'a> {
    fn new(content: &str, origin: &'a Path) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
            origin,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_blanks(&mut self) {
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.pos += 1;
        }
    }

    /// Finish a statement: only blanks and a comment may follow.
    fn end_statement(&mut self) {
        self.skip_blanks();
        match self.peek() {
            None | Some('\n') | Some('#') => {}
            Some(_) => warn!(
                file = %self.origin.display(),
                line = self.line,
                "ignoring trailing text after assignment"
            ),
        }
        self.skip_line();
    }

    fn next_statement(&mut self, map: &HashMap<String, String>) -> Option<Statement> {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            match self.peek()? {
                '#' => {
                    self.skip_line();
                    continue;
                }
                ';' => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let start = self.pos;
            while self
                .peek()
                .is_some_and(|c| !c.is_whitespace() && c != '=' && c != ';')
            {
                self.pos += 1;
            }
            let word: String = self.chars[start..self.pos].iter().collect();

            if self.peek() == Some('=') && is_identifier(&word) {
                self.bump();
                let value = self.read_value(map);
                self.end_statement();
                return Some(Statement::Assign(word, value));
            }
            match word.as_str() {
                "export" | "local" => continue,
                "source" | "." => {
                    self.skip_blanks();
                    let target = self.read_value(map);
                    self.end_statement();
                    if target.is_empty() {
                        warn!(file = %self.origin.display(), line = self.line, "source without a file name");
                        continue;
                    }
                    return Some(Statement::Source(target));
                }
                _ => {
                    warn!(
                        file = %self.origin.display(),
                        line = self.line,
                        text = %word,
                        "skipping unparsable rc line"
                    );
                    self.skip_line();
                }
            }
        }
    }

    fn read_value(&mut self, map: &HashMap<String, String>) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() || c == ';' => break,
                '\'' => {
                    self.bump();
                    self.read_single_quoted(&mut out);
                }
                '"' => {
                    self.bump();
                    self.read_double_quoted(&mut out, map);
                }
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some('\n') | None => {}
                        Some(escaped) => out.push(escaped),
                    }
                }
                '$' => {
                    self.bump();
                    self.expand(&mut out, map);
                }
                _ => {
                    self.bump();
                    out.push(c);
                }
            }
        }
        out
    }

    fn read_single_quoted(&mut self, out: &mut String) {
        let line = self.line;
        while let Some(c) = self.bump() {
            if c == '\'' {
                return;
            }
            out.push(c);
        }
        warn!(file = %self.origin.display(), line, "unterminated single quote");
    }

    fn read_double_quoted(&mut self, out: &mut String, map: &HashMap<String, String>) {
        let line = self.line;
        while let Some(c) = self.bump() {
            match c {
                '"' => return,
                '\\' => match self.bump() {
                    Some(e @ ('\\' | '"' | '$' | '`')) => out.push(e),
                    Some('\n') => {}
                    Some(e) => {
                        out.push('\\');
                        out.push(e);
                    }
                    None => out.push('\\'),
                },
                '$' => self.expand(out, map),
                _ => out.push(c),
            }
        }
        warn!(file = %self.origin.display(), line, "unterminated double quote");
    }

    /// Expand the reference after a `$` that was already consumed.
    fn expand(&mut self, out: &mut String, map: &HashMap<String, String>) {
        let name: String = if self.peek() == Some('{') {
            let start = self.pos + 1;
            let Some(len) = self.chars[start..].iter().position(|&c| c == '}') else {
                out.push('$');
                return;
            };
            let name = self.chars[start..start + len].iter().collect();
            self.pos = start + len + 1;
            name
        } else {
            let start = self.pos;
            while self
                .peek()
                .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
            {
                self.pos += 1;
            }
            self.chars[start..self.pos].iter().collect()
        };
        if name.is_empty() {
            out.push('$');
            return;
        }
        if let Some(value) = map.get(&name) {
            out.push_str(value);
        }
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        parse_str(content, Path::new("/nonexistent/rc"), &mut map);
        map
    }

    #[test]
    fn test_plain_and_quoted_assignments() {
        let map = parse(
            r#"
# a comment
A=plain
B='single $A %{X}'
C="double $A ${A}x \" \$A"
export D=exported
"#,
        );
        assert_eq!(map["A"], "plain");
        assert_eq!(map["B"], "single $A %{X}");
        assert_eq!(map["C"], "double plain plainx \" $A");
        assert_eq!(map["D"], "exported");
    }

    #[test]
    fn test_later_assignment_wins() {
        let map = parse("A=1\nA=2\n");
        assert_eq!(map["A"], "2");
    }

    #[test]
    fn test_multiline_single_quote() {
        let map = parse("FORMAT='line1\nline2'\nNEXT=x");
        assert_eq!(map["FORMAT"], "line1\nline2");
        assert_eq!(map["NEXT"], "x");
    }

    #[test]
    fn test_unknown_variable_expands_empty() {
        let map = parse("A=\"x${MISSING}y\" B=$");
        assert_eq!(map["A"], "xy");
        assert!(!map.contains_key("B"));
    }

    #[test]
    fn test_directives_are_untouched() {
        let map = parse("F=%{?Q}a%{else}b%{}");
        assert_eq!(map["F"], "%{?Q}a%{else}b%{}");
    }

    #[test]
    fn test_unparsable_lines_are_skipped() {
        let map = parse("this is garbage\nA=1\n1BAD=2\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map["A"], "1");
    }

    #[test]
    fn test_source_relative_include() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("extra"), "B=from-extra\nA=override").unwrap();
        std::fs::write(temp.path().join("main"), "A=main\nsource extra\nC=$B").unwrap();

        let mut map = HashMap::new();
        let found = RcFileReader
            .load(&temp.path().join("main"), RcSource::System, &mut map)
            .unwrap();
        assert!(found);
        assert_eq!(map["A"], "override");
        assert_eq!(map["C"], "from-extra");
    }

    #[test]
    fn test_source_loop_is_cut() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a"), "A=1\n. b").unwrap();
        std::fs::write(temp.path().join("b"), "B=2\n. a").unwrap();

        let mut map = HashMap::new();
        RcFileReader
            .load(&temp.path().join("a"), RcSource::User, &mut map)
            .unwrap();
        assert_eq!(map["A"], "1");
        assert_eq!(map["B"], "2");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let mut map = HashMap::new();
        let found = RcFileReader
            .load(&temp.path().join("absent"), RcSource::User, &mut map)
            .unwrap();
        assert!(!found);
        assert!(map.is_empty());
    }
}

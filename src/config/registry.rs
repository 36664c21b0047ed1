//! Read-only access to the resolved configuration.

use super::redundancy::{RedundancyFilter, RedundancyKind, RedundancySettings};
use super::resolver::is_truthy;
use super::types::RcOption;
use std::collections::HashMap;

/// The fully resolved option registry.
///
/// Built once by [`super::ConfigLoader`]; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    options: Vec<RcOption>,
    values: HashMap<String, String>,
    eprefix: String,
    eprefix_conf: String,
}

impl OptionRegistry {
    pub(crate) fn new(
        options: Vec<RcOption>,
        values: HashMap<String, String>,
        eprefix: String,
        eprefix_conf: String,
    ) -> Self {
        Self {
            options,
            values,
            eprefix,
            eprefix_conf,
        }
    }

    /// Resolved value of `key`; empty for unknown keys.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Whether `key` is a known option.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Integer value of `key`, parsed like C `atoi`.
    pub fn get_int(&self, key: &str) -> i64 {
        parse_int(self.get(key))
    }

    /// Truthiness of `key`'s value.
    pub fn get_bool(&self, key: &str) -> bool {
        is_truthy(self.get(key))
    }

    /// Parsed redundancy filter stored in `key`.
    ///
    /// Malformed values are reported and replaced by a safe default.
    pub fn redundancy_filter(&self, key: &str, kind: RedundancyKind) -> RedundancyFilter {
        RedundancyFilter::parse_or_fallback(key, kind, self.get(key))
    }

    /// Redundancy filters of every kind, each read from its own key.
    pub fn redundancy_settings(&self) -> RedundancySettings {
        RedundancySettings {
            filters: RedundancyKind::ALL
                .into_iter()
                .map(|kind| (kind, self.redundancy_filter(kind.key(), kind)))
                .collect(),
        }
    }

    /// Path prefix, read back after resolution.
    pub fn eprefix(&self) -> &str {
        &self.eprefix
    }

    /// Configuration root joined with the path prefix.
    pub fn eprefix_conf(&self) -> &str {
        &self.eprefix_conf
    }

    /// Options in table order, followed by discovered `Local` options.
    pub fn options(&self) -> &[RcOption] {
        &self.options
    }

    /// Textual report of every option.
    ///
    /// With `use_defaults`, the compiled default is printed as the value and
    /// a local change is noted in a comment; otherwise the layered value is
    /// printed and a differing default goes into the comment.
    pub fn dump(&self, use_defaults: bool) -> String {
        let mut out = String::new();
        for option in &self.options {
            out.push_str(&dump_option(option, use_defaults));
        }
        out
    }
}

/// Report block for one option.
fn dump_option(option: &RcOption, use_defaults: bool) -> String {
    let Some(label) = option.kind.label() else {
        return format!("# locally added:\n{}='{}'\n\n", option.key, option.value);
    };
    let (shown, other, message) = if use_defaults {
        (&option.default, &option.value, "was locally changed to:")
    } else {
        (&option.value, &option.default, "changed locally, default was:")
    };
    let mut block = format!(
        "# {}\n# {}\n{}='{}'\n",
        as_comment(label),
        as_comment(&option.description),
        option.key,
        shown
    );
    if option.is_changed() {
        block.push_str(&format!(
            "# {}\n# {}='{}'\n\n",
            message,
            option.key,
            as_comment(other)
        ));
    } else {
        block.push('\n');
    }
    block
}

/// Continue a comment across embedded newlines.
fn as_comment(text: &str) -> String {
    text.replace('\n', "\n# ")
}

/// Leading whitespace, an optional sign, then as many digits as present.
fn parse_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::OptionKind;

    fn registry(options: Vec<RcOption>) -> OptionRegistry {
        let values = options
            .iter()
            .map(|o| (o.key.clone(), o.value.clone()))
            .collect();
        OptionRegistry::new(options, values, String::new(), String::new())
    }

    fn with_value(mut option: RcOption, value: &str) -> RcOption {
        option.value = value.to_string();
        option
    }

    #[test]
    fn test_parse_int_is_permissive() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("  -7px"), -7);
        assert_eq!(parse_int("+3"), 3);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_accessors() {
        let reg = registry(vec![
            with_value(RcOption::integer("WIDTH", "80", ""), "120"),
            with_value(RcOption::boolean("QUICK", "false", ""), "Yes"),
        ]);
        assert_eq!(reg.get("WIDTH"), "120");
        assert_eq!(reg.get_int("WIDTH"), 120);
        assert!(reg.get_bool("QUICK"));
        assert_eq!(reg.get("UNKNOWN"), "");
        assert_eq!(reg.get_int("UNKNOWN"), 0);
        assert!(!reg.get_bool("UNKNOWN"));
        assert!(!reg.contains("UNKNOWN"));
    }

    #[test]
    fn test_redundancy_settings_cover_every_kind() {
        let reg = registry(vec![RcOption::string("REDUNDANT_IF_MIXED", "some", "")]);
        let settings = reg.redundancy_settings();
        assert_eq!(settings.filters.len(), RedundancyKind::ALL.len());
        assert!(settings.get(RedundancyKind::Mixed).unwrap().primary.enabled);
        // missing keys fall back
        assert!(settings.get(RedundancyKind::InUse).unwrap().primary.enabled);
    }

    #[test]
    fn test_dump_unchanged_option() {
        let reg = registry(vec![RcOption::boolean("QUICK", "false", "Quick mode.")]);
        assert_eq!(reg.dump(false), "# BOOLEAN\n# Quick mode.\nQUICK='false'\n\n");
    }

    #[test]
    fn test_dump_changed_option_both_views() {
        let reg = registry(vec![with_value(
            RcOption::string("FMT", "a", "Multi\nline."),
            "b",
        )]);
        assert_eq!(
            reg.dump(false),
            "# STRING\n# Multi\n# line.\nFMT='b'\n# changed locally, default was:\n# FMT='a'\n\n"
        );
        assert_eq!(
            reg.dump(true),
            "# STRING\n# Multi\n# line.\nFMT='a'\n# was locally changed to:\n# FMT='b'\n\n"
        );
    }

    #[test]
    fn test_dump_local_option() {
        let reg = registry(vec![RcOption::local("EIX_X", "v")]);
        assert_eq!(reg.options()[0].kind, OptionKind::Local);
        assert_eq!(reg.dump(true), "# locally added:\nEIX_X='v'\n\n");
    }

    #[test]
    fn test_dump_concatenates_blocks_in_table_order() {
        let reg = registry(vec![
            RcOption::integer("WIDTH", "80", ""),
            RcOption::local("EIX_X", "v"),
        ]);
        assert_eq!(
            reg.dump(false),
            "# INTEGER\n# \nWIDTH='80'\n\n# locally added:\nEIX_X='v'\n\n"
        );
    }
}

//! Redundancy filter settings.
//!
//! A `REDUNDANT_IF_*` value holds one or two atoms, optionally joined by
//! `or`, `||` or `|`:
//!
//! ```text
//! REDUNDANT_IF_WEAKER="all-installed"
//! REDUNDANT_IF_IN_MASK="-some or +all"
//! ```
//!
//! An atom is one of `no`, `false`, `some`, `some-installed`,
//! `some-uninstalled`, `all`, `all-installed`, `all-uninstalled`, compared
//! case-insensitively and optionally prefixed by `+` (only check installed
//! packages) or `-` (only check uninstalled packages).

use crate::strings;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Value substituted for a malformed setting.
pub const FALLBACK: &str = "all-installed";

/// Classes of redundant entries that can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyKind {
    Double,
    DoubleLine,
    Mixed,
    Weaker,
    Stronger,
    NoChange,
    InMask,
    InUnmask,
    InUse,
}

impl RedundancyKind {
    pub const ALL: [RedundancyKind; 9] = [
        RedundancyKind::Double,
        RedundancyKind::DoubleLine,
        RedundancyKind::Mixed,
        RedundancyKind::Weaker,
        RedundancyKind::Stronger,
        RedundancyKind::NoChange,
        RedundancyKind::InMask,
        RedundancyKind::InUnmask,
        RedundancyKind::InUse,
    ];

    /// Option key holding the setting for this kind.
    pub fn key(self) -> &'static str {
        match self {
            RedundancyKind::Double => "REDUNDANT_IF_DOUBLE",
            RedundancyKind::DoubleLine => "REDUNDANT_IF_DOUBLE_LINE",
            RedundancyKind::Mixed => "REDUNDANT_IF_MIXED",
            RedundancyKind::Weaker => "REDUNDANT_IF_WEAKER",
            RedundancyKind::Stronger => "REDUNDANT_IF_STRONGER",
            RedundancyKind::NoChange => "REDUNDANT_IF_NO_CHANGE",
            RedundancyKind::InMask => "REDUNDANT_IF_IN_MASK",
            RedundancyKind::InUnmask => "REDUNDANT_IF_IN_UNMASK",
            RedundancyKind::InUse => "REDUNDANT_IF_IN_USE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| {
            kind.key().eq_ignore_ascii_case(&name)
                || kind.key()["REDUNDANT_IF_".len()..].eq_ignore_ascii_case(&name)
        })
    }
}

impl fmt::Display for RedundancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How many matching entries make a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    #[default]
    Some,
    All,
}

/// Install state the matching entries must refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallFilter {
    #[default]
    Any,
    Installed,
    Uninstalled,
}

/// Package restriction from a `+`/`-` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    /// `+`: only installed packages.
    InstalledOnly,
    /// `-`: only uninstalled packages.
    UninstalledOnly,
}

/// One parsed atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RedundancyAtom {
    pub enabled: bool,
    pub coverage: Coverage,
    pub install: InstallFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict: Option<Restriction>,
}

impl RedundancyAtom {
    /// Parse a single atom; `None` if it is not in the vocabulary.
    pub fn parse(atom: &str) -> Option<Self> {
        let (restrict, word) = match atom.split_at_checked(1) {
            Some(("+", rest)) => (Some(Restriction::InstalledOnly), rest),
            Some(("-", rest)) => (Some(Restriction::UninstalledOnly), rest),
            _ => (None, atom),
        };
        let (enabled, coverage, install) = match word.to_ascii_lowercase().as_str() {
            "no" | "false" => (false, Coverage::Some, InstallFilter::Any),
            "some" => (true, Coverage::Some, InstallFilter::Any),
            "some-installed" => (true, Coverage::Some, InstallFilter::Installed),
            "some-uninstalled" => (true, Coverage::Some, InstallFilter::Uninstalled),
            "all" => (true, Coverage::All, InstallFilter::Any),
            "all-installed" => (true, Coverage::All, InstallFilter::Installed),
            "all-uninstalled" => (true, Coverage::All, InstallFilter::Uninstalled),
            _ => return None,
        };
        Some(Self {
            enabled,
            coverage,
            install,
            restrict,
        })
    }
}

/// Primary and secondary setting for one redundancy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RedundancyFilter {
    pub kind: RedundancyKind,
    pub primary: RedundancyAtom,
    /// Disabled unless a second atom was given.
    pub secondary: RedundancyAtom,
}

impl RedundancyFilter {
    /// Parse a setting, or `None` if it is malformed.
    pub fn parse(kind: RedundancyKind, value: &str) -> Option<Self> {
        let words = strings::split_words(value);
        let (first, second) = match words.as_slice() {
            [first] => (first, None),
            [first, second] => (first, Some(second)),
            [first, or, second] if is_or(or) => (first, Some(second)),
            _ => return None,
        };
        let primary = RedundancyAtom::parse(first)?;
        let secondary = match second {
            Some(second) if is_or(second) => return None,
            Some(second) => RedundancyAtom::parse(second)?,
            None => RedundancyAtom::default(),
        };
        Some(Self {
            kind,
            primary,
            secondary,
        })
    }

    /// Parse a setting, warning and falling back to [`FALLBACK`] if malformed.
    pub fn parse_or_fallback(key: &str, kind: RedundancyKind, value: &str) -> Self {
        Self::parse(kind, value).unwrap_or_else(|| {
            warn!(
                key,
                value,
                fallback = FALLBACK,
                "unknown redundancy value; assuming fallback instead"
            );
            Self {
                kind,
                primary: RedundancyAtom::parse(FALLBACK).unwrap_or_default(),
                secondary: RedundancyAtom::default(),
            }
        })
    }
}

fn is_or(word: &str) -> bool {
    strings::eq_ignore_case(word, "or") || word == "||" || word == "|"
}

/// All redundancy filters read from a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedundancySettings {
    pub filters: BTreeMap<RedundancyKind, RedundancyFilter>,
}

impl RedundancySettings {
    pub fn get(&self, kind: RedundancyKind) -> Option<&RedundancyFilter> {
        self.filters.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> RedundancyAtom {
        RedundancyAtom::parse(s).unwrap()
    }

    #[test]
    fn test_atom_vocabulary() {
        assert!(!atom("no").enabled);
        assert!(!atom("FALSE").enabled);
        assert_eq!(atom("some").coverage, Coverage::Some);
        assert_eq!(atom("All-Installed").install, InstallFilter::Installed);
        assert_eq!(atom("all-uninstalled").coverage, Coverage::All);
        assert_eq!(atom("some-uninstalled").install, InstallFilter::Uninstalled);
        assert!(RedundancyAtom::parse("most").is_none());
        assert!(RedundancyAtom::parse("").is_none());
    }

    #[test]
    fn test_atom_prefixes() {
        assert_eq!(atom("+all").restrict, Some(Restriction::InstalledOnly));
        assert_eq!(atom("-some").restrict, Some(Restriction::UninstalledOnly));
        assert_eq!(atom("some").restrict, None);
        assert!(RedundancyAtom::parse("+").is_none());
    }

    #[test]
    fn test_single_atom_disables_secondary() {
        let f = RedundancyFilter::parse(RedundancyKind::Weaker, "all-installed").unwrap();
        assert!(f.primary.enabled);
        assert_eq!(f.secondary, RedundancyAtom::default());
        assert!(!f.secondary.enabled);
    }

    #[test]
    fn test_two_atoms_with_and_without_or() {
        for value in ["-some +all", "-some or +all", "-some || +all", "-some | +all", "-some OR +all"] {
            let f = RedundancyFilter::parse(RedundancyKind::InMask, value).unwrap();
            assert_eq!(f.primary.restrict, Some(Restriction::UninstalledOnly), "{value}");
            assert_eq!(f.secondary.coverage, Coverage::All, "{value}");
        }
    }

    #[test]
    fn test_malformed_values() {
        for value in ["", "some or", "some all no", "bogus", "some bogus", "some or or", "or some"] {
            assert!(RedundancyFilter::parse(RedundancyKind::Double, value).is_none(), "{value:?}");
        }
    }

    #[test]
    fn test_fallback() {
        let f = RedundancyFilter::parse_or_fallback("K", RedundancyKind::Double, "nonsense");
        assert_eq!(f.primary, atom(FALLBACK));
        assert!(!f.secondary.enabled);
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(RedundancyKind::from_name("in-mask"), Some(RedundancyKind::InMask));
        assert_eq!(RedundancyKind::from_name("REDUNDANT_IF_WEAKER"), Some(RedundancyKind::Weaker));
        assert_eq!(RedundancyKind::from_name("double_line"), Some(RedundancyKind::DoubleLine));
        assert_eq!(RedundancyKind::from_name("nope"), None);
    }
}

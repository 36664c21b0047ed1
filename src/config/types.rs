//! Option types, engine settings and the compiled-in option table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix prepended to `%{*SUFFIX}` references by the main tool.
pub const VARS_PREFIX: &str = "EIX_";

/// Prefix prepended to `%{*SUFFIX}` references by the diff tool.
pub const DIFF_VARS_PREFIX: &str = "DIFF_EIX_";

/// Key holding the installation path prefix.
pub const EPREFIX_KEY: &str = "EPREFIX";

/// Key holding the configuration root.
pub const CONFIGROOT_KEY: &str = "PORTAGE_CONFIGROOT";

/// Value kind of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Boolean,
    String,
    Integer,
    /// Discovered while layering; has no default or description.
    Local,
}

impl OptionKind {
    /// Label used in the dump report; `None` for `Local`.
    pub fn label(self) -> Option<&'static str> {
        match self {
            OptionKind::Boolean => Some("BOOLEAN"),
            OptionKind::String => Some("STRING"),
            OptionKind::Integer => Some("INTEGER"),
            OptionKind::Local => None,
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("LOCAL"))
    }
}

/// One named option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcOption {
    pub key: String,
    pub kind: OptionKind,
    /// Compiled-in default; empty for `Local`.
    pub default: String,
    /// Empty for `Local`.
    pub description: String,
    /// Value after layering, before delayed substitution.
    pub value: String,
}

impl RcOption {
    pub fn new(
        kind: OptionKind,
        key: impl Into<String>,
        default: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let default = default.into();
        Self {
            key: key.into(),
            kind,
            value: default.clone(),
            default,
            description: description.into(),
        }
    }

    pub fn boolean(key: &str, default: &str, description: &str) -> Self {
        Self::new(OptionKind::Boolean, key, default, description)
    }

    pub fn string(key: &str, default: &str, description: &str) -> Self {
        Self::new(OptionKind::String, key, default, description)
    }

    pub fn integer(key: &str, default: &str, description: &str) -> Self {
        Self::new(OptionKind::Integer, key, default, description)
    }

    /// An option synthesized for a referenced key.
    pub fn local(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: OptionKind::Local,
            default: String::new(),
            description: String::new(),
            value: value.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == OptionKind::Local
    }

    /// Whether the layered value differs from the compiled default.
    pub fn is_changed(&self) -> bool {
        self.default != self.value
    }
}

/// Policy for `%{*SUFFIX}` references.
///
/// Discovery registers `PREFIX + SUFFIX` for every prefix in `discovery`;
/// resolution only looks up `active + SUFFIX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectPrefixes {
    discovery: Vec<String>,
    active: String,
}

impl Default for IndirectPrefixes {
    fn default() -> Self {
        Self::new([VARS_PREFIX, DIFF_VARS_PREFIX], VARS_PREFIX)
    }
}

impl IndirectPrefixes {
    /// The active prefix is always part of the discovery list.
    pub fn new<I, S>(discovery: I, active: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let active = active.into();
        let mut discovery: Vec<String> = discovery.into_iter().map(Into::into).collect();
        if !discovery.contains(&active) {
            discovery.push(active.clone());
        }
        Self { discovery, active }
    }

    /// Same discovery list, different lookup prefix.
    pub fn with_active(self, active: impl Into<String>) -> Self {
        Self::new(self.discovery, active)
    }

    pub fn discovery(&self) -> &[String] {
        &self.discovery
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    /// Key looked up at resolution time.
    pub fn lookup_key(&self, suffix: &str) -> String {
        format!("{}{}", self.active, suffix)
    }

    /// Keys registered at discovery time.
    pub fn discovery_keys<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = String> + 'a {
        self.discovery.iter().map(move |p| format!("{p}{suffix}"))
    }
}

/// Engine settings that are not options themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub prefixes: IndirectPrefixes,
    /// Key read back as the path prefix after resolution.
    pub eprefix_key: String,
    /// Key read back as the configuration root after resolution.
    pub configroot_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefixes: IndirectPrefixes::default(),
            eprefix_key: EPREFIX_KEY.to_string(),
            configroot_key: CONFIGROOT_KEY.to_string(),
        }
    }
}

impl Settings {
    pub fn with_prefixes(mut self, prefixes: IndirectPrefixes) -> Self {
        self.prefixes = prefixes;
        self
    }
}

/// The compiled-in option table.
pub fn default_options() -> Vec<RcOption> {
    vec![
        RcOption::string(
            EPREFIX_KEY,
            "",
            "Prefix of the installation. Taken from the environment if set there.",
        ),
        RcOption::string(
            CONFIGROOT_KEY,
            "",
            "Root of the configuration files, relative to EPREFIX.",
        ),
        RcOption::string(
            "EPREFIX_ROOT",
            "%{EPREFIX}/",
            "Prefix of the root directory.",
        ),
        RcOption::string(
            "EIX_CACHEFILE",
            "%{EPREFIX}/var/cache/eix/portage.eix",
            "The file which is used by eix to store the index.",
        ),
        RcOption::boolean(
            "FORCE_COLORS",
            "false",
            "Output colours even if stdout is not a terminal.",
        ),
        RcOption::boolean(
            "NOCOLORS",
            "%{!FORCE_COLORS}false%{}",
            "Disable colour output. Defaults to false unless forced.",
        ),
        RcOption::boolean(
            "DIFF_NOCOLORS",
            "%{NOCOLORS}",
            "Disable colour output for the diff tool.",
        ),
        RcOption::boolean(
            "QUICKMODE",
            "false",
            "Print only the package names.",
        ),
        RcOption::boolean(
            "PRINT_COUNT_ALWAYS",
            "false",
            "Always print the number of matches, even if there are none.",
        ),
        RcOption::integer(
            "TERM_WIDTH",
            "80",
            "Terminal width used for line breaking.",
        ),
        RcOption::integer(
            "LEVENSHTEIN_DISTANCE",
            "3",
            "Maximal Levenshtein distance for fuzzy matches.",
        ),
        RcOption::string(
            "COLOR_NAME",
            "%{?NOCOLORS}none%{else}green,1%{}",
            "Colour of package names.",
        ),
        RcOption::string(
            "COLOR_VERSION",
            "%{?NOCOLORS}none%{else}blue,1%{}",
            "Colour of versions.",
        ),
        RcOption::string(
            "FORMAT_NAME",
            "(%{*COLOR_NAME})<category>/<name>()",
            "Format of the package name. Uses the colour of the running tool.",
        ),
        RcOption::string(
            "FORMAT",
            "%{FORMAT_NAME}%{?QUICKMODE}%{else} <availableversions>%{}",
            "Default output format.",
        ),
        RcOption::string(
            "REDUNDANT_IF_DOUBLE",
            "some",
            "Report redundancy if a keyword is listed twice.",
        ),
        RcOption::string(
            "REDUNDANT_IF_DOUBLE_LINE",
            "some",
            "Report redundancy if a keyword line is listed twice.",
        ),
        RcOption::string(
            "REDUNDANT_IF_MIXED",
            "false",
            "Report redundancy for mixed stable and unstable keywords.",
        ),
        RcOption::string(
            "REDUNDANT_IF_WEAKER",
            "all-installed",
            "Report redundancy if a weaker keyword is listed.",
        ),
        RcOption::string(
            "REDUNDANT_IF_STRONGER",
            "all-installed",
            "Report redundancy if a stronger keyword is listed.",
        ),
        RcOption::string(
            "REDUNDANT_IF_NO_CHANGE",
            "all-installed",
            "Report redundancy if a keyword does not change stability.",
        ),
        RcOption::string(
            "REDUNDANT_IF_IN_MASK",
            "-some",
            "Report redundancy for useless package.mask entries.",
        ),
        RcOption::string(
            "REDUNDANT_IF_IN_UNMASK",
            "-some",
            "Report redundancy for useless package.unmask entries.",
        ),
        RcOption::string(
            "REDUNDANT_IF_IN_USE",
            "-some",
            "Report redundancy for useless package.use entries.",
        ),
    ]
}

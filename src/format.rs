//! Output formatting for option reports.

use crate::config::{OptionKind, OptionRegistry};
use serde::Serialize;

/// Output format for the dump report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    /// Shell-sourceable rc text with comments
    #[default]
    Rc,
    Json,
}

impl DumpFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rc" | "sh" | "shell" => Some(DumpFormat::Rc),
            "json" => Some(DumpFormat::Json),
            _ => None,
        }
    }
}

/// One option in the JSON report.
#[derive(Debug, Serialize)]
struct OptionReport<'a> {
    key: &'a str,
    kind: OptionKind,
    #[serde(skip_serializing_if = "is_empty")]
    description: &'a str,
    default: &'a str,
    /// Layered value before delayed substitution.
    value: &'a str,
    resolved: &'a str,
    changed: bool,
}

fn is_empty(s: &&str) -> bool {
    s.is_empty()
}

/// Render the registry in `format`.
pub fn render_dump(
    registry: &OptionRegistry,
    format: DumpFormat,
    use_defaults: bool,
) -> serde_json::Result<String> {
    match format {
        DumpFormat::Rc => Ok(registry.dump(use_defaults)),
        DumpFormat::Json => {
            let report: Vec<OptionReport<'_>> = registry
                .options()
                .iter()
                .map(|o| OptionReport {
                    key: &o.key,
                    kind: o.kind,
                    description: &o.description,
                    default: &o.default,
                    value: &o.value,
                    resolved: registry.get(&o.key),
                    changed: o.is_changed(),
                })
                .collect();
            serde_json::to_string_pretty(&report)
        }
    }
}

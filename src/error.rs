//! Structured error types for configuration loading and resolution.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error kinds raised while expanding delayed references.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveErrorKind {
    /// `%{}` with no open conditional.
    UnmatchedEnd,
    /// `%{else}` with no open conditional.
    UnmatchedElse,
    /// Two `%{else}` in the same block.
    DoubleElse,
    /// End of value reached inside an open conditional.
    UnterminatedIf,
    /// A key transitively references itself.
    SelfReference,
}

impl ResolveErrorKind {
    /// Fixed human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ResolveErrorKind::UnmatchedEnd => "FI without IF",
            ResolveErrorKind::UnmatchedElse => "ELSE without IF",
            ResolveErrorKind::DoubleElse => "double ELSE",
            ResolveErrorKind::UnterminatedIf => "IF without FI",
            ResolveErrorKind::SelfReference => "self-reference",
        }
    }
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A fatal delayed-substitution error together with the responsible key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Error)]
#[error("{kind} in delayed substitution of {key}")]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub key: String,
    /// Keys being expanded when the error was hit, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            chain: Vec::new(),
        }
    }

    pub fn with_chain(mut self, chain: &[String]) -> Self {
        self.chain = chain.to_vec();
        self
    }

    // Convenience constructors

    pub fn unmatched_end(key: &str) -> Self {
        Self::new(ResolveErrorKind::UnmatchedEnd, key)
    }

    pub fn unmatched_else(key: &str) -> Self {
        Self::new(ResolveErrorKind::UnmatchedElse, key)
    }

    pub fn double_else(key: &str) -> Self {
        Self::new(ResolveErrorKind::DoubleElse, key)
    }

    pub fn unterminated_if(key: &str) -> Self {
        Self::new(ResolveErrorKind::UnterminatedIf, key)
    }

    pub fn self_reference(key: &str, chain: &[String]) -> Self {
        Self::new(ResolveErrorKind::SelfReference, key).with_chain(chain)
    }

    /// The chain rendered as `A -> B -> C`, empty when unknown.
    pub fn chain_display(&self) -> String {
        self.chain.join(" -> ")
    }
}

/// Errors surfaced by [`crate::config::ConfigLoader`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for resolution.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_key_and_description() {
        let err = ResolveError::unterminated_if("FORMAT");
        assert_eq!(
            err.to_string(),
            "IF without FI in delayed substitution of FORMAT"
        );
    }

    #[test]
    fn test_self_reference_keeps_chain() {
        let chain = vec!["A".to_string(), "B".to_string()];
        let err = ResolveError::self_reference("B", &chain);
        assert_eq!(err.kind, ResolveErrorKind::SelfReference);
        assert_eq!(err.chain_display(), "A -> B");
    }

    #[test]
    fn test_serializes_kind_as_screaming_snake() {
        let err = ResolveError::double_else("X");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "DOUBLE_ELSE");
        assert!(json.get("chain").is_none());
    }
}

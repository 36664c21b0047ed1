//! Configuration loader with tier-based layering.
//!
//! Loads options from every tier into one working map, seeds the pending
//! set, discovers `Local` options for referenced keys and finally runs the
//! delayed resolver.

use super::files::{RcFileReader, RcSource, SourceLoader};
use super::merge::{overlay_env, seed_defaults};
use super::registry::OptionRegistry;
use super::resolver::{Resolver, unescape_all};
use super::scan;
use super::types::{CONFIGROOT_KEY, EPREFIX_KEY, RcOption, Settings, default_options};
use crate::env::{Environment, ProcessEnv};
use crate::error::{ConfigError, ResolveError};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, warn};

/// System rc location, below the configuration root.
pub const SYSTEM_RC: &str = "/etc/eixrc";

/// User rc file name, below `$HOME`.
pub const USER_RC: &str = ".eixrc";

/// Environment variable replacing the discovered system rc path.
pub const SYSTEM_RC_ENV: &str = "LAYERED_RC_SYSTEM_RC";

/// Environment variable replacing the discovered user rc path.
pub const USER_RC_ENV: &str = "LAYERED_RC_USER_RC";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Compiled-in defaults (lowest priority)
    Defaults = 0,
    /// System-wide rc file
    System = 1,
    /// Per-user rc file
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl ConfigTier {
    /// The rc file source read for this tier, if it is a file tier.
    pub fn rc_source(self) -> Option<RcSource> {
        match self {
            ConfigTier::System => Some(RcSource::System),
            ConfigTier::User => Some(RcSource::User),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }
    }
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::System => write!(f, "system"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// rc file locations for the file tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    /// System-wide rc file
    pub system_rc: Option<PathBuf>,
    /// Per-user rc file; `None` when no home directory is known
    pub user_rc: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover rc paths from the environment.
    ///
    /// The system rc lives below `$EPREFIX$PORTAGE_CONFIGROOT`; the user rc
    /// is `$HOME/.eixrc`. Either can be replaced through
    /// [`SYSTEM_RC_ENV`] / [`USER_RC_ENV`].
    pub fn discover(env: &impl Environment) -> Self {
        let system_rc = env.lookup(SYSTEM_RC_ENV).map(PathBuf::from).or_else(|| {
            let (_, eprefix_conf) = env_prefixes(env);
            Some(PathBuf::from(format!("{eprefix_conf}{SYSTEM_RC}")))
        });

        let user_rc = env.lookup(USER_RC_ENV).map(PathBuf::from).or_else(|| {
            match env.lookup("HOME") {
                Some(home) => Some(PathBuf::from(home).join(USER_RC)),
                None => {
                    warn!("No $HOME found in environment");
                    dirs::home_dir().map(|h| h.join(USER_RC))
                }
            }
        });

        Self { system_rc, user_rc }
    }

    /// Create paths with explicit files.
    pub fn with_files(system_rc: Option<PathBuf>, user_rc: Option<PathBuf>) -> Self {
        Self { system_rc, user_rc }
    }
}

/// Path prefix and configuration root as seen in the environment alone.
fn env_prefixes(env: &impl Environment) -> (String, String) {
    let eprefix = env.lookup(EPREFIX_KEY).unwrap_or_default();
    let eprefix_conf = match env.lookup(CONFIGROOT_KEY) {
        Some(root) => format!("{eprefix}{root}"),
        None => eprefix.clone(),
    };
    (eprefix, eprefix_conf)
}

/// Options after layering, before delayed substitution.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Table options followed by discovered `Local` options.
    pub options: Vec<RcOption>,
    /// Registry values, still containing directives.
    pub values: HashMap<String, String>,
    /// Keys whose value still contains a reference.
    pub pending: HashSet<String>,
}

impl LayeredConfig {
    /// Run delayed substitution over every option and publish the registry.
    ///
    /// Nothing is published on failure.
    pub fn resolve(self, settings: &Settings) -> Result<OptionRegistry, ResolveError> {
        let LayeredConfig {
            options,
            mut values,
            mut pending,
        } = self;

        Resolver::new(&mut values, &mut pending, &settings.prefixes)
            .resolve_all(options.iter().map(|o| o.key.as_str()))?;
        unescape_all(&mut values);

        let eprefix = values.get(&settings.eprefix_key).cloned().unwrap_or_default();
        let configroot = values.get(&settings.configroot_key).cloned().unwrap_or_default();
        let eprefix_conf = format!("{configroot}{eprefix}");
        debug!(%eprefix, %eprefix_conf, "configuration resolved");

        Ok(OptionRegistry::new(options, values, eprefix, eprefix_conf))
    }
}

/// Configuration loader that handles tier-based layering.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    options: Vec<RcOption>,
    paths: Option<ConfigPaths>,
    settings: Settings,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(default_options())
    }
}

impl ConfigLoader {
    /// Loader over an explicit option table.
    pub fn new(options: Vec<RcOption>) -> Self {
        Self {
            options,
            paths: None,
            settings: Settings::default(),
        }
    }

    /// Use explicit rc paths instead of discovering them.
    pub fn with_paths(mut self, paths: ConfigPaths) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load from the process environment and the real rc files.
    pub fn load(self) -> Result<OptionRegistry, ConfigError> {
        self.load_with(&ProcessEnv, &RcFileReader)
    }

    /// Load with an explicit environment and file reader.
    pub fn load_with(
        self,
        env: &impl Environment,
        reader: &impl SourceLoader,
    ) -> Result<OptionRegistry, ConfigError> {
        let settings = self.settings.clone();
        let layered = self.layer(env, reader)?;
        Ok(layered.resolve(&settings)?)
    }

    /// Build the working registry from all tiers without resolving it.
    pub fn layer(
        self,
        env: &impl Environment,
        reader: &impl SourceLoader,
    ) -> Result<LayeredConfig, ConfigError> {
        let ConfigLoader {
            mut options,
            paths,
            settings,
        } = self;
        let paths = paths.unwrap_or_else(|| ConfigPaths::discover(env));

        // Tier 1: Defaults
        let mut map = seed_defaults(&options);
        debug!(tier = %ConfigTier::Defaults, keys = map.len(), "seeded compiled defaults");

        // Tiers 2 and 3: system rc, then user rc
        for (tier, path) in [
            (ConfigTier::System, &paths.system_rc),
            (ConfigTier::User, &paths.user_rc),
        ] {
            let (Some(path), Some(source)) = (path, tier.rc_source()) else {
                debug!(%tier, "no rc file configured");
                continue;
            };
            if reader.load(path, source, &mut map)? {
                debug!(%tier, path = %path.display(), "applied rc file");
            } else if tier == ConfigTier::User {
                warn!(path = %path.display(), "user rc file not found; continuing without it");
            }
        }

        // Tier 4: Environment overrides
        let replaced = overlay_env(&mut map, env);
        debug!(
            tier = %ConfigTier::Environment,
            replaced, "applied environment overrides"
        );

        let mut values = HashMap::with_capacity(options.len());
        for option in &mut options {
            option.value = map.get(&option.key).cloned().unwrap_or_default();
            values.insert(option.key.clone(), option.value.clone());
        }

        let mut known: HashSet<String> = options.iter().map(|o| o.key.clone()).collect();
        let mut pending = HashSet::new();

        // Discovered options are appended and scanned in turn.
        let mut index = 0;
        while index < options.len() {
            let value = options[index].value.clone();
            for directive in scan::directives(&value).filter(|d| d.kind.is_reference()) {
                pending.insert(options[index].key.clone());
                let candidates: Vec<String> = match directive.indirect_suffix() {
                    Some(suffix) => settings.prefixes.discovery_keys(suffix).collect(),
                    None => vec![directive.name.to_string()],
                };
                for candidate in candidates {
                    if !known.insert(candidate.clone()) {
                        continue;
                    }
                    let value = map
                        .get(&candidate)
                        .cloned()
                        .or_else(|| env.lookup(&candidate))
                        .unwrap_or_default();
                    debug!(key = %candidate, %value, "discovered local option");
                    values.insert(candidate.clone(), value.clone());
                    options.push(RcOption::local(candidate, value));
                }
            }
            index += 1;
        }

        Ok(LayeredConfig {
            options,
            values,
            pending,
        })
    }
}

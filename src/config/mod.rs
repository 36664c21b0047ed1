//! Layered rc configuration.
//!
//! Options are layered from four tiers, later tiers winning key by key:
//! 1. **Defaults** - the compiled-in option table
//! 2. **System** - `$EPREFIX$PORTAGE_CONFIGROOT/etc/eixrc`
//! 3. **User** - `$HOME/.eixrc`
//! 4. **Environment** - a variable named like the option
//!
//! After layering, values are rewritten by delayed substitution:
//!
//! - `%{NAME}` inserts the resolved value of `NAME`
//! - `%{*SUFFIX}` inserts the value of `<prefix>SUFFIX`
//! - `%{?NAME}...%{else}...%{}` keeps one branch depending on whether
//!   `NAME` is true (`true`, `1`, `yes`, `y`, `on`); `%{!NAME}` negates
//! - `%%{` is a literal `%{`
//!
//! ## Environment Variables
//! - `EPREFIX`, `PORTAGE_CONFIGROOT` - locate the system rc
//! - `HOME` - locates the user rc
//! - `LAYERED_RC_SYSTEM_RC` - explicit system rc path
//! - `LAYERED_RC_USER_RC` - explicit user rc path

mod files;
mod loader;
mod merge;
mod redundancy;
mod registry;
mod resolver;
pub mod scan;
mod types;

pub use files::{MAX_INCLUDE_DEPTH, RcFileReader, RcSource, SourceLoader, parse_str};
pub use loader::{
    ConfigLoader, ConfigPaths, ConfigTier, LayeredConfig, SYSTEM_RC, SYSTEM_RC_ENV, USER_RC,
    USER_RC_ENV,
};
pub use merge::{overlay_env, seed_defaults};
pub use redundancy::{
    Coverage, FALLBACK, InstallFilter, RedundancyAtom, RedundancyFilter, RedundancyKind,
    RedundancySettings, Restriction,
};
pub use registry::OptionRegistry;
pub use resolver::{Resolver, TRUE_WORDS, is_truthy, unescape_all};
pub use types::*;

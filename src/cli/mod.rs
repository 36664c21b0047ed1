//! CLI command definitions for layered-rc
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{ConfigPaths, RedundancyKind};
use crate::env::Environment;
use crate::format::DumpFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Inspect layered rc configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// System rc file (default: $EPREFIX$PORTAGE_CONFIGROOT/etc/eixrc)
    #[arg(long, global = true)]
    pub system_rc: Option<PathBuf>,

    /// User rc file (default: $HOME/.eixrc)
    #[arg(long, global = true)]
    pub user_rc: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Discovered rc paths with the command-line overrides applied.
    pub fn config_paths(&self, env: &impl Environment) -> ConfigPaths {
        let discovered = ConfigPaths::discover(env);
        ConfigPaths::with_files(
            self.system_rc.clone().or(discovered.system_rc),
            self.user_rc.clone().or(discovered.user_rc),
        )
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every option with its resolved value (default if no subcommand given)
    Dump(DumpArgs),

    /// Print the resolved value of one option
    Get {
        /// Option name
        key: String,
    },

    /// Print an option interpreted as an integer
    Int {
        /// Option name
        key: String,
    },

    /// Print an option interpreted as a boolean
    Bool {
        /// Option name
        key: String,
    },

    /// Print a parsed redundancy setting as JSON
    Redundancy(RedundancyArgs),

    /// Print the path prefix and configuration prefix
    Prefix,
}

/// Arguments for the dump command.
#[derive(Args, Debug, Default)]
pub struct DumpArgs {
    /// Show defaults next to changed values
    #[arg(long)]
    pub defaults: bool,

    /// Output format: rc or json
    #[arg(short, long, default_value = "rc", value_parser = parse_dump_format)]
    pub format: DumpFormat,
}

/// Arguments for the redundancy command.
#[derive(Args, Debug)]
pub struct RedundancyArgs {
    /// Option name, e.g. REDUNDANT_IF_DOUBLE
    pub key: String,

    /// Redundancy class; derived from the key when omitted
    #[arg(short, long, value_parser = parse_redundancy_kind)]
    pub kind: Option<RedundancyKind>,
}

impl RedundancyArgs {
    /// Redundancy class for this request.
    pub fn resolved_kind(&self) -> Option<RedundancyKind> {
        self.kind.or_else(|| RedundancyKind::from_name(&self.key))
    }
}

fn parse_dump_format(s: &str) -> Result<DumpFormat, String> {
    DumpFormat::from_str(s).ok_or_else(|| format!("unknown format '{s}' (expected rc or json)"))
}

fn parse_redundancy_kind(s: &str) -> Result<RedundancyKind, String> {
    RedundancyKind::from_name(s).ok_or_else(|| format!("unknown redundancy kind '{s}'"))
}

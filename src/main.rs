//! layered-rc
//!
//! Loads the layered rc configuration and prints options from it.

use anyhow::{Context, Result, bail};
use clap::Parser;
use layered_rc::cli::{Cli, Command, DumpArgs, RedundancyArgs};
use layered_rc::config::{ConfigLoader, OptionRegistry};
use layered_rc::env::ProcessEnv;
use layered_rc::error::ConfigError;
use layered_rc::format::render_dump;
use layered_rc::logging::{self, LogTarget};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let paths = cli.config_paths(&ProcessEnv);
    debug!(?paths, "rc file locations");

    let registry = match ConfigLoader::default().with_paths(paths).load() {
        Ok(registry) => registry,
        Err(ConfigError::Resolve(err)) => {
            eprintln!("fatal config error: {err}");
            if !err.chain.is_empty() {
                eprintln!("  while resolving: {}", err.chain_display());
            }
            std::process::exit(2);
        }
        Err(err) => return Err(err.into()),
    };

    // Handle subcommands
    match cli.command {
        Some(Command::Dump(args)) => run_dump(&registry, &args)?,
        None => run_dump(&registry, &DumpArgs::default())?,
        Some(Command::Get { key }) => println!("{}", known(&registry, &key)?),
        Some(Command::Int { key }) => {
            known(&registry, &key)?;
            println!("{}", registry.get_int(&key));
        }
        Some(Command::Bool { key }) => {
            known(&registry, &key)?;
            println!("{}", registry.get_bool(&key));
        }
        Some(Command::Redundancy(args)) => run_redundancy(&registry, &args)?,
        Some(Command::Prefix) => {
            println!("EPREFIX={}", registry.eprefix());
            println!("EPREFIX_CONF={}", registry.eprefix_conf());
        }
    }

    Ok(())
}

/// Resolved value of `key`, or an error naming the unknown option.
fn known<'a>(registry: &'a OptionRegistry, key: &str) -> Result<&'a str> {
    if !registry.contains(key) {
        bail!("unknown option: {key}");
    }
    Ok(registry.get(key))
}

fn run_dump(registry: &OptionRegistry, args: &DumpArgs) -> Result<()> {
    let text = render_dump(registry, args.format, args.defaults).context("rendering dump")?;
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn run_redundancy(registry: &OptionRegistry, args: &RedundancyArgs) -> Result<()> {
    let Some(kind) = args.resolved_kind() else {
        bail!(
            "cannot derive a redundancy kind from '{}'; pass --kind",
            args.key
        );
    };
    known(registry, &args.key)?;
    let filter = registry.redundancy_filter(&args.key, kind);
    println!("{}", serde_json::to_string_pretty(&filter)?);
    Ok(())
}

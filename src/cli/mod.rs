//! cli
//!
//! Command-line interface layer for the translator.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and build the function catalogue
//! - Route function tokens to the engine
//! - Decide presentation and exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a
//! [`router::Router`] and hands the tokens to it. All lifecycle rules live in
//! [`crate::engine`].
//!
//! # Exit codes
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success (including `--list` and help)          |
//! | 1    | An operation phase failed                      |
//! | 2    | Usage or resolution failure                    |
//! | 3    | Configuration or catalogue failure             |

pub mod args;
pub mod discovery;
pub mod listing;
pub mod logging;
pub mod router;

pub use args::{Cli, Shell};

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::CommandFactory;
use clap_complete::{generate, shells};

use crate::builtin;
use crate::core::config::{self, Config, ConfigError};
use crate::engine::{Context, LifecycleError, Logger, RegistryError};
use crate::keywords::MemoryKeywords;
use crate::ob::{self, ObError, RenameTable};
use crate::ui::output::{self, Verbosity};
use discovery::DiscoveryError;
use router::{RouteError, RouteOutcome, Router};

/// Exit code for phase failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for usage and resolution failures.
pub const EXIT_USAGE: u8 = 2;
/// Exit code for configuration failures.
pub const EXIT_CONFIG: u8 = 3;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(shell) = cli.completions {
        completion(shell);
        return Ok(());
    }

    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let config = load_config(&cli, verbosity)?;

    let mut settings = config.translator()?;
    if let Some(dir) = &cli.functions_dir {
        settings.functions_dir = dir.clone();
    }

    let keywords = Arc::new(MemoryKeywords::from_config(&config));
    let registry = builtin::registry(keywords)?;
    let catalogue = discovery::discover(&settings.functions_dir, &settings.function_prefix)?;
    let links = config.links()?;
    let router = Router::new(&settings.root, catalogue, registry).with_links(links);

    if cli.list {
        output::print(
            listing::render(
                router.tree(),
                router.registry(),
                router.links(),
                output::color_enabled(),
            ),
            verbosity,
        );
        return Ok(());
    }

    let base = match (&cli.ob, cli.sequence) {
        (Some(path), Some(sequence)) => {
            let document = ob::load(path)?;
            let renames = RenameTable::from_config(&config)?;
            Some(ob::map_ob(&document, sequence, &renames)?)
        }
        _ => None,
    };

    let resolved = router.resolve(&cli.function)?;
    if let Some(alias) = &resolved.alias {
        output::debug(format!("alias '{}' -> {}", alias, resolved.path), verbosity);
    }
    output::debug(format!("function: {}", resolved.path), verbosity);
    output::debug(format!("arguments: {:?}", resolved.remaining), verbosity);

    let ctx = Context::new(config).with_logger(Logger::new(settings.root.as_str()));
    match router.invoke(resolved, base, &ctx)? {
        RouteOutcome::Completed { path, outcome } => {
            output::debug(
                format!("{} completed (fingerprint {})", path, outcome.fingerprint),
                verbosity,
            );
            output::result(&outcome.value, verbosity);
        }
        RouteOutcome::Help { text, .. } => output::print(text.trim_end(), verbosity),
    }
    Ok(())
}

/// Layer `--config-dir`/`--instrument` files, then each `--config` file.
/// With neither, the default locations are searched.
fn load_config(cli: &Cli, verbosity: Verbosity) -> Result<Config> {
    let mut config = Config::new();
    if let Some(dir) = &cli.config_dir {
        let files = config::locate(dir, cli.instrument.as_deref());
        let loaded = Config::load_layered(&files)?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{}: {}", warning.path.display(), warning.message),
                verbosity,
            );
        }
        config.merge(loaded.config);
    }
    if !cli.config.is_empty() || cli.config_dir.is_none() {
        let loaded = Config::load(&cli.config).context("loading configuration")?;
        config.merge(loaded.config);
    }
    tracing::debug!(sources = ?config.sources(), "configuration loaded");
    Ok(config)
}

/// Print a completion script to stdout.
fn completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut out = std::io::stdout();

    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, &name, &mut out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, &name, &mut out),
        Shell::Fish => generate(shells::Fish, &mut cmd, &name, &mut out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, &name, &mut out),
    }
}

/// Map an error from [`run`] to a process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(route) = err.downcast_ref::<RouteError>() {
        return match route {
            RouteError::Lifecycle { source, .. } => match source {
                LifecycleError::InvalidArguments(_)
                | LifecycleError::HelpRequested(_)
                | LifecycleError::Snapshot(_) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            },
            _ => EXIT_USAGE,
        };
    }
    if err.downcast_ref::<ObError>().is_some() {
        return EXIT_USAGE;
    }
    if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<DiscoveryError>().is_some()
        || err.downcast_ref::<RegistryError>().is_some()
    {
        return EXIT_CONFIG;
    }
    EXIT_FAILURE
}

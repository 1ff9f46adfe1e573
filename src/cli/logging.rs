//! cli::logging
//!
//! Tracing subscriber setup for the binary. The library itself only emits
//! events; installing a subscriber is the entry point's decision.
//!
//! `RUST_LOG` overrides the defaults below.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "translator_module=error,error"
    } else if verbose {
        "translator_module=debug,info"
    } else {
        "translator_module=info,warn"
    }
}

/// Initialize tracing on stderr.
///
/// Verbose mode includes targets and span close events (with timings).
pub fn init_tracing(verbose: bool, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose, quiet)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time()
                    .compact(),
            )
            .try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse() {
        for (verbose, quiet) in [(false, false), (true, false), (false, true)] {
            assert!(EnvFilter::try_new(default_filter(verbose, quiet)).is_ok());
        }
    }

    #[test]
    fn quiet_wins() {
        assert!(default_filter(true, true).contains("error"));
        assert!(default_filter(true, false).contains("debug"));
    }
}

//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Usage
//!
//! ```text
//! translator [OPTIONS] [FUNCTION]...
//! ```
//!
//! Everything after the options is routed: the leading tokens name the
//! function, the rest are its arguments. Options meant for the function
//! (including `-h`) are passed through untouched once the first function
//! token has been seen.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Translator - dispatch translator module functions
#[derive(Parser, Debug)]
#[command(name = "translator")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Show every available function
    translator --list

    # Run a function with positional and keyword arguments
    translator keywords write mosfire ITIME 30 --timeout 5

    # Show a function's own help
    translator keywords waitfor -h

    # Run a function with arguments taken from an observing block
    translator --ob ob.json --sequence 1 util echo")]
pub struct Cli {
    /// Print the function tree and exit
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Report how the command line was resolved and enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file(s), layered in order
    #[arg(long = "config", value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Directory holding default_config.{toml,ini} and <instrument>_config.{toml,ini}
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Instrument whose config file is layered over the default one
    #[arg(long, value_name = "NAME", requires = "config_dir")]
    pub instrument: Option<String>,

    /// Directory scanned for function files (overrides [translator] functions_dir)
    #[arg(long, value_name = "DIR")]
    pub functions_dir: Option<PathBuf>,

    /// Observing block (JSON) to take arguments from
    #[arg(long, value_name = "FILE", requires = "sequence")]
    pub ob: Option<PathBuf>,

    /// Sequence number of the observation to use from --ob
    #[arg(long, value_name = "N", requires = "ob", allow_negative_numbers = true)]
    pub sequence: Option<i64>,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Function path followed by its arguments
    #[arg(
        value_name = "FUNCTION",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub function: Vec<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

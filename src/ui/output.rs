//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Errors, warnings and
//! debug notes go to stderr. Colour is used only when stdout is a terminal
//! and `NO_COLOR` is unset.

use std::fmt::Display;
use std::io::IsTerminal;

use serde_json::Value;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print an operation result (respects quiet mode).
///
/// `null` prints nothing, strings print bare, anything else as pretty JSON.
pub fn result(value: &Value, verbosity: Verbosity) {
    if let Some(text) = format_value(value) {
        print(text, verbosity);
    }
}

/// Text form of an operation result, `None` for `null`.
pub fn format_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

/// Whether coloured output should be used on stdout.
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Wrap `text` in green when `color` is set.
pub fn green(text: &str, color: bool) -> String {
    if color {
        format!("\x1b[32m{}\x1b[0m", text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn values_format() {
        assert_eq!(format_value(&Value::Null), None);
        assert_eq!(format_value(&json!("done")).as_deref(), Some("done"));
        assert_eq!(format_value(&json!({"a": 1})).as_deref(), Some("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn green_only_with_color() {
        assert_eq!(green("leaf", false), "leaf");
        assert_eq!(green("leaf", true), "\x1b[32mleaf\x1b[0m");
    }
}

//! engine::params
//!
//! Declared operation parameters and the fold-in of command-line tokens.
//!
//! # Architecture
//!
//! An operation lists its parameters as [`ParamSpec`]s. When it is invoked
//! with a flat token list instead of a mapping, a `clap::Command` is built
//! from the specs and the tokens are parsed with it. Only values the tokens
//! actually supply end up in the result; [`fold`] then layers them over any
//! base mapping, fills declared defaults and checks required parameters.
//!
//! Positional parameters are matched in declaration order. Keyword
//! parameters accept `--name value` and `--name=value`. Boolean parameters
//! accept `yes/true/t/y/1` and `no/false/f/n/0` (any case); a bare `--name`
//! means true.
//!
//! # Example
//!
//! ```
//! use translator_module::core::types::ArgumentSet;
//! use translator_module::engine::params::{fold, parse_tokens, ParamSpec};
//!
//! let specs = vec![
//!     ParamSpec::positional("keyword", "keyword to read").required(),
//!     ParamSpec::keyword("timeout", "seconds to wait").float().default_value(2.0),
//! ];
//!
//! let explicit = parse_tokens("read", "", &specs, &["ITIME", "--timeout=5"]).unwrap();
//! let args = fold(&specs, ArgumentSet::new(), explicit).unwrap();
//! assert_eq!(args.str_arg("keyword").unwrap(), "ITIME");
//! assert_eq!(args.f64_arg("timeout").unwrap(), 5.0);
//! ```

use std::collections::BTreeSet;

use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, ColorChoice, Command};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::core::types::ArgumentSet;

/// Errors from token parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// `-h`/`--help` was among the tokens; carries the rendered help.
    #[error("help requested")]
    Help(String),

    /// The tokens do not fit the declared parameters.
    #[error("{0}")]
    Invalid(String),
}

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
}

impl ValueKind {
    fn value_name(&self) -> &'static str {
        match self {
            ValueKind::Str => "TEXT",
            ValueKind::Int => "INT",
            ValueKind::Float => "FLOAT",
            ValueKind::Bool => "BOOL",
        }
    }
}

/// How a parameter appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    Positional,
    Keyword,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub help: String,
    pub kind: ValueKind,
    pub style: ParamStyle,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    fn build(name: &str, help: &str, style: ParamStyle) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind: ValueKind::Str,
            style,
            required: false,
            default: None,
        }
    }

    /// A positional string parameter.
    pub fn positional(name: &str, help: &str) -> Self {
        Self::build(name, help, ParamStyle::Positional)
    }

    /// A `--name value` string parameter.
    pub fn keyword(name: &str, help: &str) -> Self {
        Self::build(name, help, ParamStyle::Keyword)
    }

    /// A `--name [BOOL]` parameter defaulting to false.
    pub fn flag(name: &str, help: &str) -> Self {
        Self::keyword(name, help).bool().default_value(false)
    }

    pub fn int(mut self) -> Self {
        self.kind = ValueKind::Int;
        self
    }

    pub fn float(mut self) -> Self {
        self.kind = ValueKind::Float;
        self
    }

    pub fn bool(mut self) -> Self {
        self.kind = ValueKind::Bool;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Parse a boolean the way operators type them.
pub fn parse_bool(text: &str) -> Result<bool, String> {
    match text.to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(format!("boolean value expected, got '{}'", text)),
    }
}

fn validate_specs(specs: &[ParamSpec]) -> Result<(), ParamError> {
    let mut seen = BTreeSet::new();
    for spec in specs {
        if spec.name.is_empty() || spec.name == "help" || spec.name.starts_with('-') {
            return Err(ParamError::Invalid(format!(
                "parameter name '{}' is reserved or invalid",
                spec.name
            )));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(ParamError::Invalid(format!(
                "parameter '{}' is declared twice",
                spec.name
            )));
        }
    }
    Ok(())
}

/// Build the parser for an operation.
///
/// Required-ness is not enforced here; [`fold`] checks it after base
/// arguments and defaults are applied.
pub fn command_for(name: &str, help: &str, specs: &[ParamSpec]) -> Command {
    let mut command = Command::new(name.to_string())
        .no_binary_name(true)
        .allow_negative_numbers(true)
        .disable_version_flag(true)
        .color(ColorChoice::Never);
    if !help.is_empty() {
        command = command.about(help.to_string());
    }

    let mut index = 0;
    for spec in specs {
        let mut arg = Arg::new(spec.name.clone())
            .help(spec.help.clone())
            .required(false)
            .action(ArgAction::Set);

        arg = match spec.style {
            ParamStyle::Positional => {
                index += 1;
                arg.index(index).value_name(spec.name.to_uppercase())
            }
            ParamStyle::Keyword => arg
                .long(spec.name.clone())
                .value_name(spec.kind.value_name()),
        };

        arg = match spec.kind {
            ValueKind::Str => arg.value_parser(value_parser!(String)),
            ValueKind::Int => arg.value_parser(value_parser!(i64)),
            ValueKind::Float => arg.value_parser(value_parser!(f64)),
            ValueKind::Bool => {
                let arg = arg.value_parser(parse_bool);
                if spec.style == ParamStyle::Keyword {
                    arg.num_args(0..=1).default_missing_value("true")
                } else {
                    arg
                }
            }
        };

        if let Some(default) = &spec.default {
            let shown = match default {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            arg = arg.help(format!("{} [default: {}]", spec.help, shown));
        }

        command = command.arg(arg);
    }
    command
}

/// Parse `tokens` against `specs`, returning only the values supplied.
///
/// # Errors
///
/// - `ParamError::Help` if `-h` or `--help` is present
/// - `ParamError::Invalid` for unknown options, surplus tokens or values of
///   the wrong type
pub fn parse_tokens<S: AsRef<str>>(
    name: &str,
    help: &str,
    specs: &[ParamSpec],
    tokens: &[S],
) -> Result<ArgumentSet, ParamError> {
    validate_specs(specs)?;
    let matches = command_for(name, help, specs)
        .try_get_matches_from(tokens.iter().map(|t| t.as_ref().to_string()))
        .map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp => ParamError::Help(e.render().to_string()),
            _ => ParamError::Invalid(e.render().to_string().trim().to_string()),
        })?;

    let mut args = ArgumentSet::new();
    for spec in specs {
        if let Some(value) = extract(&matches, spec)? {
            args.insert(spec.name.clone(), value);
        }
    }
    Ok(args)
}

fn extract(matches: &ArgMatches, spec: &ParamSpec) -> Result<Option<Value>, ParamError> {
    let id = spec.name.as_str();
    let value = match spec.kind {
        ValueKind::Str => matches.get_one::<String>(id).cloned().map(Value::String),
        ValueKind::Int => matches.get_one::<i64>(id).copied().map(Value::from),
        ValueKind::Bool => matches.get_one::<bool>(id).copied().map(Value::Bool),
        ValueKind::Float => match matches.get_one::<f64>(id) {
            Some(f) => Some(Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                ParamError::Invalid(format!("'{}' must be a finite number", spec.name))
            })?),
            None => None,
        },
    };
    Ok(value)
}

/// Layer `explicit` over `base`, fill defaults and check required
/// parameters.
///
/// # Errors
///
/// Returns `ParamError::Invalid` naming the first missing required
/// parameter.
pub fn fold(
    specs: &[ParamSpec],
    base: ArgumentSet,
    explicit: ArgumentSet,
) -> Result<ArgumentSet, ParamError> {
    let mut args = base;
    args.merge(explicit);
    for spec in specs {
        if let Some(default) = &spec.default {
            if !args.contains_key(&spec.name) {
                args.insert(spec.name.clone(), default.clone());
            }
        }
    }
    check_required(specs, &args)?;
    Ok(args)
}

/// Fail if a required parameter is absent.
pub fn check_required(specs: &[ParamSpec], args: &ArgumentSet) -> Result<(), ParamError> {
    match specs
        .iter()
        .find(|s| s.required && !args.contains_key(&s.name))
    {
        Some(spec) => Err(ParamError::Invalid(format!(
            "the following required argument was not provided: {}",
            spec.name
        ))),
        None => Ok(()),
    }
}

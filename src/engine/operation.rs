//! engine::operation
//!
//! The contract every translator operation implements.
//!
//! # Architecture
//!
//! An operation is a value implementing [`Operation`]. The engine drives its
//! three phases in order and owns the argument set each phase sees; a phase
//! may add keys to it but any change to a key the caller supplied fails the
//! run.
//!
//! Phases receive a [`PhaseContext`] carrying the logger and configuration
//! explicitly. Nothing is looked up from global state.
//!
//! # Example
//!
//! ```
//! use serde_json::Value;
//! use translator_module::core::types::ArgumentSet;
//! use translator_module::engine::{Operation, PhaseContext, PhaseError};
//!
//! struct Park;
//!
//! impl Operation for Park {
//!     fn precondition(
//!         &self,
//!         args: &mut ArgumentSet,
//!         _ctx: &PhaseContext,
//!     ) -> Result<(), PhaseError> {
//!         args.require("telescope")?;
//!         Ok(())
//!     }
//!
//!     fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext) -> Result<Value, PhaseError> {
//!         ctx.logger.info(&format!("parking {}", args.str_arg("telescope")?));
//!         Ok(Value::Bool(true))
//!     }
//!
//!     fn postcondition(
//!         &self,
//!         _args: &mut ArgumentSet,
//!         _ctx: &PhaseContext,
//!     ) -> Result<(), PhaseError> {
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::params::ParamSpec;
use crate::core::config::{Config, ConfigError};
use crate::core::types::{ArgsError, ArgumentSet};
use crate::keywords::KeywordError;

/// One step of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Precondition,
    Perform,
    Postcondition,
    Abort,
}

impl Phase {
    /// The three phases `execute` runs, in order.
    pub const EXECUTION: [Phase; 3] = [Phase::Precondition, Phase::Perform, Phase::Postcondition];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Precondition => "precondition",
            Phase::Perform => "perform",
            Phase::Postcondition => "postcondition",
            Phase::Abort => "abort",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a phase.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A condition the phase checks does not hold.
    #[error("{0}")]
    NotMet(String),

    /// A required argument is missing or has the wrong type.
    #[error(transparent)]
    Arguments(#[from] ArgsError),

    /// A required configuration value is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The keyword service failed or timed out.
    #[error(transparent)]
    Keyword(#[from] KeywordError),

    /// The phase observed an abort request and stopped.
    #[error("aborted on request")]
    Aborted,

    /// Anything else an operation wants to report.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhaseError {
    /// Shorthand for [`PhaseError::NotMet`].
    pub fn not_met(message: impl Into<String>) -> Self {
        PhaseError::NotMet(message.into())
    }

    /// Whether the failure was a keyword timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PhaseError::Keyword(e) if e.is_timeout())
    }
}

/// A named logging handle passed to every phase.
///
/// Records are emitted through `tracing` with the logger name attached, so
/// they inherit the surrounding `operation` span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: String,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(logger = %self.name, "{}", message);
    }

    pub fn info(&self, message: &str) {
        tracing::info!(logger = %self.name, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(logger = %self.name, "{}", message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(logger = %self.name, "{}", message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("translator")
    }
}

/// Collaborators handed to each phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    pub logger: &'a Logger,
    pub config: &'a Config,
}

/// A translator operation.
pub trait Operation: Send + Sync {
    /// One-line description shown in per-operation help.
    fn help(&self) -> &str {
        ""
    }

    /// Declared parameters, used to fold command-line tokens into arguments.
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Whether [`Operation::abort_execution`] may be called.
    fn abortable(&self) -> bool {
        false
    }

    /// Check that the operation can run. Fail with [`PhaseError::NotMet`]
    /// when it cannot.
    fn precondition(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>)
        -> Result<(), PhaseError>;

    /// Do the work. The returned value is the result of the run.
    fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError>;

    /// Verify the side effects of `perform`.
    fn postcondition(
        &self,
        args: &mut ArgumentSet,
        ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError>;

    /// Ask a running `perform` to stop. Only called when `abortable()` is
    /// true; the effect depends on whether `perform` polls for it.
    fn abort_execution(
        &self,
        _args: &ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        Err(PhaseError::not_met("operation has no abort routine"))
    }
}

//! engine
//!
//! Runs translator operations through their lifecycle:
//! Precondition -> Perform -> Postcondition.
//!
//! # Architecture
//!
//! - [`operation`] - The [`Operation`] trait, phases and phase errors
//! - [`params`] - Declared parameters and command-line token fold-in
//! - [`registry`] - Operations by path
//! - [`lifecycle`] - The state machine that drives one run
//! - [`abort`] - Cooperative abort flag
//!
//! The engine holds no process state. Everything a run needs, the logger and
//! the configuration, travels in a [`Context`] passed by the caller.
//!
//! # Invariants
//!
//! - Phases run in order and a failed phase stops the run
//! - Caller-supplied arguments are never altered or removed by a run
//! - Abort is forwarded only to operations that declare it
//!
//! # Example
//!
//! ```ignore
//! let ctx = Context::new(config).with_logger(Logger::new("mosfire"));
//! let operation = registry.get(&path).ok_or(...)?;
//! let outcome = lifecycle::execute(&path, operation.as_ref(), args, &ctx)?;
//! println!("{}", outcome.value);
//! ```

pub mod abort;
pub mod lifecycle;
pub mod operation;
pub mod params;
pub mod registry;

pub use abort::AbortSignal;
pub use lifecycle::{Arguments, FailureCause, LifecycleError, LifecycleState, Outcome};
pub use operation::{Logger, Operation, Phase, PhaseContext, PhaseError};
pub use params::{ParamError, ParamSpec, ParamStyle, ValueKind};
pub use registry::{Registry, RegistryError};

use crate::core::config::Config;

/// Execution context for operations.
///
/// Carries the collaborators every phase may use. Built once by the caller
/// and shared by all runs.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Logger handed to phases.
    pub logger: Logger,
    /// Merged configuration.
    pub config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            logger: Logger::default(),
            config,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Borrowed view handed to each phase.
    pub fn phase_context(&self) -> PhaseContext<'_> {
        PhaseContext {
            logger: &self.logger,
            config: &self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = Context::default();
            assert_eq!(ctx.logger.name(), "translator");
            assert!(ctx.config.sources().is_empty());
        }

        #[test]
        fn custom_values() {
            let config = Config::parse_str("[ob_keys]\na = \"b\"\n").unwrap();
            let ctx = Context::new(config.clone()).with_logger(Logger::new("kpf"));
            let phase = ctx.phase_context();
            assert_eq!(phase.logger.name(), "kpf");
            assert_eq!(phase.config, &config);
        }
    }
}

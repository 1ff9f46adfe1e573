//! engine::lifecycle
//!
//! The execution lifecycle: precondition, perform, postcondition.
//!
//! # Architecture
//!
//! ```text
//! Idle -> PreconditionRunning -> PerformRunning -> PostconditionRunning -> Done
//!              |                       |                     |
//!              +-----------------------+---------------------+--> Failed(phase, cause)
//! ```
//!
//! Before the first phase the engine normalizes the arguments into an
//! [`ArgumentSet`] it owns and takes a [`Snapshot`] of it. After every phase
//! the live set is compared against that snapshot. Keys the caller supplied
//! must survive unchanged; keys a phase adds are allowed.
//!
//! # Invariants
//!
//! - A phase runs only if every earlier phase succeeded and left the
//!   caller's keys intact
//! - Every failure names the phase it happened in
//! - `Failed` is absorbing: no further phase runs, and the error returned
//!   to the caller reports it through [`LifecycleError::state`]
//! - The caller's own values are never handed to a phase
//!
//! # Example
//!
//! ```
//! use serde_json::{json, Value};
//! use translator_module::core::types::{ArgumentSet, OperationPath};
//! use translator_module::engine::{lifecycle, Context, Operation, PhaseContext, PhaseError};
//!
//! struct Double;
//!
//! impl Operation for Double {
//!     fn precondition(&self, args: &mut ArgumentSet, _: &PhaseContext) -> Result<(), PhaseError> {
//!         args.i64_arg("n")?;
//!         Ok(())
//!     }
//!     fn perform(&self, args: &mut ArgumentSet, _: &PhaseContext) -> Result<Value, PhaseError> {
//!         Ok(json!(args.i64_arg("n")? * 2))
//!     }
//!     fn postcondition(&self, _: &mut ArgumentSet, _: &PhaseContext) -> Result<(), PhaseError> {
//!         Ok(())
//!     }
//! }
//!
//! let path = OperationPath::parse("math.double").unwrap();
//! let args: ArgumentSet = [("n", 21)].into_iter().collect();
//! let outcome = lifecycle::execute(&path, &Double, args, &Context::default()).unwrap();
//! assert_eq!(outcome.value, json!(42));
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::operation::{Operation, Phase, PhaseError};
use super::params::{self, ParamError};
use super::Context;
use crate::core::snapshot::{value_kind, ArgDiff, Snapshot, SnapshotError};
use crate::core::types::{ArgumentSet, OperationPath};

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The phase returned an error.
    Raised,
    /// The phase altered or removed a key the caller supplied.
    ArgumentsMutated,
}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    PreconditionRunning,
    PerformRunning,
    PostconditionRunning,
    Done,
    Failed { phase: Phase, cause: FailureCause },
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Failed { .. })
    }
}

/// Arguments as a caller may supply them.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// A ready mapping.
    Map(ArgumentSet),
    /// Command-line option tokens, folded in through the operation's
    /// declared parameters.
    Tokens(Vec<String>),
    /// Tokens layered over a base mapping (an OB or alias defaults).
    Overlay { base: ArgumentSet, tokens: Vec<String> },
    /// An untyped value; must be a mapping or a list of strings.
    Value(Value),
}

impl Arguments {
    /// Convert any serializable mapping, such as a request struct.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Snapshot` if the value is not a mapping of
    /// plain data.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, LifecycleError> {
        Ok(Arguments::Map(Snapshot::capture(value)?.to_arguments()))
    }
}

impl From<ArgumentSet> for Arguments {
    fn from(args: ArgumentSet) -> Self {
        Arguments::Map(args)
    }
}

impl From<&ArgumentSet> for Arguments {
    fn from(args: &ArgumentSet) -> Self {
        Arguments::Map(args.clone())
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Arguments::Map(ArgumentSet::from(map))
    }
}

impl From<Vec<String>> for Arguments {
    fn from(tokens: Vec<String>) -> Self {
        Arguments::Tokens(tokens)
    }
}

impl From<Value> for Arguments {
    fn from(value: Value) -> Self {
        Arguments::Value(value)
    }
}

/// Errors from running an operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The arguments have the wrong shape or do not fit the declared
    /// parameters. No phase ran.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tokens asked for help. No phase ran.
    #[error("help requested")]
    HelpRequested(String),

    /// A phase altered or removed caller-supplied arguments.
    #[error("arguments changed during {phase}: {diff}")]
    ArgumentsMutated { phase: Phase, diff: ArgDiff },

    /// A phase returned an error.
    #[error("{phase} failed: {source}")]
    PhaseFailed {
        phase: Phase,
        #[source]
        source: PhaseError,
    },

    #[error("operation '{0}' does not support abort")]
    AbortNotSupported(String),

    /// The arguments could not be turned into plain data.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl LifecycleError {
    /// The phase a failure happened in, if a phase ran.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LifecycleError::ArgumentsMutated { phase, .. }
            | LifecycleError::PhaseFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The absorbing state the run ended in, if a phase ran.
    pub fn state(&self) -> Option<LifecycleState> {
        match self {
            LifecycleError::PhaseFailed { phase, .. } => Some(LifecycleState::Failed {
                phase: *phase,
                cause: FailureCause::Raised,
            }),
            LifecycleError::ArgumentsMutated { phase, .. } => Some(LifecycleState::Failed {
                phase: *phase,
                cause: FailureCause::ArgumentsMutated,
            }),
            _ => None,
        }
    }

    /// Whether the failure was a keyword timeout inside a phase.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::PhaseFailed { source, .. } if source.is_timeout())
    }
}

impl From<ParamError> for LifecycleError {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::Help(text) => LifecycleError::HelpRequested(text),
            ParamError::Invalid(message) => LifecycleError::InvalidArguments(message),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Value returned by `perform`.
    pub value: Value,
    /// Keys the phases added to the working set.
    pub added_keys: Vec<String>,
    /// Every state the run passed through, `Idle` first.
    pub states: Vec<LifecycleState>,
    /// Fingerprint of the arguments as they entered the first phase.
    pub fingerprint: String,
}

struct Execution {
    states: Vec<LifecycleState>,
}

impl Execution {
    fn new() -> Self {
        Self {
            states: vec![LifecycleState::Idle],
        }
    }

    fn current(&self) -> LifecycleState {
        self.states
            .last()
            .copied()
            .unwrap_or(LifecycleState::Idle)
    }

    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(!self.current().is_terminal(), "transition out of a terminal state");
        tracing::debug!(from = ?self.current(), to = ?next, "lifecycle transition");
        self.states.push(next);
    }
}

/// Bring `args` into the mapping shape the phases see.
fn normalize(
    path: &OperationPath,
    operation: &dyn Operation,
    args: Arguments,
) -> Result<ArgumentSet, LifecycleError> {
    let (base, tokens) = match args {
        Arguments::Map(map) => return Ok(map),
        Arguments::Tokens(tokens) => (ArgumentSet::new(), tokens),
        Arguments::Overlay { base, tokens } => (base, tokens),
        Arguments::Value(Value::Object(map)) => return Ok(ArgumentSet::from(map)),
        Arguments::Value(Value::Array(items)) => {
            let tokens = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(LifecycleError::InvalidArguments(format!(
                        "option tokens must be strings, found {}",
                        value_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            (ArgumentSet::new(), tokens)
        }
        Arguments::Value(other) => {
            return Err(LifecycleError::InvalidArguments(format!(
                "arguments must be a mapping or a list of option tokens, found {}",
                value_kind(&other)
            )))
        }
    };

    let specs = operation.parameters();
    let explicit = params::parse_tokens(path.name(), operation.help(), &specs, &tokens)?;
    Ok(params::fold(&specs, base, explicit)?)
}

/// Check a phase result, then check the caller's keys.
fn guard<T>(
    phase: Phase,
    result: Result<T, PhaseError>,
    snapshot: &Snapshot,
    live: &ArgumentSet,
) -> Result<T, LifecycleError> {
    let value = result.map_err(|source| LifecycleError::PhaseFailed { phase, source })?;

    let diff = snapshot.diff_live(live);
    if !diff.is_empty() {
        return Err(LifecycleError::ArgumentsMutated { phase, diff });
    }
    Ok(value)
}

/// Log the failed state a guard error leaves the run in.
fn fail(err: LifecycleError, execution: &Execution) -> LifecycleError {
    let from = execution.current();
    match &err {
        LifecycleError::PhaseFailed { source, .. } => {
            tracing::error!(?from, to = ?err.state(), error = %source, "phase failed");
        }
        LifecycleError::ArgumentsMutated { diff, .. } => {
            tracing::error!(?from, to = ?err.state(), %diff, "arguments changed");
        }
        _ => {}
    }
    err
}

/// Run `operation` through all three phases.
///
/// # Errors
///
/// - `LifecycleError::InvalidArguments` / `HelpRequested` before any phase
/// - `LifecycleError::PhaseFailed` naming the phase that returned an error
/// - `LifecycleError::ArgumentsMutated` naming the phase that altered or
///   removed a caller-supplied key
pub fn execute(
    path: &OperationPath,
    operation: &dyn Operation,
    args: impl Into<Arguments>,
    ctx: &Context,
) -> Result<Outcome, LifecycleError> {
    let run = Uuid::new_v4();
    let span = tracing::info_span!("operation", op = %path, run = %run);
    let _entered = span.enter();

    let mut live = normalize(path, operation, args.into())?;
    let snapshot = Snapshot::of(&live);
    tracing::info!(
        arguments = snapshot.len(),
        fingerprint = %snapshot.fingerprint(),
        "executing"
    );

    let phase_ctx = ctx.phase_context();
    let mut execution = Execution::new();

    execution.advance(LifecycleState::PreconditionRunning);
    let result = operation.precondition(&mut live, &phase_ctx);
    guard(Phase::Precondition, result, &snapshot, &live).map_err(|e| fail(e, &execution))?;

    execution.advance(LifecycleState::PerformRunning);
    let result = operation.perform(&mut live, &phase_ctx);
    let value =
        guard(Phase::Perform, result, &snapshot, &live).map_err(|e| fail(e, &execution))?;

    execution.advance(LifecycleState::PostconditionRunning);
    let result = operation.postcondition(&mut live, &phase_ctx);
    guard(Phase::Postcondition, result, &snapshot, &live).map_err(|e| fail(e, &execution))?;

    execution.advance(LifecycleState::Done);
    tracing::info!("done");

    Ok(Outcome {
        value,
        added_keys: snapshot.added_keys(&live),
        states: execution.states,
        fingerprint: snapshot.fingerprint().to_string(),
    })
}

/// Forward an abort request to `operation`.
///
/// # Errors
///
/// - `LifecycleError::AbortNotSupported` if the operation is not abortable
/// - `LifecycleError::PhaseFailed` (phase `abort`) if its routine fails
pub fn abort(
    path: &OperationPath,
    operation: &dyn Operation,
    args: &ArgumentSet,
    ctx: &Context,
) -> Result<(), LifecycleError> {
    if !operation.abortable() {
        return Err(LifecycleError::AbortNotSupported(path.to_string()));
    }
    let span = tracing::info_span!("operation", op = %path, run = %Uuid::new_v4());
    let _entered = span.enter();
    tracing::warn!("abort requested");

    operation
        .abort_execution(args, &ctx.phase_context())
        .map_err(|source| LifecycleError::PhaseFailed {
            phase: Phase::Abort,
            source,
        })
}

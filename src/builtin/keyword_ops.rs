//! builtin::keyword_ops
//!
//! Generic keyword operations: `keywords.read`, `keywords.write` and
//! `keywords.waitfor`.
//!
//! Each talks to the shared [`KeywordService`]. Service timeouts propagate
//! unchanged as [`KeywordError::Timeout`] so callers can tell them apart
//! from other failures.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::core::types::ArgumentSet;
use crate::engine::{AbortSignal, Operation, ParamSpec, PhaseContext, PhaseError};
use crate::keywords::{KeywordError, KeywordService};

/// Per-call timeout when none is given.
pub const DEFAULT_TIMEOUT_SECS: f64 = 2.0;

/// Poll period of `keywords.waitfor` when `[waitfor] poll_interval_ms` is
/// not configured.
pub const DEFAULT_POLL_MS: u64 = 500;

fn target_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::positional("service", "keyword service").required(),
        ParamSpec::positional("keyword", "keyword name").required(),
    ]
}

fn timeout_param() -> ParamSpec {
    ParamSpec::keyword("timeout", "seconds to wait for the service")
        .float()
        .default_value(DEFAULT_TIMEOUT_SECS)
}

fn seconds(value: f64, key: &str) -> Result<Duration, PhaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PhaseError::not_met(format!(
            "{} must be a non-negative number of seconds",
            key
        )));
    }
    Duration::try_from_secs_f64(value).map_err(|_| {
        PhaseError::not_met(format!("{} of {} seconds is out of range", key, value))
    })
}

/// The instant `limit` after `started`, if representable.
fn deadline(started: DateTime<Utc>, limit: Duration) -> Result<DateTime<Utc>, PhaseError> {
    chrono::Duration::from_std(limit)
        .ok()
        .and_then(|delta| started.checked_add_signed(delta))
        .ok_or_else(|| PhaseError::not_met(format!("a timeout of {:?} is out of range", limit)))
}

/// Timeout argument, or the default when absent.
fn call_timeout(args: &ArgumentSet) -> Result<Duration, PhaseError> {
    if args.contains_key("timeout") {
        seconds(args.f64_arg("timeout")?, "timeout")
    } else {
        seconds(DEFAULT_TIMEOUT_SECS, "timeout")
    }
}

/// The string form a keyword value is written and compared in.
fn keyword_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `keywords.read SERVICE KEYWORD [--timeout S]`
pub struct ReadKeyword {
    service: Arc<dyn KeywordService>,
}

impl ReadKeyword {
    pub fn new(service: Arc<dyn KeywordService>) -> Self {
        Self { service }
    }
}

impl Operation for ReadKeyword {
    fn help(&self) -> &str {
        "Read a keyword"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        let mut params = target_params();
        params.push(timeout_param());
        params
    }

    fn precondition(
        &self,
        args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        args.str_arg("service")?;
        args.str_arg("keyword")?;
        call_timeout(args)?;
        Ok(())
    }

    fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let service = args.str_arg("service")?;
        let keyword = args.str_arg("keyword")?;
        let value = self.service.read(service, keyword, call_timeout(args)?)?;
        ctx.logger.info(&format!("{}.{} = {}", service, keyword, value));
        Ok(json!({ "service": service, "keyword": keyword, "value": value }))
    }

    fn postcondition(
        &self,
        _args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        Ok(())
    }
}

/// `keywords.write SERVICE KEYWORD VALUE [--timeout S]`
///
/// The postcondition reads the keyword back and fails if it does not hold
/// the written value.
pub struct WriteKeyword {
    service: Arc<dyn KeywordService>,
}

impl WriteKeyword {
    pub fn new(service: Arc<dyn KeywordService>) -> Self {
        Self { service }
    }
}

impl Operation for WriteKeyword {
    fn help(&self) -> &str {
        "Write a keyword and verify the readback"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        let mut params = target_params();
        params.push(ParamSpec::positional("value", "value to write").required());
        params.push(timeout_param());
        params
    }

    fn precondition(
        &self,
        args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        args.str_arg("service")?;
        args.str_arg("keyword")?;
        args.require("value")?;
        call_timeout(args)?;
        Ok(())
    }

    fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let service = args.str_arg("service")?;
        let keyword = args.str_arg("keyword")?;
        let value = keyword_text(args.require("value")?);
        ctx.logger.info(&format!("setting {}.{} = {}", service, keyword, value));
        self.service.write(service, keyword, &value, call_timeout(args)?)?;
        Ok(Value::String(value))
    }

    fn postcondition(
        &self,
        args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        let service = args.str_arg("service")?;
        let keyword = args.str_arg("keyword")?;
        let expected = keyword_text(args.require("value")?);
        let actual = self.service.read(service, keyword, call_timeout(args)?)?;
        if actual != expected {
            return Err(PhaseError::not_met(format!(
                "{}.{} reads back '{}', expected '{}'",
                service, keyword, actual, expected
            )));
        }
        Ok(())
    }
}

/// `keywords.waitfor SERVICE KEYWORD VALUE [--timeout S]`
///
/// Polls until the keyword equals `VALUE`. Without `--timeout` the limit
/// comes from `[waitfor] timeout`, and without `--poll_interval_ms` the
/// period comes from `[waitfor] poll_interval_ms`. Abortable:
/// `abort_execution` raises the signal the poll loop checks.
pub struct WaitForKeyword {
    service: Arc<dyn KeywordService>,
    signal: AbortSignal,
}

impl WaitForKeyword {
    pub fn new(service: Arc<dyn KeywordService>) -> Self {
        Self {
            service,
            signal: AbortSignal::new(),
        }
    }

    fn limit(&self, args: &ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Duration, PhaseError> {
        if args.contains_key("timeout") {
            return seconds(args.f64_arg("timeout")?, "timeout");
        }
        seconds(ctx.config.parsed::<f64>("waitfor", "timeout")?, "[waitfor] timeout")
    }

    fn poll_interval(
        &self,
        args: &ArgumentSet,
        ctx: &PhaseContext<'_>,
    ) -> Result<Duration, PhaseError> {
        if args.contains_key("poll_interval_ms") {
            let millis = args.i64_arg("poll_interval_ms")?;
            let millis = u64::try_from(millis).map_err(|_| {
                PhaseError::not_met("poll_interval_ms must be a non-negative number")
            })?;
            return Ok(Duration::from_millis(millis));
        }
        let millis = ctx
            .config
            .optional::<u64>("waitfor", "poll_interval_ms")?
            .unwrap_or(DEFAULT_POLL_MS);
        Ok(Duration::from_millis(millis))
    }
}

impl Operation for WaitForKeyword {
    fn help(&self) -> &str {
        "Wait until a keyword reaches a value"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        let mut params = target_params();
        params.push(ParamSpec::positional("value", "value to wait for").required());
        params.push(ParamSpec::keyword("timeout", "seconds before giving up").float());
        params.push(ParamSpec::keyword("poll_interval_ms", "milliseconds between reads").int());
        params
    }

    fn abortable(&self) -> bool {
        true
    }

    fn precondition(
        &self,
        args: &mut ArgumentSet,
        ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        args.str_arg("service")?;
        args.str_arg("keyword")?;
        args.require("value")?;
        deadline(Utc::now(), self.limit(args, ctx)?)?;
        self.poll_interval(args, ctx)?;
        self.signal.reset();
        Ok(())
    }

    fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        let service = args.str_arg("service")?;
        let keyword = args.str_arg("keyword")?;
        let expected = keyword_text(args.require("value")?);
        let limit = self.limit(args, ctx)?;
        let poll = self.poll_interval(args, ctx)?;

        let started = Utc::now();
        let deadline = deadline(started, limit)?;
        ctx.logger.debug(&format!("timeout is {:?}, giving up at {}", limit, deadline));

        loop {
            self.signal.check()?;
            let remaining = (deadline - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            let read_timeout = remaining.min(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS));
            let current = self.service.read(service, keyword, read_timeout)?;
            if current == expected {
                let waited = (Utc::now() - started).num_milliseconds();
                ctx.logger.info(&format!(
                    "{}.{} reached {} after {} ms",
                    service, keyword, expected, waited
                ));
                return Ok(json!({ "value": current, "waited_ms": waited }));
            }
            if remaining.is_zero() {
                return Err(KeywordError::Timeout {
                    service: service.to_string(),
                    keyword: keyword.to_string(),
                    timeout: limit,
                }
                .into());
            }
            thread::sleep(poll.min(remaining));
        }
    }

    fn postcondition(
        &self,
        _args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        Ok(())
    }

    fn abort_execution(
        &self,
        _args: &ArgumentSet,
        ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        ctx.logger.warn("stopping wait");
        self.signal.raise();
        Ok(())
    }
}

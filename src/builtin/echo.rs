//! builtin::echo
//!
//! `util.echo`: returns its arguments. Useful for checking how tokens, OBs
//! and aliases fold into an argument set.

use serde_json::Value;

use crate::core::types::ArgumentSet;
use crate::engine::{Operation, ParamSpec, PhaseContext, PhaseError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl Operation for Echo {
    fn help(&self) -> &str {
        "Print the arguments the operation receives"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::positional("message", "text to echo back")]
    }

    fn precondition(
        &self,
        _args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        Ok(())
    }

    fn perform(&self, args: &mut ArgumentSet, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        ctx.logger.debug(&format!("echoing {} argument(s)", args.len()));
        Ok(Value::from(args.clone()))
    }

    fn postcondition(
        &self,
        _args: &mut ArgumentSet,
        _ctx: &PhaseContext<'_>,
    ) -> Result<(), PhaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OperationPath;
    use crate::engine::{lifecycle, Context};
    use serde_json::json;

    #[test]
    fn echoes_message() {
        let path = OperationPath::parse("util.echo").unwrap();
        let args = vec!["hello".to_string()];
        let outcome = lifecycle::execute(&path, &Echo, args, &Context::default()).unwrap();
        assert_eq!(outcome.value, json!({"message": "hello"}));
    }

    #[test]
    fn echoes_mapping() {
        let path = OperationPath::parse("util.echo").unwrap();
        let args: ArgumentSet = [("exptime", json!(10)), ("object", json!("M31"))]
            .into_iter()
            .collect();
        let outcome = lifecycle::execute(&path, &Echo, args, &Context::default()).unwrap();
        assert_eq!(outcome.value, json!({"exptime": 10, "object": "M31"}));
    }
}

use crate::core::context::{Context, NodeValue};
use crate::core::contract::Breaches;
use crate::core::error::{StepError, StepResult};
use crate::core::hooks::Hooks;
use crate::core::Step;

/// How contract breaches surface to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Breaches fail the context with a `contract_failures` entry.
    Forgiving,
    /// Breaches are returned as [`StepError::ContractBreach`].
    Strict,
}

/// Runs steps against a context, checking contracts on the way in and out.
#[derive(Clone, Default)]
pub struct Executor {
    hooks: Hooks,
}

impl Executor {
    pub fn new(hooks: Hooks) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Forgiving invocation. A failed run still returns the context, check
    /// [`Context::is_failure`] to find out.
    pub fn call(&self, step: &Step, ctx: Context) -> Result<Context, StepError> {
        let mut ctx = ctx;
        match self.run(step, &mut ctx, Invocation::Forgiving) {
            Ok(_) => Ok(ctx),
            Err(e) if e.is_failure() => Ok(ctx),
            Err(e) => Err(e),
        }
    }

    /// Strict invocation. Breaches and failures come back as errors.
    pub fn call_strict(&self, step: &Step, ctx: Context) -> Result<Context, StepError> {
        let mut ctx = ctx;
        self.run(step, &mut ctx, Invocation::Strict)?;
        Ok(ctx)
    }

    /// Runs one step in place and returns its value.
    ///
    /// Chains run their children in order with the same mode and stop at the
    /// first failure. A chain's value is `null`.
    pub fn run(&self, step: &Step, ctx: &mut Context, mode: Invocation) -> StepResult {
        let breaches = step.contract().entry_breaches(ctx);
        if !breaches.is_empty() {
            return Err(self.breach(step, ctx, breaches, mode));
        }

        let value = match step {
            Step::Leaf(leaf) => {
                let invoker = Invoker::new(self, mode);
                leaf.behaviour().call(ctx, &invoker)?
            }
            Step::Chain(chain) => {
                for child in chain.children() {
                    self.run(child, ctx, mode)?;
                }
                NodeValue::Null
            }
        };

        if ctx.is_failure() {
            log::debug!("{} failed", step.name());
            return Err(StepError::Failed {
                step: step.name().to_string(),
            });
        }

        let breaches = step.contract().exit_breaches(ctx);
        if !breaches.is_empty() {
            return Err(self.breach(step, ctx, breaches, mode));
        }

        Ok(value)
    }

    fn breach(&self, step: &Step, ctx: &mut Context, breaches: Breaches, mode: Invocation) -> StepError {
        log::warn!("contract breach in {}: {:?}", step.name(), breaches);
        self.hooks.trigger_contract_breach(ctx, &breaches);

        let details = serde_json::to_value(&breaches).unwrap_or(NodeValue::Null);
        match mode {
            Invocation::Forgiving => {
                let mut failure = serde_json::Map::new();
                failure.insert("contract_failures".to_string(), details);
                ctx.fail(failure);
                StepError::Failed {
                    step: step.name().to_string(),
                }
            }
            Invocation::Strict => {
                let error = StepError::ContractBreach {
                    step: step.name().to_string(),
                    message: details.to_string(),
                    breaches,
                };
                self.hooks.trigger_before_raise(&error);
                error
            }
        }
    }
}

/// Handed to leaf logic so it can run other steps with the executor that is
/// running it.
pub struct Invoker<'a> {
    executor: &'a Executor,
    mode: Invocation,
}

impl<'a> Invoker<'a> {
    pub fn new(executor: &'a Executor, mode: Invocation) -> Self {
        Self { executor, mode }
    }

    pub fn mode(&self) -> Invocation {
        self.mode
    }

    pub fn executor(&self) -> &Executor {
        self.executor
    }

    /// The same executor, with strict semantics.
    pub fn strict(&self) -> Invoker<'a> {
        Invoker {
            executor: self.executor,
            mode: Invocation::Strict,
        }
    }

    pub fn invoke(&self, step: &Step, ctx: &mut Context) -> StepResult {
        self.executor.run(step, ctx, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hooks::BreachLog;
    use crate::core::step::leaf::Leaf;
    use serde_json::json;
    use std::sync::Arc;

    fn doubler() -> Step {
        Leaf::builder("Doubler")
            .expect(["number"])
            .promise(["doubled"])
            .call(|ctx| {
                let n = ctx.value("number").as_i64().unwrap_or_default();
                ctx.set("doubled", n * 2);
                Ok(NodeValue::Null)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_successful_run() {
        let ctx = Executor::default()
            .call(&doubler(), Context::from_json(json!({"number": 21})))
            .unwrap();
        assert!(ctx.is_success());
        assert_eq!(ctx.value("doubled"), json!(42));
    }

    #[test]
    fn test_forgiving_breach_fails_the_context() {
        let log = Arc::new(BreachLog::new());
        let executor = Executor::new(Hooks::recording(Arc::clone(&log)));

        let ctx = executor.call(&doubler(), Context::new()).unwrap();

        assert!(ctx.is_failure());
        assert_eq!(
            ctx.contract_failures(),
            Some(&json!({"number": ["number is missing"]}))
        );
        assert_eq!(log.breaches().len(), 1);
        assert!(log.raised().is_empty());
    }

    #[test]
    fn test_strict_breach_returns_error() {
        let log = Arc::new(BreachLog::new());
        let executor = Executor::new(Hooks::recording(Arc::clone(&log)));

        let err = executor
            .call_strict(&doubler(), Context::from_json(json!({"number": null})))
            .unwrap_err();

        assert_eq!(err.to_string(), r#"{"number":["number must be filled"]}"#);
        assert_eq!(log.breaches().len(), 1);
        assert_eq!(log.raised(), vec![err.to_string()]);
    }

    #[test]
    fn test_unkept_promise_is_a_breach() {
        let liar = Leaf::builder("Liar").promise(["thing"]).build().unwrap();
        let err = Executor::default().call_strict(&liar, Context::new()).unwrap_err();
        assert!(matches!(err, StepError::ContractBreach { ref step, .. } if step == "Liar"));
    }

    #[test]
    fn test_failing_logic_stops_with_failure() {
        let quitter = Leaf::builder("Quitter")
            .call(|ctx| {
                let mut details = serde_json::Map::new();
                details.insert("reason".into(), json!("nope"));
                ctx.fail(details);
                Ok(NodeValue::Null)
            })
            .build()
            .unwrap();

        let ctx = Executor::default().call(&quitter, Context::new()).unwrap();
        assert!(ctx.is_failure());
        assert_eq!(ctx.value("reason"), json!("nope"));

        let err = Executor::default().call_strict(&quitter, Context::new()).unwrap_err();
        assert!(err.is_failure());
    }
}

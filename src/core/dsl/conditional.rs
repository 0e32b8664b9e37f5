use crate::core::context::{Context, NodeValue};
use crate::core::error::StepResult;
use crate::core::executor::Invoker;
use crate::core::step::leaf::StepLogic;
use crate::core::Step;

use super::Condition;

/// Logic of a generated `If...` leaf.
pub struct Conditional {
    pub(crate) condition: Condition,
    pub(crate) then: Step,
    pub(crate) otherwise: Option<Step>,
}

impl Conditional {
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn then_branch(&self) -> &Step {
        &self.then
    }

    pub fn else_branch(&self) -> Option<&Step> {
        self.otherwise.as_ref()
    }
}

impl StepLogic for Conditional {
    fn call(&self, ctx: &mut Context, invoker: &Invoker<'_>) -> StepResult {
        let branch = if self.condition.evaluate(ctx, invoker)? {
            Some(&self.then)
        } else {
            self.otherwise.as_ref()
        };

        if let Some(branch) = branch {
            log::debug!("taking branch {}", branch.name());
            invoker.strict().invoke(branch, ctx)?;
        }
        Ok(NodeValue::Null)
    }
}

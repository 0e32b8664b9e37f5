use crate::core::context::{Context, NodeValue};
use crate::core::error::{StepError, StepResult};
use crate::core::executor::Invoker;
use crate::core::step::leaf::StepLogic;
use crate::core::Step;

/// Logic of a generated `Each...` leaf: runs the body once per element of
/// `plural`, with `singular` and `<singular>_index` bound for the duration.
/// Both bindings are absent afterwards, even if the caller had set them.
pub struct EachLoop {
    pub(crate) plural: String,
    pub(crate) singular: String,
    pub(crate) body: Vec<Step>,
}

impl EachLoop {
    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn singular(&self) -> &str {
        &self.singular
    }

    pub fn index_field(&self) -> String {
        format!("{}_index", self.singular)
    }

    pub fn body(&self) -> &[Step] {
        &self.body
    }

    fn run_body(&self, ctx: &mut Context, invoker: &Invoker<'_>, items: Vec<NodeValue>) -> Result<(), StepError> {
        let index_field = self.index_field();
        let strict = invoker.strict();

        for (index, item) in items.into_iter().enumerate() {
            ctx.set(self.singular.as_str(), item);
            ctx.set(index_field.as_str(), index);
            for step in &self.body {
                strict.invoke(step, ctx)?;
            }
        }
        Ok(())
    }
}

impl StepLogic for EachLoop {
    fn call(&self, ctx: &mut Context, invoker: &Invoker<'_>) -> StepResult {
        let items = match ctx.value(&self.plural) {
            NodeValue::Array(items) => items,
            other => {
                return Err(StepError::NotIterable {
                    field: self.plural.clone(),
                    value: other,
                })
            }
        };

        let outcome = self.run_body(ctx, invoker, items);

        ctx.remove(&self.singular);
        ctx.remove(&self.index_field());

        outcome.map(|_| NodeValue::Null)
    }
}

use std::any::Any;
use std::panic::Location;
use std::sync::Arc;

use crate::core::context::{Context, NodeValue};
use crate::core::contract::{Contract, FieldOptions};
use crate::core::dsl::Namespace;
use crate::core::error::{DefinitionError, StepResult};
use crate::core::executor::Invoker;
use crate::core::step::AsAny;
use crate::core::{SourceLocation, Step};

/// Defines the behaviour of a leaf step.
pub trait StepLogic: AsAny + Send + Sync + 'static {
    /// Runs the step against the context. The returned value is the step's
    /// result, which only matters when the step is used as a condition.
    fn call(&self, ctx: &mut Context, invoker: &Invoker<'_>) -> StepResult;
}

/// Adapter so plain closures can be leaf logic.
pub(crate) struct FnLogic<F>(pub(crate) F);

impl<F> StepLogic for FnLogic<F>
where
    F: Fn(&mut Context) -> StepResult + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut Context, _invoker: &Invoker<'_>) -> StepResult {
        (self.0)(ctx)
    }
}

/// A single executable unit with a contract and no children.
pub struct Leaf {
    pub(crate) name: String,
    pub(crate) contract: Contract,
    pub(crate) location: SourceLocation,
    pub(crate) synthetic: bool,
    pub(crate) behaviour: Box<dyn StepLogic>,
}

impl Leaf {
    /// Starts a standalone leaf that is not registered anywhere.
    #[track_caller]
    pub fn builder(name: impl Into<String>) -> LeafBuilder {
        LeafBuilder::new(name.into(), None, SourceLocation::from(Location::caller()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Whether the DSL generated this leaf rather than a user.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn behaviour(&self) -> &dyn StepLogic {
        &*self.behaviour
    }

    /// The logic as `&dyn Any`, for downcasting and type checks.
    pub fn logic_any(&self) -> &dyn Any {
        let behaviour: &dyn StepLogic = &*self.behaviour;
        behaviour.as_any()
    }

    pub fn logic<L: StepLogic>(&self) -> Option<&L> {
        self.logic_any().downcast_ref::<L>()
    }
}

/// Builder for user-defined leaves.
pub struct LeafBuilder {
    name: String,
    namespace: Option<Namespace>,
    location: SourceLocation,
    contract: Contract,
    behaviour: Option<Box<dyn StepLogic>>,
}

impl LeafBuilder {
    pub(crate) fn new(name: String, namespace: Option<Namespace>, location: SourceLocation) -> Self {
        Self {
            name,
            namespace,
            location,
            contract: Contract::new(),
            behaviour: None,
        }
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    pub fn expect<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contract = self.contract.expect(names);
        self
    }

    pub fn expect_with<I, S>(mut self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contract = self.contract.expect_with(names, options);
        self
    }

    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contract = self.contract.optional(names);
        self
    }

    pub fn promise<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contract = self.contract.promise(names);
        self
    }

    pub fn promise_with<I, S>(mut self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contract = self.contract.promise_with(names, options);
        self
    }

    pub fn logic<L: StepLogic>(mut self, logic: L) -> Self {
        self.behaviour = Some(Box::new(logic));
        self
    }

    /// Uses a closure as the logic. The closure's value is the step's result.
    pub fn call<F>(self, f: F) -> Self
    where
        F: Fn(&mut Context) -> StepResult + Send + Sync + 'static,
    {
        self.logic(FnLogic(f))
    }

    /// Checks the contract, builds the leaf, and registers it when the builder
    /// came from a namespace.
    pub fn build(self) -> Result<Step, DefinitionError> {
        self.contract.check(&self.name)?;

        let behaviour = self
            .behaviour
            .unwrap_or_else(|| Box::new(FnLogic(|_: &mut Context| -> StepResult { Ok(NodeValue::Null) })));

        let step = Step::Leaf(Arc::new(Leaf {
            name: self.name,
            contract: self.contract,
            location: self.location,
            synthetic: false,
            behaviour,
        }));

        match self.namespace {
            Some(namespace) => namespace.register(step),
            None => Ok(step),
        }
    }
}

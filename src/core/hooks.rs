use std::sync::{Arc, Mutex};

use crate::core::context::Context;
use crate::core::contract::Breaches;
use crate::core::error::{DefinitionError, StepError};

pub type BreachHook = Arc<dyn Fn(&Context, &Breaches) + Send + Sync>;
pub type RaiseHook = Arc<dyn Fn(&StepError) + Send + Sync>;
pub type DefinitionHook = Arc<dyn Fn(&DefinitionError) + Send + Sync>;

/// Observation points handed to a [`Namespace`](crate::Namespace) and an
/// [`Executor`](crate::Executor). Nothing here is process-wide.
#[derive(Clone, Default)]
pub struct Hooks {
    on_contract_breach: Option<BreachHook>,
    before_raise: Option<RaiseHook>,
    on_definition_error: Option<DefinitionHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every breach, before the forgiving/strict branch is taken.
    pub fn on_contract_breach(mut self, hook: impl Fn(&Context, &Breaches) + Send + Sync + 'static) -> Self {
        self.on_contract_breach = Some(Arc::new(hook));
        self
    }

    /// Called right before a strict invocation returns a breach error.
    pub fn before_raise(mut self, hook: impl Fn(&StepError) + Send + Sync + 'static) -> Self {
        self.before_raise = Some(Arc::new(hook));
        self
    }

    /// Redirects declaration mismatches away from the error channel.
    pub fn on_definition_error(mut self, hook: impl Fn(&DefinitionError) + Send + Sync + 'static) -> Self {
        self.on_definition_error = Some(Arc::new(hook));
        self
    }

    /// Records everything into `log`.
    pub fn recording(log: Arc<BreachLog>) -> Self {
        let breaches = Arc::clone(&log);
        let raised = Arc::clone(&log);
        let definitions = log;
        Self::new()
            .on_contract_breach(move |_, b| breaches.push_breach(b.clone()))
            .before_raise(move |e| raised.push_raised(e.to_string()))
            .on_definition_error(move |e| definitions.push_definition(e.clone()))
    }

    pub fn trigger_contract_breach(&self, ctx: &Context, breaches: &Breaches) {
        if let Some(hook) = &self.on_contract_breach {
            hook(ctx, breaches);
        }
    }

    pub fn trigger_before_raise(&self, error: &StepError) {
        if let Some(hook) = &self.before_raise {
            hook(error);
        }
    }

    /// Hands the error to the definition hook when one is set, otherwise returns it.
    pub fn route_definition_error(&self, error: DefinitionError) -> Result<(), DefinitionError> {
        match &self.on_definition_error {
            Some(hook) => {
                log::warn!("definition error redirected to handler: {}", error);
                hook(&error);
                Ok(())
            }
            None => Err(error),
        }
    }
}

/// Simple in-memory collector for hook events.
#[derive(Default)]
pub struct BreachLog {
    breaches: Mutex<Vec<Breaches>>,
    raised: Mutex<Vec<String>>,
    definitions: Mutex<Vec<DefinitionError>>,
}

impl BreachLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaches(&self) -> Vec<Breaches> {
        self.breaches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn raised(&self) -> Vec<String> {
        self.raised.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn definition_errors(&self) -> Vec<DefinitionError> {
        self.definitions.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn push_breach(&self, breaches: Breaches) {
        if let Ok(mut all) = self.breaches.lock() {
            all.push(breaches);
        }
    }

    fn push_raised(&self, message: String) {
        if let Ok(mut all) = self.raised.lock() {
            all.push(message);
        }
    }

    fn push_definition(&self, error: DefinitionError) {
        if let Ok(mut all) = self.definitions.lock() {
            all.push(error);
        }
    }
}

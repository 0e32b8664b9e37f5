use std::collections::{HashMap, HashSet};
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::context::{Context, NodeValue};
use crate::core::contract::{Contract, FieldOptions};
use crate::core::error::{DefinitionError, StepResult};
use crate::core::hooks::Hooks;
use crate::core::step::chain::{Chain, ChainBuilder};
use crate::core::step::leaf::{FnLogic, Leaf, LeafBuilder, StepLogic};
use crate::core::{SourceLocation, Step};

use super::conditional::Conditional;
use super::each::EachLoop;
use super::inflect::{camelize, singularize};
use super::{Condition, Link};

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    records: HashMap<String, Step>,
    /// Every name handed out or registered. Generated names for unregistered
    /// lambdas live here too.
    reserved: HashSet<String>,
}

#[derive(Default)]
struct Registry {
    state: RwLock<RegistryState>,
    counter: AtomicUsize,
    hooks: Hooks,
}

/// The arena every step is registered into.
///
/// A namespace is cheap to clone. [`Namespace::scope`] returns a view that
/// prefixes names with `Outer::` and shares the same registry, counter, and
/// hooks.
#[derive(Clone, Default)]
pub struct Namespace {
    inner: Arc<Registry>,
    path: Option<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: Hooks) -> Self {
        Self {
            inner: Arc::new(Registry {
                hooks,
                ..Registry::default()
            }),
            path: None,
        }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    /// The `Outer::Inner` prefix of this view, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn scope(&self, name: &str) -> Namespace {
        self.at(self.qualify(name))
    }

    fn at(&self, path: String) -> Namespace {
        Namespace {
            inner: Arc::clone(&self.inner),
            path: Some(path),
        }
    }

    fn qualify(&self, name: &str) -> String {
        match &self.path {
            Some(path) => format!("{path}::{name}"),
            None => name.to_string(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Looks a step up by its fully qualified name.
    pub fn get(&self, name: &str) -> Option<Step> {
        self.read().records.get(name).cloned()
    }

    /// All registered steps, in registration order.
    pub fn steps(&self) -> Vec<Step> {
        let state = self.read();
        state
            .order
            .iter()
            .filter_map(|name| state.records.get(name).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register(&self, step: Step) -> Result<Step, DefinitionError> {
        let mut state = self.write();
        let name = step.name().to_string();
        if state.records.contains_key(&name) {
            return Err(DefinitionError::DuplicateName(name));
        }

        log::debug!("registering {:?} at {}", step, step.location());
        state.reserved.insert(name.clone());
        state.order.push(name.clone());
        state.records.insert(name, step.clone());
        Ok(step)
    }

    /// Generates a name no other step of the registry has or will get.
    ///
    /// The prefix alone is tried first, then `prefix_<n>` with the registry's
    /// counter. With `camelize`, `A::B` collapses to `AB`, otherwise to `A__B`.
    pub fn unique_name(&self, prefix: &str, camelize: bool) -> String {
        let separator = if camelize { "" } else { "__" };
        let base = self.qualify(&prefix.replace("::", separator));

        let mut state = self.write();
        let mut candidate = base.clone();
        while state.reserved.contains(&candidate) {
            log::debug!("{candidate} is taken");
            let n = self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1;
            candidate = format!("{base}_{n}");
        }
        state.reserved.insert(candidate.clone());
        candidate
    }

    /// Starts a leaf registered under `name` in this namespace.
    #[track_caller]
    pub fn leaf(&self, name: &str) -> LeafBuilder {
        LeafBuilder::new(
            self.qualify(name),
            Some(self.clone()),
            SourceLocation::from(Location::caller()),
        )
    }

    /// Starts an organizer registered under `name` in this namespace.
    #[track_caller]
    pub fn organizer(&self, name: &str) -> ChainBuilder {
        ChainBuilder::new(
            self.qualify(name),
            self.clone(),
            SourceLocation::from(Location::caller()),
        )
    }

    /// Builds and registers a chain under a collision-free version of `name`,
    /// optionally requiring `required` fields.
    #[track_caller]
    pub fn chain<I, L>(&self, name: &str, links: I, required: &[&str]) -> Result<Step, DefinitionError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        let name = self.unique_name(name, true);
        let links: Vec<Link> = links.into_iter().map(Into::into).collect();
        let contract = Contract::new().expect(required.iter().copied());
        let location = SourceLocation::from(Location::caller());
        self.build_chain(name, contract, links, location, false)
    }

    fn build_chain(
        &self,
        name: String,
        contract: Contract,
        links: Vec<Link>,
        location: SourceLocation,
        synthetic: bool,
    ) -> Result<Step, DefinitionError> {
        contract.check(&name)?;
        let children = self.compose_all(links)?;
        self.register(Step::Chain(Arc::new(Chain {
            name,
            contract,
            location,
            synthetic,
            children,
        })))
    }

    fn register_synthetic_leaf(
        &self,
        name: String,
        contract: Contract,
        behaviour: Box<dyn StepLogic>,
    ) -> Result<Step, DefinitionError> {
        self.register(Step::Leaf(Arc::new(Leaf {
            name,
            contract,
            location: SourceLocation::Inferred,
            synthetic: true,
            behaviour,
        })))
    }

    /// Compiles a conditional into a registered `If<Condition>` leaf.
    ///
    /// Only a field condition becomes a requirement of the leaf, and it need
    /// not be filled: `false` is a perfectly good flag. Branches given as
    /// lists become chains named `If<Condition>IsTruthy` and
    /// `If<Condition>IsFalsey`, scoped under the leaf's name.
    pub fn when(
        &self,
        condition: impl Into<Condition>,
        then: impl Into<Link>,
        otherwise: Option<Link>,
    ) -> Result<Step, DefinitionError> {
        let condition = condition.into();
        let base = format!("If{}", condition.label());
        let name = self.unique_name(&base, true);
        let scope = self.at(name.clone());

        let then = scope.compile_branch(then.into(), &format!("{base}IsTruthy"))?;
        let otherwise = otherwise
            .map(|link| scope.compile_branch(link, &format!("{base}IsFalsey")))
            .transpose()?;

        let contract = match condition.field() {
            Some(field) => Contract::new().expect_with([field], FieldOptions::unfilled()),
            None => Contract::new(),
        };

        self.register_synthetic_leaf(
            name,
            contract,
            Box::new(Conditional {
                condition,
                then,
                otherwise,
            }),
        )
    }

    fn compile_branch(&self, link: Link, name: &str) -> Result<Step, DefinitionError> {
        match link {
            Link::Chain(links) if links.len() > 1 => {
                let name = self.unique_name(name, true);
                self.build_chain(name, Contract::new(), links, SourceLocation::Inferred, true)
            }
            other => self.compose(other),
        }
    }

    /// Compiles a loop over `plural` into a registered `Each<Singular>` leaf.
    ///
    /// The element is bound to the singular of `plural`, so a field whose
    /// singular is the same word (`series`) is rejected.
    pub fn each<I, L>(&self, plural: &str, body: I) -> Result<Step, DefinitionError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        let singular = singularize(plural);
        if singular == plural {
            return Err(DefinitionError::UncountableCollection(plural.to_string()));
        }
        let name = self.unique_name(&format!("Each{}", camelize(&singular)), true);
        let body = self.compose_all(body.into_iter().map(Into::into).collect())?;

        self.register_synthetic_leaf(
            name,
            Contract::new().expect_with([plural], FieldOptions::unfilled()),
            Box::new(EachLoop {
                plural: plural.to_string(),
                singular,
                body,
            }),
        )
    }

    /// Registers a leaf around a closure whose return value is the step's value.
    /// Handy as an `if` condition.
    pub fn interactify<F>(&self, name: &str, f: F) -> Result<Step, DefinitionError>
    where
        F: Fn(&mut Context) -> NodeValue + Send + Sync + 'static,
    {
        self.register_synthetic_leaf(
            self.qualify(name),
            Contract::new(),
            Box::new(FnLogic(move |ctx: &mut Context| -> StepResult { Ok(f(ctx)) })),
        )
    }

    /// Normalizes one link into a step.
    pub fn compose(&self, link: Link) -> Result<Step, DefinitionError> {
        match link {
            Link::Step(step) => Ok(step),
            Link::Lambda(f) => {
                let name = self.unique_name("Lambda", true);
                Ok(Step::Leaf(Arc::new(Leaf {
                    name,
                    contract: Contract::new(),
                    location: SourceLocation::Inferred,
                    synthetic: true,
                    behaviour: Box::new(FnLogic(move |ctx: &mut Context| f(ctx))),
                })))
            }
            Link::Conditional {
                condition,
                then,
                otherwise,
            } => match then {
                Some(then) => self.when(condition, *then, otherwise.map(|o| *o)),
                None => Err(DefinitionError::MissingBranch(format!("If{}", condition.label()))),
            },
            Link::Chain(mut links) => match links.len() {
                0 => Err(DefinitionError::InvalidLink("an empty list".to_string())),
                1 => self.compose(links.remove(0)),
                _ => {
                    let name = self.unique_name("Chained", true);
                    self.build_chain(name, Contract::new(), links, SourceLocation::Inferred, true)
                }
            },
        }
    }

    pub fn compose_all(&self, links: Vec<Link>) -> Result<Vec<Step>, DefinitionError> {
        links.into_iter().map(|link| self.compose(link)).collect()
    }

    /// Asserts that `step` promises exactly `keys`, in any order.
    pub fn promising(&self, step: &Step, keys: &[&str]) -> Result<(), DefinitionError> {
        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let mut actual: Vec<String> = step
            .contract()
            .promised_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        expected.sort();
        actual.sort();

        if expected == actual {
            return Ok(());
        }
        self.hooks().route_definition_error(DefinitionError::MismatchingPromise {
            step: step.name().to_string(),
            expected,
            actual,
        })
    }

    /// Asserts that `step` organizes exactly `children`, in order.
    pub fn organizing(&self, step: &Step, children: &[Step]) -> Result<(), DefinitionError> {
        let actual = step.children();
        let matches = actual.len() == children.len()
            && actual.iter().zip(children).all(|(a, b)| a.ptr_eq(b));

        if matches {
            return Ok(());
        }
        self.hooks().route_definition_error(DefinitionError::MismatchingOrganizer {
            step: step.name().to_string(),
            expected: children.iter().map(|s| s.name().to_string()).collect(),
            actual: actual.iter().map(|s| s.name().to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hooks::BreachLog;

    #[test]
    fn test_unique_name_is_deterministic_and_never_repeats() {
        let ns = Namespace::new();
        assert_eq!(ns.unique_name("IfFlag", true), "IfFlag");
        assert_eq!(ns.unique_name("IfFlag", true), "IfFlag_1");
        assert_eq!(ns.unique_name("IfFlag", true), "IfFlag_2");
    }

    #[test]
    fn test_unique_name_avoids_registered_steps() {
        let ns = Namespace::new();
        ns.leaf("Chained").build().unwrap();
        assert_eq!(ns.unique_name("Chained", true), "Chained_1");
    }

    #[test]
    fn test_unique_name_separators() {
        let ns = Namespace::new();
        assert_eq!(ns.unique_name("Whatever::Something", true), "WhateverSomething");
        assert_eq!(ns.unique_name("Whatever::Something", false), "Whatever__Something");
    }

    #[test]
    fn test_scoped_names() {
        let ns = Namespace::new();
        let billing = ns.scope("Billing");
        let step = billing.leaf("Charge").build().unwrap();
        assert_eq!(step.name(), "Billing::Charge");
        assert!(ns.get("Billing::Charge").is_some());
        assert_eq!(billing.unique_name("Lambda", true), "Billing::Lambda");
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let ns = Namespace::new();
        ns.leaf("One").build().unwrap();
        let err = ns.leaf("One").build().unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateName("One".into()));
    }

    #[test]
    fn test_compose_rejects_empty_lists_and_missing_branches() {
        let ns = Namespace::new();
        assert!(matches!(
            ns.compose(Link::Chain(vec![])),
            Err(DefinitionError::InvalidLink(_))
        ));

        let dangling = Link::Conditional {
            condition: Condition::from("flag"),
            then: None,
            otherwise: None,
        };
        assert_eq!(
            ns.compose(dangling).unwrap_err(),
            DefinitionError::MissingBranch("IfFlag".into())
        );
    }

    #[test]
    fn test_single_element_list_degenerates() {
        let ns = Namespace::new();
        let one = ns.leaf("One").build().unwrap();
        let composed = ns.compose(Link::chain([one.clone()])).unwrap();
        assert!(composed.ptr_eq(&one));
    }

    #[test]
    fn test_lists_become_chained_steps() {
        let ns = Namespace::new();
        let one = ns.leaf("One").build().unwrap();
        let two = ns.leaf("Two").build().unwrap();

        let chained = ns.compose(Link::chain([one, two])).unwrap();
        assert_eq!(chained.name(), "Chained");
        assert!(chained.is_synthetic());
        assert_eq!(chained.children().len(), 2);
        assert!(ns.get("Chained").is_some());
    }

    #[test]
    fn test_when_names_and_contract() {
        let ns = Namespace::new();
        let a = ns.leaf("A").build().unwrap();
        let b = ns.leaf("B").build().unwrap();

        let first = ns.when("flag", Link::chain([a.clone(), b.clone()]), None).unwrap();
        let second = ns.when("flag", a.clone(), Some(b.clone().into())).unwrap();

        assert_eq!(first.name(), "IfFlag");
        assert_eq!(second.name(), "IfFlag_1");
        assert!(ns.get("IfFlag::IfFlagIsTruthy").is_some());
        assert_eq!(first.contract().expected_keys(), vec!["flag"]);
        assert!(!first.contract().required_fields()[0].filled);

        let proc = ns.when(Condition::predicate(|_| true), a, None).unwrap();
        assert_eq!(proc.name(), "IfProc");
        assert!(proc.contract().is_empty());
    }

    #[test]
    fn test_each_names_and_uncountable_fields() {
        let ns = Namespace::new();
        let each = ns.each("people", Vec::<Link>::new()).unwrap();
        assert_eq!(each.name(), "EachPerson");
        assert_eq!(ns.each("statuses", Vec::<Link>::new()).unwrap().name(), "EachStatus");

        let err = ns.each("series", Vec::<Link>::new()).unwrap_err();
        assert_eq!(err, DefinitionError::UncountableCollection("series".into()));
        assert!(ns.get("EachSeries").is_none());
    }

    #[test]
    fn test_promising_mismatch() {
        let ns = Namespace::new();
        let step = ns.leaf("Promiser").promise(["b", "a"]).build().unwrap();

        assert!(ns.promising(&step, &["a", "b"]).is_ok());
        let err = ns.promising(&step, &["a"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Promiser does not promise:\n[\"a\"]\nActual promises are:\n[\"a\", \"b\"]"
        );
    }

    #[test]
    fn test_organizing_mismatch_is_routed_to_handler() {
        let log = Arc::new(BreachLog::new());
        let ns = Namespace::with_hooks(Hooks::recording(Arc::clone(&log)));
        let a = ns.leaf("A").build().unwrap();
        let b = ns.leaf("B").build().unwrap();
        let organizer = ns.organizer("Outer").organize([a.clone()]).build().unwrap();

        assert!(ns.organizing(&organizer, &[a.clone()]).is_ok());
        assert!(ns.organizing(&organizer, &[a, b]).is_ok());

        let errors = log.definition_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Outer does not organize:\n[\"A\", \"B\"]\nActual organized steps are:\n[\"A\"]\nExtra steps are:\n[\"B\"]"
        );
    }
}

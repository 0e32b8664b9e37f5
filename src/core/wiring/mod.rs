//! Static wiring validation.
//!
//! Every user-declared chain is walked depth first, children in declaration
//! order, while a [`ValidationState`] accumulates the fields promised so far.
//! A required field that is not available when its step is reached is a
//! [`Violation`]. Nothing runs; only contracts are read.

pub mod discovery;
pub mod ignore;
pub mod report;
pub mod state;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::core::dsl::Namespace;
use crate::core::Step;

pub use discovery::{DeclarationRecord, Discovery};
pub use ignore::Ignore;
pub use state::{ValidationState, Violation};

type Lookup = HashMap<String, DeclarationRecord>;

/// Validator entry point: the namespace to check plus run options.
pub struct Wiring {
    namespace: Namespace,
    ignore: Ignore,
    initial_fields: Vec<String>,
    root: Option<PathBuf>,
    component_folders: Option<Vec<String>>,
}

impl Wiring {
    pub fn new(namespace: &Namespace) -> Self {
        Self {
            namespace: namespace.clone(),
            ignore: Ignore::Nothing,
            initial_fields: Vec::new(),
            root: None,
            component_folders: None,
        }
    }

    pub fn ignore(mut self, ignore: impl Into<Ignore>) -> Self {
        self.ignore = ignore.into();
        self
    }

    /// Fields supplied from outside, available to every root.
    pub fn initial_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn component_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.component_folders = Some(folders.into_iter().map(Into::into).collect());
        self
    }

    /// A fresh discovery for one run.
    pub fn discovery(&self) -> Discovery {
        let mut discovery = Discovery::new(&self.namespace);
        if let Some(root) = &self.root {
            discovery = discovery.root(root.clone());
        }
        if let Some(folders) = &self.component_folders {
            discovery = discovery.component_folders(folders.clone());
        }
        discovery
    }

    /// Validates every user-declared chain and renders the report. Empty when
    /// the wiring is sound.
    pub fn validate_app(&self) -> String {
        let violations = self.violations();
        report::format_report(&violations, &self.ignore)
    }

    /// All violations of all roots, ignored roots skipped, in discovery order.
    pub fn violations(&self) -> Vec<Violation> {
        let discovery = self.discovery();
        let lookup = discovery.lookup_table();

        let mut violations = Vec::new();
        for record in discovery.organizers() {
            if self.ignore.matches(&record.step) {
                log::debug!("skipping ignored root {}", record.step.name());
                continue;
            }
            let state = self.walk(&record.step, &lookup);
            log::info!(
                "validated {}: {} violation(s)",
                record.step.name(),
                state.violations().len()
            );
            violations.extend(state.into_violations());
        }
        violations
    }

    /// Validates a single root, returning the final state.
    pub fn validate_root(&self, root: &Step) -> ValidationState {
        let lookup = self.discovery().lookup_table();
        self.walk(root, &lookup)
    }

    fn walk(&self, root: &Step, lookup: &Lookup) -> ValidationState {
        let mut state = ValidationState::seeded(self.initial_fields.iter().cloned());
        state.make_available(root.contract().expected_keys());

        if root.is_chain() {
            visit_chain(root, root, &mut state, lookup);
        } else {
            visit_leaf(root, root, &mut state);
        }
        state
    }
}

/// Validates every user-declared chain of `namespace`.
pub fn validate(namespace: &Namespace, ignore: impl Into<Ignore>) -> String {
    Wiring::new(namespace).ignore(ignore).validate_app()
}

fn is_registered(step: &Step, lookup: &Lookup) -> bool {
    lookup
        .get(step.name())
        .is_some_and(|record| record.step.ptr_eq(step))
}

fn visit_chain(chain: &Step, called_by: &Step, state: &mut ValidationState, lookup: &Lookup) {
    let own: Vec<&str> = chain.contract().forwarded_keys();
    let produced = produced_by_children(chain, lookup);
    let unkept: Vec<String> = own
        .iter()
        .filter(|field| !produced.contains(**field))
        .map(|field| field.to_string())
        .collect();
    state.record(chain, called_by, unkept);
    state.make_available(own);

    for child in chain.children() {
        if child.is_chain() && is_registered(child, lookup) {
            visit_chain(child, chain, state, lookup);
        } else {
            visit_leaf(child, chain, state);
        }
    }

    let missing = state.missing(chain.contract().expected_keys());
    state.record(chain, called_by, missing);
}

fn visit_leaf(leaf: &Step, called_by: &Step, state: &mut ValidationState) {
    let missing = state.missing(leaf.contract().expected_keys());
    state.record(leaf, called_by, missing);
    state.make_available(leaf.contract().forwarded_keys());
}

/// Forwarded promises of the descendants a walk of `chain` would visit.
fn produced_by_children<'a>(chain: &'a Step, lookup: &Lookup) -> BTreeSet<&'a str> {
    let mut produced = BTreeSet::new();
    for child in chain.children() {
        produced.extend(child.contract().forwarded_keys());
        if child.is_chain() && is_registered(child, lookup) {
            produced.extend(produced_by_children(child, lookup));
        }
    }
    produced
}

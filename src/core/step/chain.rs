use std::sync::Arc;

use crate::core::contract::{Contract, FieldOptions};
use crate::core::dsl::{Link, Namespace};
use crate::core::error::DefinitionError;
use crate::core::{SourceLocation, Step};

/// An ordered sequence of child steps. Order is execution order, and the
/// order in which fields become available to later children.
pub struct Chain {
    pub(crate) name: String,
    pub(crate) contract: Contract,
    pub(crate) location: SourceLocation,
    pub(crate) synthetic: bool,
    pub(crate) children: Vec<Step>,
}

impl Chain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn children(&self) -> &[Step] {
        &self.children
    }
}

/// Builder for organizers: a contract plus the list of organized links.
///
/// Obtained from [`Namespace::organizer`]; chains always live in a namespace
/// since the links they organize may generate steps of their own.
pub struct ChainBuilder {
    name: String,
    namespace: Namespace,
    location: SourceLocation,
    contract: Contract,
    links: Vec<Link>,
}

impl ChainBuilder {
    pub(crate) fn new(name: String, namespace: Namespace, location: SourceLocation) -> Self {
        Self {
            name,
            namespace,
            location,
            contract: Contract::new(),
            links: Vec::new(),
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

    /// Appends links to the organized list, in order.
    pub fn organize<I, L>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        self.links.extend(links.into_iter().map(Into::into));
        self
    }

    /// Compiles the links eagerly, then builds and registers the chain.
    pub fn build(self) -> Result<Step, DefinitionError> {
        self.contract.check(&self.name)?;
        let children = self.namespace.compose_all(self.links)?;

        let step = Step::Chain(Arc::new(Chain {
            name: self.name,
            contract: self.contract,
            location: self.location,
            synthetic: false,
            children,
        }));

        self.namespace.register(step)
    }
}

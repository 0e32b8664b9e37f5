pub mod context;
pub mod contract;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod hooks;
#[cfg(feature = "jobs")]
pub mod jobs;
pub mod step;
pub mod wiring;

use std::fmt;
use std::sync::Arc;

use contract::Contract;
use step::chain::Chain;
use step::leaf::Leaf;
pub use step::SourceLocation;

/// The general step enum: every node of a graph is a leaf or a chain.
///
/// Cloning is cheap, both variants are reference counted. Two clones of the
/// same step are the same node ([`Step::ptr_eq`]).
#[derive(Clone)]
pub enum Step {
    Leaf(Arc<Leaf>),
    Chain(Arc<Chain>),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Leaf(leaf) => &leaf.name,
            Step::Chain(chain) => &chain.name,
        }
    }

    pub fn contract(&self) -> &Contract {
        match self {
            Step::Leaf(leaf) => &leaf.contract,
            Step::Chain(chain) => &chain.contract,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Step::Leaf(leaf) => &leaf.location,
            Step::Chain(chain) => &chain.location,
        }
    }

    /// Children in execution order. Leaves have none.
    pub fn children(&self) -> &[Step] {
        match self {
            Step::Leaf(_) => &[],
            Step::Chain(chain) => &chain.children,
        }
    }

    pub fn is_chain(&self) -> bool {
        matches!(self, Step::Chain(_))
    }

    pub fn is_synthetic(&self) -> bool {
        match self {
            Step::Leaf(leaf) => leaf.synthetic,
            Step::Chain(chain) => chain.synthetic,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Step::Leaf(leaf) => Some(leaf),
            Step::Chain(_) => None,
        }
    }

    pub fn as_chain(&self) -> Option<&Chain> {
        match self {
            Step::Leaf(_) => None,
            Step::Chain(chain) => Some(chain),
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Step) -> bool {
        match (self, other) {
            (Step::Leaf(a), Step::Leaf(b)) => Arc::ptr_eq(a, b),
            (Step::Chain(a), Step::Chain(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Leaf(leaf) => write!(f, "Leaf({})", leaf.name),
            Step::Chain(chain) => write!(f, "Chain({})", chain.name),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

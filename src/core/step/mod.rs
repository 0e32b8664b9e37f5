//! Leaves and chains, the two kinds of node a step graph is made of.
//!
//! - [`Leaf`] and [`StepLogic`] for single units of work
//! - [`Chain`] for ordered sequences of steps
//! - [`SourceLocation`] for attributing a step to the code that declared it

pub mod chain;
pub mod leaf;

use std::any::Any;
use std::fmt;
use std::panic::Location;

/// A helper trait that just provides the `as_any` method.
/// Needed for type checks on leaf logic (ignore predicates, downcasting in tests).
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Where a step was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLocation {
    Declared { file: String, line: u32 },
    /// Generated by the DSL, no user code to point at.
    Inferred,
}

impl SourceLocation {
    pub fn file(&self) -> Option<&str> {
        match self {
            SourceLocation::Declared { file, .. } => Some(file),
            SourceLocation::Inferred => None,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            SourceLocation::Declared { line, .. } => Some(*line),
            SourceLocation::Inferred => None,
        }
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        SourceLocation::Declared {
            file: location.file().to_string(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Declared { file, line } => write!(f, "{file}:{line}"),
            SourceLocation::Inferred => write!(f, "(inferred)"),
        }
    }
}

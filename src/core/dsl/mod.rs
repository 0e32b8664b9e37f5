//! The composition DSL.
//!
//! A [`Namespace`] compiles [`Link`]s into registered steps the moment an
//! organizer is declared:
//! - a [`Step`] is used as is
//! - a lambda becomes a generated leaf
//! - a conditional becomes an `If...` leaf (see [`Namespace::when`])
//! - a list becomes a generated `Chained` chain, unless it has one element
//!
//! [`Namespace::each`] generates `Each...` leaves that run a body once per
//! element of a context field.

pub mod conditional;
pub mod each;
pub mod inflect;
pub mod namespace;

use std::fmt;
use std::sync::Arc;

use crate::core::context::Context;
use crate::core::error::{StepError, StepResult};
use crate::core::executor::Invoker;
use crate::core::Step;

pub use conditional::Conditional;
pub use each::EachLoop;
pub use namespace::Namespace;

pub type Lambda = Arc<dyn Fn(&mut Context) -> StepResult + Send + Sync>;
pub type Predicate = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// One element of an organized list, before compilation.
#[derive(Clone)]
pub enum Link {
    Step(Step),
    Lambda(Lambda),
    Conditional {
        condition: Condition,
        then: Option<Box<Link>>,
        otherwise: Option<Box<Link>>,
    },
    Chain(Vec<Link>),
}

impl Link {
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> StepResult + Send + Sync + 'static,
    {
        Link::Lambda(Arc::new(f))
    }

    pub fn when(condition: impl Into<Condition>, then: impl Into<Link>) -> Self {
        Link::Conditional {
            condition: condition.into(),
            then: Some(Box::new(then.into())),
            otherwise: None,
        }
    }

    pub fn when_else(condition: impl Into<Condition>, then: impl Into<Link>, otherwise: impl Into<Link>) -> Self {
        Link::Conditional {
            condition: condition.into(),
            then: Some(Box::new(then.into())),
            otherwise: Some(Box::new(otherwise.into())),
        }
    }

    pub fn chain<I, L>(links: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        Link::Chain(links.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Step(step) => write!(f, "{step:?}"),
            Link::Lambda(_) => f.write_str("Lambda"),
            Link::Conditional { condition, then, otherwise } => f
                .debug_struct("Conditional")
                .field("condition", condition)
                .field("then", then)
                .field("otherwise", otherwise)
                .finish(),
            Link::Chain(links) => f.debug_list().entries(links).finish(),
        }
    }
}

impl From<Step> for Link {
    fn from(step: Step) -> Self {
        Link::Step(step)
    }
}

impl From<&Step> for Link {
    fn from(step: &Step) -> Self {
        Link::Step(step.clone())
    }
}

impl From<Vec<Link>> for Link {
    fn from(links: Vec<Link>) -> Self {
        Link::Chain(links)
    }
}

impl From<Vec<Step>> for Link {
    fn from(steps: Vec<Step>) -> Self {
        Link::chain(steps)
    }
}

/// What an `if` looks at. The variant is fixed when the conditional is compiled.
#[derive(Clone)]
pub enum Condition {
    /// Truthiness of a context field.
    Field(String),
    /// A closure over the context.
    Predicate(Predicate),
    /// Truthiness of the value a step returns.
    Step(Step),
}

impl Condition {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(f))
    }

    /// The fragment used in generated names: `IfFlag`, `IfProc`, `IfIsAdmin`.
    pub fn label(&self) -> String {
        match self {
            Condition::Field(field) => inflect::camelize(field),
            Condition::Predicate(_) => "Proc".to_string(),
            Condition::Step(step) => step.name().replace("::", ""),
        }
    }

    /// The field the generated leaf requires, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Condition::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn evaluate(&self, ctx: &mut Context, invoker: &Invoker<'_>) -> Result<bool, StepError> {
        match self {
            Condition::Field(field) => Ok(ctx.is_truthy(field)),
            Condition::Predicate(predicate) => Ok(predicate(ctx)),
            Condition::Step(step) => {
                let value = invoker.invoke(step, ctx)?;
                Ok(crate::core::context::is_truthy(&value))
            }
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Field(field) => write!(f, "Field({field})"),
            Condition::Predicate(_) => f.write_str("Predicate"),
            Condition::Step(step) => write!(f, "Step({})", step.name()),
        }
    }
}

impl From<&str> for Condition {
    fn from(field: &str) -> Self {
        Condition::Field(field.to_string())
    }
}

impl From<String> for Condition {
    fn from(field: String) -> Self {
        Condition::Field(field)
    }
}

impl From<Step> for Condition {
    fn from(step: Step) -> Self {
        Condition::Step(step)
    }
}

impl From<&Step> for Condition {
    fn from(step: &Step) -> Self {
        Condition::Step(step.clone())
    }
}

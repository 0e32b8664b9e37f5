use thiserror::Error;

use crate::core::context::NodeValue;
use crate::core::contract::Breaches;

/// Configuration errors raised while a graph is being declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("conditional `{0}` must have at least a condition and a then-branch")]
    MissingBranch(String),

    #[error("cannot compose {0}: expected a step, a lambda, a conditional or a non-empty chain")]
    InvalidLink(String),

    #[error("invalid contract shorthand `{input}`: {reason}")]
    InvalidShorthand { input: String, reason: String },

    #[error("{step} declares {fields:?} as both required and optional")]
    OverlappingFields { step: String, fields: Vec<String> },

    #[error("{step} does not promise:\n{expected:?}\nActual promises are:\n{actual:?}")]
    MismatchingPromise {
        step: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("{}", mismatching_organizer_message(.step, .expected, .actual))]
    MismatchingOrganizer {
        step: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("cannot loop over `{0}`: its singular form is the same word")]
    UncountableCollection(String),

    #[error("a step named `{0}` is already registered")]
    DuplicateName(String),

    #[error("invalid job option keys: {0:?}")]
    InvalidJobOptions(Vec<String>),
}

fn mismatching_organizer_message(step: &str, expected: &[String], actual: &[String]) -> String {
    let missing: Vec<&String> = actual.iter().filter(|s| !expected.contains(s)).collect();
    let extra: Vec<&String> = expected.iter().filter(|s| !actual.contains(s)).collect();

    let mut sections = Vec::new();
    if !missing.is_empty() {
        sections.push(format!("Missing steps are:\n{missing:?}"));
    }
    if !extra.is_empty() {
        sections.push(format!("Extra steps are:\n{extra:?}"));
    }

    let mut message = format!(
        "{step} does not organize:\n{expected:?}\nActual organized steps are:\n{actual:?}"
    );
    if !sections.is_empty() {
        message.push('\n');
        message.push_str(&sections.join("\n\n"));
    }
    message
}

/// Errors raised while a chain is executing.
#[derive(Debug, Error)]
pub enum StepError {
    /// The context was failed; forgiving invocations swallow this one.
    #[error("{step} failed")]
    Failed { step: String },

    /// Raised by strict invocations. The message is the JSON form of the breaches.
    #[error("{message}")]
    ContractBreach {
        step: String,
        breaches: Breaches,
        message: String,
    },

    #[error("Expected `context.{field}`: {value}\nto be an ordered collection")]
    NotIterable { field: String, value: NodeValue },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("{step}: {message}")]
    Custom { step: String, message: String },
}

impl StepError {
    pub fn custom(step: impl Into<String>, message: impl Into<String>) -> Self {
        StepError::Custom {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepError::Failed { .. })
    }
}

pub type StepResult = Result<NodeValue, StepError>;

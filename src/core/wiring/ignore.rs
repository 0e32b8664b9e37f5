use std::any::Any;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::core::step::leaf::StepLogic;
use crate::core::Step;

/// Which steps the validator should leave out of its report.
#[derive(Clone, Default)]
pub enum Ignore {
    #[default]
    Nothing,
    /// Any of the nested predicates.
    Any(Vec<Ignore>),
    /// Matched against the fully qualified name.
    Pattern(Regex),
    /// Substring of the fully qualified name.
    Name(String),
    Predicate(Arc<dyn Fn(&Step) -> bool + Send + Sync>),
    /// Leaves whose logic has a given type.
    Type(fn(&dyn Any) -> bool),
}

impl Ignore {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Step) -> bool + Send + Sync + 'static,
    {
        Ignore::Predicate(Arc::new(f))
    }

    pub fn of_type<L: StepLogic>() -> Self {
        Ignore::Type(|logic| logic.is::<L>())
    }

    pub fn matches(&self, step: &Step) -> bool {
        match self {
            Ignore::Nothing => false,
            Ignore::Any(all) => all.iter().any(|ignore| ignore.matches(step)),
            Ignore::Pattern(regex) => regex.is_match(step.name()),
            Ignore::Name(fragment) => step.name().contains(fragment.as_str()),
            Ignore::Predicate(f) => f(step),
            Ignore::Type(is) => step.as_leaf().is_some_and(|leaf| is(leaf.logic_any())),
        }
    }
}

impl fmt::Debug for Ignore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignore::Nothing => f.write_str("Nothing"),
            Ignore::Any(all) => f.debug_tuple("Any").field(all).finish(),
            Ignore::Pattern(regex) => write!(f, "Pattern({})", regex.as_str()),
            Ignore::Name(fragment) => write!(f, "Name({fragment})"),
            Ignore::Predicate(_) => f.write_str("Predicate"),
            Ignore::Type(_) => f.write_str("Type"),
        }
    }
}

impl From<Regex> for Ignore {
    fn from(regex: Regex) -> Self {
        Ignore::Pattern(regex)
    }
}

impl From<&str> for Ignore {
    fn from(fragment: &str) -> Self {
        Ignore::Name(fragment.to_string())
    }
}

impl From<String> for Ignore {
    fn from(fragment: String) -> Self {
        Ignore::Name(fragment)
    }
}

impl<T: Into<Ignore>> From<Vec<T>> for Ignore {
    fn from(all: Vec<T>) -> Self {
        Ignore::Any(all.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{Context, NodeValue};
    use crate::core::error::StepResult;
    use crate::core::executor::Invoker;
    use crate::core::step::leaf::Leaf;

    struct Legacy;

    impl StepLogic for Legacy {
        fn call(&self, _ctx: &mut Context, _invoker: &Invoker<'_>) -> StepResult {
            Ok(NodeValue::Null)
        }
    }

    #[test]
    fn test_each_variant() {
        let legacy = Leaf::builder("Billing::Legacy").logic(Legacy).build().unwrap();
        let modern = Leaf::builder("Billing::Modern").build().unwrap();

        let by_regex = Ignore::from(Regex::new("^Billing::L").unwrap());
        assert!(by_regex.matches(&legacy));
        assert!(!by_regex.matches(&modern));

        assert!(Ignore::from("Legacy").matches(&legacy));
        assert!(!Ignore::from("Legacy").matches(&modern));

        let by_predicate = Ignore::predicate(|step| step.name().ends_with("Modern"));
        assert!(by_predicate.matches(&modern));

        let by_type = Ignore::of_type::<Legacy>();
        assert!(by_type.matches(&legacy));
        assert!(!by_type.matches(&modern));

        assert!(!Ignore::Nothing.matches(&legacy));
    }

    #[test]
    fn test_lists_are_ored() {
        let legacy = Leaf::builder("Legacy").build().unwrap();
        let ignore = Ignore::from(vec!["Nope", "Legacy"]);
        assert!(ignore.matches(&legacy));
        assert!(!Ignore::from(Vec::<&str>::new()).matches(&legacy));
    }
}

use std::collections::BTreeSet;

use crate::core::Step;

/// A required field nothing upstream provides.
#[derive(Debug, Clone)]
pub struct Violation {
    /// The step whose requirement is unmet.
    pub step: Step,
    /// The nearest enclosing chain.
    pub called_by: Step,
    /// Missing field names, in declaration order.
    pub missing: Vec<String>,
}

impl Violation {
    fn same_pair(&self, step: &Step, called_by: &Step) -> bool {
        self.step.ptr_eq(step) && self.called_by.ptr_eq(called_by)
    }
}

/// The accumulator of one root validation.
///
/// Availability only grows: nothing ever removes a field from
/// [`ValidationState::available`].
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    available: BTreeSet<String>,
    violations: Vec<Violation>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self::new();
        state.make_available(fields);
        state
    }

    pub fn make_available<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available.extend(fields.into_iter().map(Into::into));
    }

    pub fn is_available(&self, field: &str) -> bool {
        self.available.contains(field)
    }

    pub fn available(&self) -> &BTreeSet<String> {
        &self.available
    }

    /// The fields of `required` that are not available yet.
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        required
            .into_iter()
            .filter(|field| !self.is_available(field))
            .map(str::to_string)
            .collect()
    }

    /// Records missing fields against a (step, called by) pair, merging with
    /// an earlier record of the same pair.
    pub fn record(&mut self, step: &Step, called_by: &Step, missing: Vec<String>) {
        if missing.is_empty() {
            return;
        }

        match self.violations.iter_mut().find(|v| v.same_pair(step, called_by)) {
            Some(existing) => {
                for field in missing {
                    if !existing.missing.contains(&field) {
                        existing.missing.push(field);
                    }
                }
            }
            None => self.violations.push(Violation {
                step: step.clone(),
                called_by: called_by.clone(),
                missing,
            }),
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::leaf::Leaf;

    #[test]
    fn test_missing_respects_declaration_order() {
        let state = ValidationState::seeded(["b"]);
        assert_eq!(state.missing(["c", "b", "a"]), vec!["c", "a"]);
    }

    #[test]
    fn test_records_merge_per_pair() {
        let step = Leaf::builder("Step").build().unwrap();
        let outer = Leaf::builder("Outer").build().unwrap();

        let mut state = ValidationState::new();
        state.record(&step, &outer, vec!["a".into()]);
        state.record(&step, &outer, vec!["a".into(), "b".into()]);
        state.record(&step, &step, vec![]);

        assert_eq!(state.violations().len(), 1);
        assert_eq!(state.violations()[0].missing, vec!["a", "b"]);
    }
}

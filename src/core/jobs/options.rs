use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::context::NodeValue;
use crate::core::dsl::inflect::camelize;
use crate::core::error::DefinitionError;

/// The only option keys a job accepts.
pub const VALID_KEYS: [&str; 6] = ["queue", "retry", "dead", "backtrace", "pool", "tags"];

/// Queue options attached to every job a [`JobMaker`](super::JobMaker) enqueues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions(BTreeMap<String, NodeValue>);

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from a JSON object, rejecting unknown keys all at once.
    pub fn from_json(value: NodeValue) -> Result<Self, DefinitionError> {
        let map = match value {
            NodeValue::Object(map) => map,
            NodeValue::Null => return Ok(Self::new()),
            other => return Err(DefinitionError::InvalidJobOptions(vec![other.to_string()])),
        };

        let invalid: Vec<String> = map
            .keys()
            .filter(|key| !VALID_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(DefinitionError::InvalidJobOptions(invalid));
        }
        Ok(Self(map.into_iter().collect()))
    }

    pub fn with(mut self, key: &str, value: impl Into<NodeValue>) -> Result<Self, DefinitionError> {
        if !VALID_KEYS.contains(&key) {
            return Err(DefinitionError::InvalidJobOptions(vec![key.to_string()]));
        }
        self.0.insert(key.to_string(), value.into());
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `__Key_Value` for every option, sorted by key. Empty without options.
    pub fn suffix(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    NodeValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("__{}_{}", camelize(key), camelize(&value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suffix_is_sorted_and_camelized() {
        let options = JobOptions::from_json(json!({"retry": 3, "queue": "low_priority"})).unwrap();
        assert_eq!(options.suffix(), "__Queue_LowPriority__Retry_3");
        assert_eq!(JobOptions::new().suffix(), "");
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let err = JobOptions::from_json(json!({"queue": "low", "colour": "red", "size": 1})).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::InvalidJobOptions(vec!["colour".into(), "size".into()])
        );

        assert!(JobOptions::new().with("queue", "low").is_ok());
        assert!(JobOptions::new().with("priority", 1).is_err());
    }
}

use std::collections::HashMap;

/// The Alias for serde_json::Value since every context value is one
pub type NodeValue = serde_json::Value;

/// Only `null` and `false` are falsy.
pub fn is_truthy(value: &NodeValue) -> bool {
    !matches!(value, NodeValue::Null | NodeValue::Bool(false))
}

/// A value is filled when it is present and not blank.
pub fn is_filled(value: &NodeValue) -> bool {
    match value {
        NodeValue::Null => false,
        NodeValue::String(s) => !s.is_empty(),
        NodeValue::Array(items) => !items.is_empty(),
        NodeValue::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// The mutable key/value bag threaded through every step of a chain.
///
/// A context starts out successful. Once [`Context::fail`] is called it stays
/// failed, and the executor stops the chain after the current step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, NodeValue>,
    failed: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a JSON object. Non-object values yield an empty context.
    pub fn from_json(value: NodeValue) -> Self {
        match value {
            NodeValue::Object(map) => map.into_iter().collect::<HashMap<_, _>>().into(),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.values.get(key)
    }

    /// Returns a clone of the value under `key`, or `null` when absent.
    pub fn value(&self, key: &str) -> NodeValue {
        self.values.get(key).cloned().unwrap_or(NodeValue::Null)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<NodeValue>) -> Option<NodeValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_truthy(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(is_truthy)
    }

    /// Marks the context as failed, merging `details` into the bag.
    pub fn fail(&mut self, details: serde_json::Map<String, NodeValue>) {
        self.values.extend(details);
        self.failed = true;
    }

    pub fn is_success(&self) -> bool {
        !self.failed
    }

    pub fn is_failure(&self) -> bool {
        self.failed
    }

    /// The breach details recorded by a forgiving invocation, if any.
    pub fn contract_failures(&self) -> Option<&NodeValue> {
        self.values.get("contract_failures")
    }

    /// Copies the listed keys that are present into a JSON object.
    pub fn slice<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> serde_json::Map<String, NodeValue> {
        keys.into_iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    pub fn as_map(&self) -> &HashMap<String, NodeValue> {
        &self.values
    }

    pub fn into_map(self) -> HashMap<String, NodeValue> {
        self.values
    }
}

impl From<HashMap<String, NodeValue>> for Context {
    fn from(values: HashMap<String, NodeValue>) -> Self {
        Self {
            values,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_null_and_false_are_falsy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!(0)));
        assert!(is_truthy(&json!("")));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn test_filled_rejects_blank_values() {
        assert!(!is_filled(&json!(null)));
        assert!(!is_filled(&json!("")));
        assert!(!is_filled(&json!([])));
        assert!(!is_filled(&json!({})));
        assert!(is_filled(&json!(false)));
        assert!(is_filled(&json!([1])));
    }

    #[test]
    fn test_fail_merges_details() {
        let mut ctx = Context::from_json(json!({"a": 1}));
        assert!(ctx.is_success());

        let mut details = serde_json::Map::new();
        details.insert("contract_failures".into(), json!({"b": ["b is missing"]}));
        ctx.fail(details);

        assert!(ctx.is_failure());
        assert_eq!(ctx.value("a"), json!(1));
        assert_eq!(ctx.contract_failures(), Some(&json!({"b": ["b is missing"]})));
    }

    #[test]
    fn test_slice_skips_absent_keys() {
        let ctx = Context::from_json(json!({"a": 1, "b": 2}));
        let sliced = ctx.slice(["a", "c"]);
        assert_eq!(NodeValue::Object(sliced), json!({"a": 1}));
    }
}

use indexmap::IndexMap;
use weft_core::stmt::{Value, ValueRecord};

/// Values produced by the steps of a plan, by step name, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    values: IndexMap<String, Value>,
}

impl Results {
    pub fn get(&self, step: &str) -> Option<&Value> {
        self.values.get(step)
    }

    /// The record produced by `step`, if it produced one.
    pub fn record(&self, step: &str) -> Option<&ValueRecord> {
        self.get(step)?.as_record()
    }

    /// The records produced by `step` when it was a read.
    pub fn records(&self, step: &str) -> Vec<&ValueRecord> {
        self.get(step)
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_record).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, step: &str) -> bool {
        self.values.contains_key(step)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, step: String, value: Value) {
        self.values.insert(step, value);
    }
}

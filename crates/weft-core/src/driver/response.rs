use crate::stmt::{Value, ValueRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result, one value per row
    Values(Vec<Value>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn values(values: Vec<Value>) -> Self {
        Self {
            rows: Rows::Values(values),
        }
    }

    pub fn record(record: ValueRecord) -> Self {
        Self::values(vec![Value::Record(record)])
    }

    pub fn empty() -> Self {
        Self::values(vec![])
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    #[track_caller]
    pub fn into_count(self) -> u64 {
        match self {
            Rows::Count(count) => count,
            _ => panic!("expected count; rows={self:#?}"),
        }
    }

    /// Row values. A count response yields no rows.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Values(values) => values,
            Self::Count(_) => vec![],
        }
    }

    /// The rows as records, skipping anything that is not one.
    pub fn into_records(self) -> Vec<ValueRecord> {
        self.into_values()
            .into_iter()
            .filter_map(|value| match value {
                Value::Record(record) => Some(record),
                _ => None,
            })
            .collect()
    }
}

use super::{Action, Changeset, FieldError};

use indexmap::IndexMap;
use regex::Regex;
use std::{
    fmt,
    ops::{Bound, RangeBounds},
    sync::Arc,
};
use weft_core::stmt::Value;

type Validator = Arc<dyn Fn(Changeset) -> Changeset + Send + Sync>;

/// Validators applied in declaration order.
#[derive(Clone, Default)]
pub struct Pipeline {
    validators: Vec<Validator>,
}

/// Proposed values handed to [`validate`].
#[derive(Debug, Clone)]
pub enum Input {
    /// Untrusted input, cast field by field. Only `permitted` keys are read.
    Raw {
        params: serde_json::Value,
        permitted: Vec<String>,
    },

    /// In-memory values, type checked but not coerced
    Trusted(IndexMap<String, Value>),

    /// Validate the changeset as it is
    None,
}

impl Input {
    pub fn raw<S: AsRef<str>>(params: serde_json::Value, permitted: &[S]) -> Input {
        Input::Raw {
            params,
            permitted: permitted.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn trusted<I, K, V>(values: I) -> Input
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Input::Trusted(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a validated changeset: stages `input` on `base`, checks the
/// model's required fields, then runs `pipeline`.
pub fn validate(base: Changeset, input: Input, pipeline: &Pipeline) -> Changeset {
    let changeset = match input {
        Input::Raw { params, permitted } => match params {
            serde_json::Value::Object(params) => base.cast(&params, permitted.as_slice()),
            _ => base.add_error("base", FieldError::cast("expected an object")),
        },
        Input::Trusted(values) => values
            .into_iter()
            .fold(base, |changeset, (field, value)| {
                changeset.put_change(&field, value)
            }),
        Input::None => base,
    };

    if changeset.action() == Action::Delete {
        return changeset;
    }

    let required: Vec<String> = changeset
        .model()
        .primitives()
        .filter(|field| field.required && field.auto.is_none())
        .map(|field| field.name.clone())
        .collect();

    pipeline.run(changeset.validate_required(required.as_slice()))
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Appends a validator.
    pub fn then(mut self, validator: impl Fn(Changeset) -> Changeset + Send + Sync + 'static) -> Pipeline {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn run(&self, changeset: Changeset) -> Changeset {
        self.validators
            .iter()
            .fold(changeset, |changeset, validator| validator(changeset))
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Changeset {
    /// Adds `can't be blank` to every listed field that is `Null` or a blank
    /// string once changes are applied. Fields with a cast error, and foreign
    /// keys waiting for a parent key, are skipped.
    pub fn validate_required<S: AsRef<str>>(mut self, fields: &[S]) -> Changeset {
        for name in fields {
            let name = name.as_ref();

            if self.has_cast_error(name) || self.is_deferred(name) {
                continue;
            }

            let Some(field) = self.field(name) else {
                self = self.add_error(name, FieldError::cast("unknown field"));
                continue;
            };

            let present = if field.is_relation() {
                !self.nested(name).is_empty()
                    || match self.value_at(field.id.index) {
                        Value::Null => false,
                        Value::List(items) => !items.is_empty(),
                        _ => true,
                    }
            } else {
                !is_blank(self.value_at(field.id.index))
            };

            if !present {
                self = self.add_error(name, FieldError::validation("can't be blank"));
            }
        }

        self
    }

    /// Checks the character count of a string change.
    pub fn validate_length(self, field: &str, range: impl RangeBounds<usize>) -> Changeset {
        self.validate_change(field, |value| {
            let len = value.as_str()?.chars().count();

            if let Some(min) = lower(range.start_bound()) {
                if len < min {
                    return Some(format!("should be at least {min} character(s)"));
                }
            }

            match range.end_bound() {
                Bound::Included(max) if len > *max => {
                    Some(format!("should be at most {max} character(s)"))
                }
                Bound::Excluded(max) if len >= *max => Some(format!(
                    "should be at most {} character(s)",
                    max.saturating_sub(1)
                )),
                _ => None,
            }
        })
    }

    /// Checks that an integer change falls in `range`.
    pub fn validate_number(self, field: &str, range: impl RangeBounds<i64>) -> Changeset {
        self.validate_change(field, |value| {
            let n = value.as_i64()?;

            match range.start_bound() {
                Bound::Included(min) if n < *min => {
                    return Some(format!("must be greater than or equal to {min}"))
                }
                Bound::Excluded(min) if n <= *min => {
                    return Some(format!("must be greater than {min}"))
                }
                _ => {}
            }

            match range.end_bound() {
                Bound::Included(max) if n > *max => {
                    Some(format!("must be less than or equal to {max}"))
                }
                Bound::Excluded(max) if n >= *max => Some(format!("must be less than {max}")),
                _ => None,
            }
        })
    }

    /// Checks that a change is one of `values`.
    pub fn validate_inclusion(self, field: &str, values: &[Value]) -> Changeset {
        self.validate_change(field, |value| {
            (!values.contains(value)).then(|| "is invalid".to_string())
        })
    }

    /// Checks that a change is none of `values`.
    pub fn validate_exclusion(self, field: &str, values: &[Value]) -> Changeset {
        self.validate_change(field, |value| {
            values.contains(value).then(|| "is reserved".to_string())
        })
    }

    /// Checks a string change against `regex`.
    pub fn validate_format(self, field: &str, regex: &Regex) -> Changeset {
        self.validate_change(field, |value| {
            let s = value.as_str()?;
            (!regex.is_match(s)).then(|| "has invalid format".to_string())
        })
    }

    /// Runs `check` on the staged change for `field`, recording the message
    /// it returns. Skipped when the field has no change, the change is
    /// `Null`, or the field already has a cast error.
    pub fn validate_change(
        self,
        field: &str,
        check: impl FnOnce(&Value) -> Option<String>,
    ) -> Changeset {
        if self.has_cast_error(field) {
            return self;
        }

        let message = match self.get_change(field) {
            Some(value) if !value.is_null() => check(value),
            _ => None,
        };

        match message {
            Some(message) => self.add_error(field, FieldError::validation(message)),
            None => self,
        }
    }

    /// Runs `check` on the whole changeset unconditionally. It returns
    /// `(field, message)` pairs to record.
    pub fn validate_with(self, check: impl FnOnce(&Changeset) -> Vec<(String, String)>) -> Changeset {
        let errors = check(&self);

        errors
            .into_iter()
            .fold(self, |changeset, (field, message)| {
                changeset.add_error(&field, FieldError::validation(message))
            })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn lower(bound: Bound<&usize>) -> Option<usize> {
    match bound {
        Bound::Included(min) => Some(*min),
        Bound::Excluded(min) => Some(min + 1),
        Bound::Unbounded => None,
    }
}

use super::{Changeset, FieldError};

use serde_json::Value as Json;
use weft_core::stmt::{Type, Value};

impl Changeset {
    /// Coerces the permitted entries of untrusted `params` and stages them.
    ///
    /// Absent keys are skipped. `null` and blank strings become `Null`.
    /// Entries that cannot be coerced are recorded as cast errors and staged
    /// as nothing. Association names are ignored here; nested input goes
    /// through `association::nested_cast`.
    pub fn cast<S: AsRef<str>>(
        mut self,
        params: &serde_json::Map<String, Json>,
        permitted: &[S],
    ) -> Changeset {
        for name in permitted {
            let name = name.as_ref();

            let Some(raw) = params.get(name) else {
                continue;
            };

            let Some(field) = self.field(name) else {
                self = self.add_error(name, FieldError::cast("unknown field"));
                continue;
            };

            let Some(ty) = field.primitive_ty() else {
                continue;
            };
            let index = field.id.index;

            self = match cast_value(ty, raw) {
                Ok(value) => self.set_change(index, value),
                Err(reason) => self.add_error(name, FieldError::cast(reason)),
            };
        }

        self
    }
}

/// Coerces one JSON value to `ty`, returning the failure reason otherwise.
pub(crate) fn cast_value(ty: Type, raw: &Json) -> Result<Value, String> {
    let expected = || format!("expected {}", ty.name());

    match raw {
        Json::Null => return Ok(Value::Null),
        Json::String(s) if s.trim().is_empty() => return Ok(Value::Null),
        _ => {}
    }

    match ty {
        Type::Bool => match raw {
            Json::Bool(v) => Ok(Value::Bool(*v)),
            Json::String(s) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(expected()),
            },
            _ => Err(expected()),
        },
        Type::I64 => match raw {
            Json::Number(n) => n.as_i64().map(Value::I64).ok_or_else(expected),
            Json::String(s) => s.trim().parse().map(Value::I64).map_err(|_| expected()),
            _ => Err(expected()),
        },
        Type::String => match raw {
            Json::String(s) => Ok(Value::String(s.clone())),
            _ => Err(expected()),
        },
        Type::Uuid => match raw {
            Json::String(s) => uuid::Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .map_err(|_| expected()),
            _ => Err(expected()),
        },
    }
}

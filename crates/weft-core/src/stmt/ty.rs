use super::Value;

/// Value types a primitive field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    I64,
    String,
    Uuid,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Bool => "bool",
            Type::I64 => "i64",
            Type::String => "string",
            Type::Uuid => "uuid",
        }
    }

    /// Returns true if `value` can be stored in a field of this type. `Null`
    /// fits every type; whether it is acceptable is a validation concern.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Type::Bool, Value::Bool(_))
                | (Type::I64, Value::I64(_))
                | (Type::String, Value::String(_))
                | (Type::Uuid, Value::Uuid(_))
        )
    }
}

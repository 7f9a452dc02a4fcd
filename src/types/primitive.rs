use crate::{ITEMS_FIELD, PROPERTIES_FIELD, TYPE_FIELD};
use serde_json::{Map, Number, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const ADDITIONAL_PROPERTIES_FIELD: &str = "additionalProperties";

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum OpenApiPrimitives {
    Null,
    Bool,
    Integer,
    Array,
    Number,
    String,
    Object,
}

impl Display for OpenApiPrimitives {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenApiPrimitives::Null => write!(f, "null"),
            OpenApiPrimitives::Bool => write!(f, "boolean"),
            OpenApiPrimitives::Integer => write!(f, "integer"),
            OpenApiPrimitives::Array => write!(f, "array"),
            OpenApiPrimitives::Number => write!(f, "number"),
            OpenApiPrimitives::String => write!(f, "string"),
            OpenApiPrimitives::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct UnknownPrimitive(pub String);

impl Display for UnknownPrimitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown schema type '{}'", self.0)
    }
}

impl std::error::Error for UnknownPrimitive {}

impl FromStr for OpenApiPrimitives {
    type Err = UnknownPrimitive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" => Ok(OpenApiPrimitives::Null),
            "bool" | "boolean" => Ok(OpenApiPrimitives::Bool),
            "integer" => Ok(OpenApiPrimitives::Integer),
            "number" => Ok(OpenApiPrimitives::Number),
            "string" => Ok(OpenApiPrimitives::String),
            "array" => Ok(OpenApiPrimitives::Array),
            "object" => Ok(OpenApiPrimitives::Object),
            other => Err(UnknownPrimitive(other.to_string())),
        }
    }
}

impl OpenApiPrimitives {
    /// Type of a concrete JSON value.
    pub fn of_value(value: &Value) -> OpenApiPrimitives {
        match value {
            Value::Null => OpenApiPrimitives::Null,
            Value::Bool(_) => OpenApiPrimitives::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => OpenApiPrimitives::Integer,
            Value::Number(_) => OpenApiPrimitives::Number,
            Value::String(_) => OpenApiPrimitives::String,
            Value::Array(_) => OpenApiPrimitives::Array,
            Value::Object(_) => OpenApiPrimitives::Object,
        }
    }

    /// Every type a schema admits, in declaration order. Handles both the
    /// `"type": "x"` and `"type": ["x", "null"]` forms; a schema without
    /// `type` is inferred from `properties` / `items`.
    pub fn declared_types(schema: &Value) -> Vec<OpenApiPrimitives> {
        match schema.get(TYPE_FIELD) {
            Some(Value::String(single)) => OpenApiPrimitives::from_str(single)
                .map(|t| vec![t])
                .unwrap_or_default(),
            Some(Value::Array(many)) => many
                .iter()
                .filter_map(|t| t.as_str())
                .filter_map(|t| OpenApiPrimitives::from_str(t).ok())
                .collect(),
            _ if schema.get(PROPERTIES_FIELD).is_some() => vec![OpenApiPrimitives::Object],
            _ if schema.get(ITEMS_FIELD).is_some() => vec![OpenApiPrimitives::Array],
            _ => Vec::new(),
        }
    }

    /// First non-null type a schema declares.
    pub fn primary_type(schema: &Value) -> Option<OpenApiPrimitives> {
        Self::declared_types(schema)
            .into_iter()
            .find(|t| *t != OpenApiPrimitives::Null)
    }

    pub fn schema_is(schema: &Value, expected: OpenApiPrimitives) -> bool {
        Self::declared_types(schema).contains(&expected)
    }

    /// Converts wire strings inside `value` into the primitive types the schema
    /// asks for. Strings that cannot be converted are left untouched so that
    /// schema validation reports them.
    pub fn coerce(schema: &Value, value: Value) -> Value {
        match value {
            Value::String(input) => Self::coerce_str(schema, input),
            Value::Array(items) => {
                let item_schema = schema.get(ITEMS_FIELD).unwrap_or(&Value::Null);
                Value::Array(
                    items
                        .into_iter()
                        .map(|item| Self::coerce(item_schema, item))
                        .collect(),
                )
            }
            Value::Object(entries) => {
                let mut coerced = Map::with_capacity(entries.len());
                for (key, entry) in entries {
                    let property_schema = schema
                        .get(PROPERTIES_FIELD)
                        .and_then(|props| props.get(&key))
                        .or_else(|| {
                            schema
                                .get(ADDITIONAL_PROPERTIES_FIELD)
                                .filter(|additional| additional.is_object())
                        })
                        .unwrap_or(&Value::Null);
                    coerced.insert(key, Self::coerce(property_schema, entry));
                }
                Value::Object(coerced)
            }
            other => other,
        }
    }

    fn coerce_str(schema: &Value, input: String) -> Value {
        let types = Self::declared_types(schema);
        if types.contains(&OpenApiPrimitives::String) {
            return Value::String(input);
        }
        for declared in types {
            if let Some(converted) = declared.convert_value_to_type(&input) {
                return converted;
            }
        }
        Value::String(input)
    }

    /// Parses `input` as this primitive, if possible.
    pub fn convert_value_to_type(&self, input: &str) -> Option<Value> {
        match self {
            OpenApiPrimitives::Null if input.is_empty() || input == "null" => Some(Value::Null),
            OpenApiPrimitives::Bool => input.parse::<bool>().ok().map(Value::Bool),
            OpenApiPrimitives::Integer => input
                .parse::<i64>()
                .ok()
                .map(|i| Value::Number(Number::from(i))),
            OpenApiPrimitives::Number => {
                if let Ok(i) = input.parse::<i64>() {
                    return Some(Value::Number(Number::from(i)));
                }
                input
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            }
            OpenApiPrimitives::String => Some(Value::String(input.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_types_forms() {
        assert_eq!(
            OpenApiPrimitives::declared_types(&json!({"type": "integer"})),
            vec![OpenApiPrimitives::Integer]
        );
        assert_eq!(
            OpenApiPrimitives::declared_types(&json!({"type": ["null", "boolean"]})),
            vec![OpenApiPrimitives::Null, OpenApiPrimitives::Bool]
        );
        assert_eq!(
            OpenApiPrimitives::primary_type(&json!({"properties": {}})),
            Some(OpenApiPrimitives::Object)
        );
        assert_eq!(OpenApiPrimitives::primary_type(&json!({})), None);
    }

    #[test]
    fn test_coerce_nested_values() {
        let schema = json!({
            "type": "object",
            "properties": {
                "limit": {"type": "integer"},
                "ratio": {"type": "number"},
                "flags": {"type": "array", "items": {"type": "boolean"}},
                "name": {"type": "string"}
            }
        });
        let value = json!({
            "limit": "10",
            "ratio": "0.5",
            "flags": ["true", "false"],
            "name": "42"
        });
        assert_eq!(
            OpenApiPrimitives::coerce(&schema, value),
            json!({"limit": 10, "ratio": 0.5, "flags": [true, false], "name": "42"})
        );
    }

    #[test]
    fn test_coerce_leaves_unparseable_strings() {
        let schema = json!({"type": "integer"});
        assert_eq!(
            OpenApiPrimitives::coerce(&schema, json!("abc")),
            json!("abc")
        );
    }

    #[test]
    fn test_of_value() {
        assert_eq!(OpenApiPrimitives::of_value(&json!(1)), OpenApiPrimitives::Integer);
        assert_eq!(OpenApiPrimitives::of_value(&json!(1.5)), OpenApiPrimitives::Number);
        assert_eq!(OpenApiPrimitives::of_value(&json!([])), OpenApiPrimitives::Array);
    }
}

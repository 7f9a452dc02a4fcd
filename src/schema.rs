use crate::error::SchemaError;
use crate::types::version::OpenApiVersion;
use crate::types::{Diagnostic, JsonPath};
use crate::TYPE_FIELD;
use dashmap::DashMap;
use jsonschema::{Draft, Validator as JsonValidator};
use serde_json::{Map, Value};
use std::sync::Arc;

const NULLABLE_FIELD: &str = "nullable";

/// Validates a decoded value against a JSON schema.
///
/// Implementations must be re-entrant: one instance is shared by every
/// in-flight request of an engine.
pub trait SchemaValidator: Send + Sync {
    /// Returns one diagnostic per violation, each tagged with `code` and
    /// located under `location`. An empty list means the value is valid.
    fn validate(
        &self,
        instance: &Value,
        schema: &Value,
        location: &JsonPath,
        code: u16,
    ) -> Vec<Diagnostic>;
}

/// [`SchemaValidator`] backed by `jsonschema`, caching compiled schemas.
pub struct JsonSchemaValidator {
    version: OpenApiVersion,
    compiled: DashMap<String, Arc<JsonValidator>>,
}

impl JsonSchemaValidator {
    pub fn new(version: OpenApiVersion) -> Self {
        Self {
            version,
            compiled: DashMap::new(),
        }
    }

    pub fn draft(&self) -> Draft {
        self.version.get_draft()
    }

    /// Number of distinct schemas compiled so far.
    pub fn cached_schemas(&self) -> usize {
        self.compiled.len()
    }

    fn compile(&self, schema: &Value) -> Result<Arc<JsonValidator>, SchemaError> {
        let key = schema.to_string();
        if let Some(validator) = self.compiled.get(&key) {
            return Ok(Arc::clone(validator.value()));
        }

        log::debug!("Compiling schema {}", key);
        let prepared = match self.version {
            OpenApiVersion::V30x => expand_nullable(schema.clone()),
            OpenApiVersion::V31x => schema.clone(),
        };
        let validator = JsonValidator::options()
            .with_draft(self.draft())
            .build(&prepared)
            .map_err(|e| SchemaError::compilation_failed(&e))?;
        let validator = Arc::new(validator);
        self.compiled.insert(key, Arc::clone(&validator));
        Ok(validator)
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new(OpenApiVersion::default())
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(
        &self,
        instance: &Value,
        schema: &Value,
        location: &JsonPath,
        code: u16,
    ) -> Vec<Diagnostic> {
        let validator = match self.compile(schema) {
            Ok(validator) => validator,
            Err(e) => {
                log::warn!("{} at {}", e, location);
                return vec![Diagnostic::error(500, &e, location.clone())];
            }
        };
        validator
            .iter_errors(instance)
            .map(|error| {
                let mut path = location.clone();
                path.extend_from_pointer(&error.instance_path.to_string());
                Diagnostic::error(code, &error, path)
            })
            .collect()
    }
}

/// OpenAPI 3.0 `nullable: true` becomes a `null` member of `type`.
fn expand_nullable(schema: Value) -> Value {
    match schema {
        Value::Object(entries) => {
            let nullable = entries.get(NULLABLE_FIELD) == Some(&Value::Bool(true));
            let mut expanded: Map<String, Value> = entries
                .into_iter()
                .filter(|(key, _)| key != NULLABLE_FIELD)
                .map(|(key, value)| (key, expand_nullable(value)))
                .collect();
            if nullable {
                let widened = match expanded.remove(TYPE_FIELD) {
                    Some(Value::String(single)) => {
                        Some(Value::Array(vec![Value::String(single), Value::from("null")]))
                    }
                    Some(Value::Array(mut many)) => {
                        if !many.iter().any(|t| t == "null") {
                            many.push(Value::from("null"));
                        }
                        Some(Value::Array(many))
                    }
                    other => other,
                };
                if let Some(widened) = widened {
                    expanded.insert(TYPE_FIELD.to_string(), widened);
                }
            }
            Value::Object(expanded)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(expand_nullable).collect()),
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_violations_are_located() {
        let validator = JsonSchemaValidator::default();
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}, "tags": {"type": "array", "items": {"type": "string"}}}
        });
        let location = JsonPath::from_segments(["body"]);
        let diagnostics =
            validator.validate(&json!({"id": "x", "tags": ["a", 1]}), &schema, &location, 400);
        assert_eq!(diagnostics.len(), 2);
        let locations: Vec<String> = diagnostics.iter().map(|d| d.location.to_string()).collect();
        assert!(locations.contains(&"body.id".to_string()));
        assert!(locations.contains(&"body.tags.1".to_string()));
        assert!(diagnostics.iter().all(|d| d.code == 400 && d.is_error()));
    }

    #[test]
    fn test_valid_instance_has_no_findings() {
        let validator = JsonSchemaValidator::default();
        let diagnostics = validator.validate(
            &json!(5),
            &json!({"type": "integer", "minimum": 1}),
            &JsonPath::new(),
            400,
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_compiled_schemas_are_reused() {
        let validator = JsonSchemaValidator::default();
        let schema = json!({"type": "string"});
        for _ in 0..3 {
            validator.validate(&json!("a"), &schema, &JsonPath::new(), 400);
        }
        validator.validate(&json!(1), &json!({"type": "integer"}), &JsonPath::new(), 400);
        assert_eq!(validator.cached_schemas(), 2);
    }

    #[test]
    fn test_nullable_for_openapi_30() {
        let schema = json!({"type": "string", "nullable": true});
        let v30 = JsonSchemaValidator::new(OpenApiVersion::V30x);
        assert!(v30.validate(&Value::Null, &schema, &JsonPath::new(), 400).is_empty());
        assert_eq!(
            expand_nullable(json!({"properties": {"a": {"type": ["integer"], "nullable": true}}})),
            json!({"properties": {"a": {"type": ["integer", "null"]}}})
        );
    }

    #[test]
    fn test_broken_schema_is_a_server_finding() {
        let validator = JsonSchemaValidator::default();
        let diagnostics = validator.validate(
            &json!(1),
            &json!({"type": "no-such-type"}),
            &JsonPath::from_segments(["query", "limit"]),
            400,
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, 500);
    }
}

//! Turns a negotiated response into a concrete [`HttpResponse`].

use crate::codec::{self, ParameterStyle};
use crate::error::{ExamplerError, MockError};
use crate::media_type::MediaType;
use crate::negotiator::{BodySource, NegotiationResult};
use crate::types::primitive::OpenApiPrimitives;
use crate::types::request::append_header;
use crate::types::{Content, HttpResponse, Operation, Param, Response};
use crate::{ITEMS_FIELD, JSON_MEDIA_TYPE, PROPERTIES_FIELD};
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

const EXAMPLE_FIELD: &str = "example";
const EXAMPLES_FIELD: &str = "examples";
const DEFAULT_FIELD: &str = "default";
const CONST_FIELD: &str = "const";
const ENUM_FIELD: &str = "enum";
const ALL_OF_FIELD: &str = "allOf";
const ONE_OF_FIELD: &str = "oneOf";
const ANY_OF_FIELD: &str = "anyOf";
const FORMAT_FIELD: &str = "format";
const MINIMUM_FIELD: &str = "minimum";
const MAXIMUM_FIELD: &str = "maximum";
const EXCLUSIVE_MINIMUM_FIELD: &str = "exclusiveMinimum";
const MIN_LENGTH_FIELD: &str = "minLength";
const MAX_LENGTH_FIELD: &str = "maxLength";
const MIN_ITEMS_FIELD: &str = "minItems";

/// Upper bounds on `minItems` and `minLength` honored while generating.
const MAX_GENERATED_ITEMS: u64 = 64;
const MAX_GENERATED_LENGTH: u64 = 4096;

/// Generates example data from a schema.
///
/// Implementations are shared by every request of an engine and must not
/// keep per-request state.
pub trait SchemaExampler: Send + Sync {
    fn example(&self, schema: &Value) -> Result<Value, ExamplerError>;

    /// Generates a body for `schema`, serialized for `media_type`.
    fn generate(&self, schema: &Value, media_type: &str) -> Result<Bytes, ExamplerError> {
        let value = self.example(schema)?;
        serialize_body(&value, media_type)
    }
}

/// Deterministic exampler: declared examples first, then a value built from
/// the schema's types and bounds.
#[derive(Debug, Clone)]
pub struct StaticExampler {
    max_depth: usize,
}

impl Default for StaticExampler {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

impl StaticExampler {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn build(&self, schema: &Value, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::Null;
        }
        let Some(object) = schema.as_object() else {
            return Value::Null;
        };

        if let Some(example) = object.get(EXAMPLE_FIELD) {
            return example.clone();
        }
        if let Some(first) = object
            .get(EXAMPLES_FIELD)
            .and_then(Value::as_array)
            .and_then(|examples| examples.first())
        {
            return first.clone();
        }
        if let Some(value) = object.get(DEFAULT_FIELD).or_else(|| object.get(CONST_FIELD)) {
            return value.clone();
        }
        if let Some(first) = object
            .get(ENUM_FIELD)
            .and_then(Value::as_array)
            .and_then(|values| values.first())
        {
            return first.clone();
        }

        if let Some(parts) = object.get(ALL_OF_FIELD).and_then(Value::as_array) {
            return self.merge_all_of(parts, depth);
        }
        if let Some(first) = [ONE_OF_FIELD, ANY_OF_FIELD]
            .iter()
            .filter_map(|field| object.get(*field).and_then(Value::as_array))
            .find_map(|choices| choices.first())
        {
            return self.build(first, depth + 1);
        }

        match OpenApiPrimitives::primary_type(schema) {
            Some(OpenApiPrimitives::String) => string_example(schema),
            Some(OpenApiPrimitives::Integer) => integer_example(schema),
            Some(OpenApiPrimitives::Number) => number_example(schema),
            Some(OpenApiPrimitives::Bool) => Value::Bool(true),
            Some(OpenApiPrimitives::Array) => {
                let item = self.build(schema.get(ITEMS_FIELD).unwrap_or(&Value::Null), depth + 1);
                let count = capped(schema, MIN_ITEMS_FIELD, MAX_GENERATED_ITEMS).unwrap_or(1).max(1);
                Value::Array(vec![item; count as usize])
            }
            Some(OpenApiPrimitives::Object) => {
                let mut generated = Map::new();
                if let Some(properties) = schema.get(PROPERTIES_FIELD).and_then(Value::as_object) {
                    for (name, property) in properties {
                        generated.insert(name.clone(), self.build(property, depth + 1));
                    }
                }
                Value::Object(generated)
            }
            Some(OpenApiPrimitives::Null) | None => Value::Null,
        }
    }

    /// Object parts are merged key by key; otherwise the last non-null part wins.
    fn merge_all_of(&self, parts: &[Value], depth: usize) -> Value {
        let mut merged = Value::Null;
        for part in parts {
            match (&mut merged, self.build(part, depth + 1)) {
                (Value::Object(target), Value::Object(source)) => target.extend(source),
                (_, Value::Null) => {}
                (target, value) => *target = value,
            }
        }
        merged
    }
}

impl SchemaExampler for StaticExampler {
    fn example(&self, schema: &Value) -> Result<Value, ExamplerError> {
        if !schema.is_object() && !schema.is_boolean() {
            return Err(ExamplerError::generation(&format!(
                "schema must be an object, found {}",
                OpenApiPrimitives::of_value(schema)
            )));
        }
        Ok(self.build(schema, 0))
    }
}

fn string_example(schema: &Value) -> Value {
    let base = match schema.get(FORMAT_FIELD).and_then(Value::as_str) {
        Some("date") => "2024-01-01",
        Some("date-time") => "2024-01-01T00:00:00Z",
        Some("time") => "00:00:00Z",
        Some("email") => "user@example.com",
        Some("uuid") => "3fa85f64-5717-4562-b3fc-2c963f66afa6",
        Some("uri") | Some("url") => "https://example.com",
        Some("hostname") => "example.com",
        Some("ipv4") => "127.0.0.1",
        Some("ipv6") => "::1",
        Some("byte") => "c3RyaW5n",
        Some("password") => "********",
        _ => "string",
    };
    let mut text = base.to_string();
    if let Some(min) = capped(schema, MIN_LENGTH_FIELD, MAX_GENERATED_LENGTH) {
        let missing = (min as usize).saturating_sub(text.chars().count());
        text.push_str(&"x".repeat(missing));
    }
    if let Some(max) = schema.get(MAX_LENGTH_FIELD).and_then(Value::as_u64) {
        text = text.chars().take(max as usize).collect();
    }
    Value::String(text)
}

/// Reads a size keyword, clamped to `limit`.
fn capped(schema: &Value, field: &str, limit: u64) -> Option<u64> {
    let declared = schema.get(field).and_then(Value::as_u64)?;
    if declared > limit {
        log::debug!("Generating {} items for {} {}", limit, field, declared);
    }
    Some(declared.min(limit))
}

fn lower_bound(schema: &Value) -> Option<f64> {
    match schema.get(EXCLUSIVE_MINIMUM_FIELD) {
        Some(Value::Number(bound)) => bound.as_f64().map(|bound| bound + 1.0),
        Some(Value::Bool(true)) => schema
            .get(MINIMUM_FIELD)
            .and_then(Value::as_f64)
            .map(|bound| bound + 1.0),
        _ => schema.get(MINIMUM_FIELD).and_then(Value::as_f64),
    }
}

fn bounded(schema: &Value) -> f64 {
    let value = lower_bound(schema).unwrap_or(0.0);
    match schema.get(MAXIMUM_FIELD).and_then(Value::as_f64) {
        Some(max) if value > max => max,
        _ => value,
    }
}

fn integer_example(schema: &Value) -> Value {
    Value::Number(Number::from(bounded(schema).ceil() as i64))
}

fn number_example(schema: &Value) -> Value {
    let value = bounded(schema);
    if value.fract() == 0.0 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// Writes `value` in the wire format of `media_type`. Opaque media types
/// only accept string values, which are written as-is.
pub fn serialize_body(value: &Value, media_type: &str) -> Result<Bytes, ExamplerError> {
    let Some(parsed) = MediaType::parse(media_type) else {
        return Err(ExamplerError::UnsupportedMediaType(media_type.to_string()));
    };
    if parsed.is_json() || (parsed.kind == "*" && parsed.subtype == "*") {
        return serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| ExamplerError::generation(&e));
    }
    if parsed.is_form_urlencoded() {
        let Value::Object(entries) = value else {
            return Err(ExamplerError::generation(&"form bodies must be objects"));
        };
        let mut pairs = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let pair = codec::serialize(ParameterStyle::Form, name, entry, true)
                .map_err(|e| ExamplerError::generation(&e))?;
            pairs.push(pair);
        }
        return Ok(Bytes::from(pairs.join("&")));
    }
    match value {
        Value::String(text) => Ok(Bytes::from(text.clone())),
        other if parsed.is_text() => Ok(Bytes::from(other.to_string())),
        _ => Err(ExamplerError::UnsupportedMediaType(media_type.to_string())),
    }
}

/// Media type written to `Content-Type` for a declared, possibly wildcard, media type.
fn concrete_media_type(media_type: &str) -> String {
    match MediaType::parse(media_type) {
        Some(parsed) if parsed.kind == "*" => JSON_MEDIA_TYPE.to_string(),
        Some(parsed) if parsed.subtype == "*" && parsed.is_text() => "text/plain".to_string(),
        Some(parsed) if parsed.subtype == "*" => "application/octet-stream".to_string(),
        _ => media_type.to_string(),
    }
}

/// Builds mocked responses. The exampler is fixed at construction.
#[derive(Clone)]
pub struct Mocker {
    exampler: Arc<dyn SchemaExampler>,
}

impl Default for Mocker {
    fn default() -> Self {
        Self::new(Arc::new(StaticExampler::default()))
    }
}

impl Mocker {
    pub fn new(exampler: Arc<dyn SchemaExampler>) -> Self {
        Self { exampler }
    }

    pub fn exampler(&self) -> &dyn SchemaExampler {
        self.exampler.as_ref()
    }

    /// Produces the response `negotiated` selected on `operation`.
    pub fn mock(
        &self,
        operation: &Operation,
        negotiated: &NegotiationResult,
    ) -> Result<HttpResponse, MockError> {
        let response = operation
            .find_response(&negotiated.code)
            .ok_or_else(|| MockError::ResponseMissing(negotiated.code.to_string()))?;
        let status = StatusCode::from_u16(negotiated.code.status())
            .map_err(|e| MockError::serialization(&e))?;
        let mut mocked = HttpResponse::new(status);

        self.mock_headers(response, &mut mocked)?;

        let Some(media_type) = negotiated.media_type.as_deref() else {
            return Ok(mocked);
        };
        let content = response
            .find_content(media_type)
            .ok_or_else(|| MockError::ContentMissing(media_type.to_string()))?;
        let content_type = concrete_media_type(media_type);
        mocked.body = self.mock_body(content, &content_type, &negotiated.body)?;
        append_header(&mut mocked.headers, CONTENT_TYPE.as_str(), &content_type);
        Ok(mocked)
    }

    fn mock_body(
        &self,
        content: &Content,
        content_type: &str,
        source: &BodySource,
    ) -> Result<Bytes, MockError> {
        match source {
            BodySource::Example(key) => {
                let example = content
                    .find_example(key)
                    .ok_or_else(|| MockError::ExampleMissing(key.clone()))?;
                Ok(serialize_body(&example.value, content_type)?)
            }
            BodySource::Dynamic => {
                let schema = content.schema.as_ref().ok_or_else(|| {
                    ExamplerError::generation(&format!(
                        "{} declares no schema",
                        content.media_type
                    ))
                })?;
                Ok(self.exampler.generate(schema, content_type)?)
            }
            BodySource::Empty => Ok(Bytes::new()),
        }
    }

    fn mock_headers(&self, response: &Response, mocked: &mut HttpResponse) -> Result<(), MockError> {
        for header in &response.headers {
            if header.name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            let Some(value) = self.header_value(header)? else {
                log::debug!("Response header '{}' has nothing to mock from", header.name);
                continue;
            };
            let serialized = codec::serialize_header(&value, header.explode())
                .map_err(|e| MockError::serialization(&e))?;
            append_header(&mut mocked.headers, &header.name, &serialized);
        }
        Ok(())
    }

    fn header_value(&self, header: &Param) -> Result<Option<Value>, MockError> {
        if let Some(example) = header.examples.first() {
            return Ok(Some(example.value.clone()));
        }
        match &header.schema {
            Some(schema) => Ok(Some(self.exampler.example(schema)?)),
            None if header.required => Ok(Some(Value::String(String::new()))),
            None => Ok(None),
        }
    }
}

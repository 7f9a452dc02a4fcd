use crate::codec::{self, ParamSource, ParameterStyle};
use crate::media_type::{self, MediaType};
use crate::schema::SchemaValidator;
use crate::types::primitive::OpenApiPrimitives;
use crate::types::request::decode_query_component;
use crate::types::{Content, Diagnostic, HttpRequest, JsonPath, Operation, QueryParams};
use crate::validator::Validator;
use crate::PROPERTIES_FIELD;
use serde_json::{Map, Value};

const BAD_REQUEST: u16 = 400;
const UNSUPPORTED_MEDIA_TYPE: u16 = 415;

pub(crate) struct RequestBodyValidator<'a> {
    request: &'a HttpRequest,
}

impl<'a> RequestBodyValidator<'a> {
    pub(crate) fn new(request: &'a HttpRequest) -> Self {
        Self { request }
    }
}

impl Validator for RequestBodyValidator<'_> {
    fn validate(
        &self,
        operation: &Operation,
        schema_validator: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(body_def) = &operation.request_body else {
            return;
        };
        let location = JsonPath::from_segments([self.section()]);

        let Some(body) = self.request.body_bytes() else {
            if body_def.required {
                diagnostics.push(Diagnostic::error(
                    BAD_REQUEST,
                    "Body parameter is required",
                    location,
                ));
            }
            return;
        };

        let content_type = self.request.content_type();
        let Some(content) = resolve_content(&body_def.contents, content_type) else {
            if body_def.required {
                diagnostics.push(Diagnostic::error(
                    UNSUPPORTED_MEDIA_TYPE,
                    &format!(
                        "Supported content types: {}",
                        body_def
                            .contents
                            .iter()
                            .map(|content| content.media_type.as_str())
                            .collect::<Vec<&str>>()
                            .join(",")
                    ),
                    JsonPath::from_segments(["header", "content-type"]),
                ));
            } else {
                log::debug!(
                    "Optional body of '{}' has undeclared content type {:?}, skipping",
                    operation.id,
                    content_type
                );
            }
            return;
        };

        let media_type = content_type.unwrap_or(content.media_type.as_str());
        match decode_body(media_type, body, content) {
            Ok(Some(value)) => {
                if let Some(schema) = &content.schema {
                    diagnostics.extend(schema_validator.validate(
                        &value,
                        schema,
                        &location,
                        BAD_REQUEST,
                    ));
                }
            }
            Ok(None) => log::debug!("No decoder for {}, skipping body validation", media_type),
            Err(reason) => diagnostics.push(Diagnostic::error(
                BAD_REQUEST,
                &format!("Unable to read body: {}", reason),
                location,
            )),
        }
    }

    fn section(&self) -> &'static str {
        "body"
    }
}

/// Content accepting `content_type`, exact match first. Without a content
/// type the single declared content is used.
pub(crate) fn resolve_content<'c>(
    contents: &'c [Content],
    content_type: Option<&str>,
) -> Option<&'c Content> {
    match content_type {
        Some(content_type) => media_type::find_compatible(
            content_type,
            contents.iter().map(|content| content.media_type.as_str()),
        )
        .and_then(|index| contents.get(index)),
        None if contents.len() == 1 => contents.first(),
        None => None,
    }
}

/// Reads `body` into a JSON value. `Ok(None)` means the media type has no decoder.
pub(crate) fn decode_body(
    media_type: &str,
    body: &[u8],
    content: &Content,
) -> Result<Option<Value>, String> {
    let Some(parsed) = MediaType::parse(media_type) else {
        return Ok(None);
    };
    if parsed.is_json() {
        return serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| e.to_string());
    }
    if parsed.is_form_urlencoded() {
        return decode_form(body, content).map(Some);
    }
    if parsed.is_text() {
        return String::from_utf8(body.to_vec())
            .map(|text| Some(Value::String(text)))
            .map_err(|e| e.to_string());
    }
    Ok(None)
}

/// Each declared property is decoded with its encoding's style, form/explode
/// by default.
fn decode_form(body: &[u8], content: &Content) -> Result<Value, String> {
    let text = String::from_utf8_lossy(body);
    let pairs = QueryParams::parse(&text);
    let schema = content.schema.clone().unwrap_or(Value::Bool(true));

    let mut object = Map::new();
    match schema.get(PROPERTIES_FIELD).and_then(Value::as_object) {
        Some(properties) => {
            for (name, property_schema) in properties {
                let encoding = content.find_encoding(name);
                let style = encoding
                    .and_then(|encoding| encoding.style)
                    .unwrap_or(ParameterStyle::Form);
                let explode = encoding
                    .and_then(|encoding| encoding.explode)
                    .unwrap_or(style == ParameterStyle::Form);
                let value = codec::deserialize(
                    style,
                    name,
                    ParamSource::Pairs(&pairs),
                    property_schema,
                    explode,
                )
                .map_err(|e| format!("property '{}': {}", name, e))?;
                if let Some(value) = value {
                    object.insert(name.clone(), value);
                }
            }
        }
        None => {
            for (key, value) in pairs.iter() {
                if !object.contains_key(key) {
                    let value = decode_query_component(value.unwrap_or(""));
                    object.insert(key.to_string(), Value::String(value));
                }
            }
        }
    }
    Ok(OpenApiPrimitives::coerce(&schema, Value::Object(object)))
}

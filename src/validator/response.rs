use crate::codec::{self, ParamSource};
use crate::schema::SchemaValidator;
use crate::types::primitive::OpenApiPrimitives;
use crate::types::request::header_value;
use crate::types::{Diagnostic, HttpResponse, JsonPath, Operation, Response};
use crate::validator::Validator;
use crate::validator::request_body::{decode_body, resolve_content};
use serde_json::Value;

/// Response findings point at the upstream or the contract, never the client.
const RESPONSE_FINDING: u16 = 500;

fn declared_response<'o>(
    operation: &'o Operation,
    response: &HttpResponse,
) -> Option<&'o Response> {
    operation.response_for_status(response.status.as_u16())
}

/// Checks the status is declared and every declared header.
pub(crate) struct ResponseHeaderValidator<'a> {
    response: &'a HttpResponse,
}

impl<'a> ResponseHeaderValidator<'a> {
    pub(crate) fn new(response: &'a HttpResponse) -> Self {
        Self { response }
    }
}

impl Validator for ResponseHeaderValidator<'_> {
    fn validate(
        &self,
        operation: &Operation,
        schema_validator: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(declared) = declared_response(operation, self.response) else {
            diagnostics.push(Diagnostic::warning(
                RESPONSE_FINDING,
                &format!(
                    "Unable to match the returned status code {} with a declared response",
                    self.response.status.as_u16()
                ),
                JsonPath::from_segments(["status"]),
            ));
            return;
        };

        for header in &declared.headers {
            let location = JsonPath::from_segments([self.section(), header.name.as_str()]);
            let Some(raw) = header_value(&self.response.headers, &header.name) else {
                if header.required {
                    diagnostics.push(Diagnostic::error(
                        RESPONSE_FINDING,
                        &format!("Missing required response header '{}'", header.name),
                        location,
                    ));
                }
                continue;
            };
            let schema = header.schema.clone().unwrap_or(Value::Bool(true));
            match codec::deserialize(
                header.style(),
                &header.name,
                ParamSource::Header(&raw),
                &schema,
                header.explode(),
            ) {
                Ok(Some(value)) => {
                    let value = OpenApiPrimitives::coerce(&schema, value);
                    diagnostics.extend(schema_validator.validate(
                        &value,
                        &schema,
                        &location,
                        RESPONSE_FINDING,
                    ));
                }
                Ok(None) => {}
                Err(e) => diagnostics.push(Diagnostic::error(RESPONSE_FINDING, &e, location)),
            }
        }
    }

    fn section(&self) -> &'static str {
        "header"
    }
}

/// Checks the body against the content selected by the response's `Content-Type`.
pub(crate) struct ResponseBodyValidator<'a> {
    response: &'a HttpResponse,
}

impl<'a> ResponseBodyValidator<'a> {
    pub(crate) fn new(response: &'a HttpResponse) -> Self {
        Self { response }
    }
}

impl Validator for ResponseBodyValidator<'_> {
    fn validate(
        &self,
        operation: &Operation,
        schema_validator: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(declared) = declared_response(operation, self.response) else {
            return;
        };
        if declared.contents.is_empty() || self.response.body.is_empty() {
            return;
        }
        let location = JsonPath::from_segments([self.section()]);

        let content_type = self.response.content_type();
        let Some(content) = resolve_content(&declared.contents, content_type) else {
            diagnostics.push(Diagnostic::error(
                RESPONSE_FINDING,
                &format!(
                    "Response content type {} is not declared for {}",
                    content_type.unwrap_or("(none)"),
                    declared.code
                ),
                JsonPath::from_segments(["header", "content-type"]),
            ));
            return;
        };

        let media_type = content_type.unwrap_or(content.media_type.as_str());
        match decode_body(media_type, &self.response.body, content) {
            Ok(Some(value)) => {
                if let Some(schema) = &content.schema {
                    diagnostics.extend(schema_validator.validate(
                        &value,
                        schema,
                        &location,
                        RESPONSE_FINDING,
                    ));
                }
            }
            Ok(None) => log::debug!("No decoder for {}, skipping body validation", media_type),
            Err(reason) => diagnostics.push(Diagnostic::error(
                RESPONSE_FINDING,
                &format!("Unable to read response body: {}", reason),
                location,
            )),
        }
    }

    fn section(&self) -> &'static str {
        "body"
    }
}

//! Picks the status code, media type and body source of a mocked response.
//!
//! Invalid requests resolve against the `400` response. Valid requests honor
//! the caller's hints where they can and otherwise fall back to the lowest
//! declared `2XX`. A forced status code never produces an error of its own:
//! when it cannot be satisfied the default resolution runs instead.

use crate::error::NegotiationError;
use crate::media_type;
use crate::types::{Content, HttpRequest, Operation, Response, ResponseCode};
use std::fmt::{Display, Formatter};

const CODE_HINT: &str = "code";
const EXAMPLE_HINT: &str = "example";
const DYNAMIC_HINT: &str = "dynamic";
const CODE_QUERY: &str = "__code";
const EXAMPLE_QUERY: &str = "__example";
const DYNAMIC_QUERY: &str = "__dynamic";
const CONTENT_TYPE_QUERY: &str = "__contentType";
const PREFER_HEADER: &str = "prefer";

/// Per-request hints steering negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationConfig {
    pub code: Option<u16>,
    pub media_type: Option<String>,
    pub example_key: Option<String>,
    pub dynamic: Option<bool>,
}

impl NegotiationConfig {
    /// Reads hints from the reserved `__code`, `__dynamic`, `__contentType`
    /// and `__example` query parameters and from the `Prefer` header
    /// (`code=404, example=notFound`). The header wins when both name the same hint.
    pub fn from_request(request: &HttpRequest) -> Self {
        let mut config = NegotiationConfig {
            code: request.query.get(CODE_QUERY).and_then(parse_code),
            media_type: request
                .query
                .get_decoded(CONTENT_TYPE_QUERY)
                .filter(|value| !value.is_empty()),
            example_key: request
                .query
                .get_decoded(EXAMPLE_QUERY)
                .filter(|value| !value.is_empty()),
            dynamic: request.query.get(DYNAMIC_QUERY).and_then(parse_flag),
        };

        let Some(prefer) = request.header(PREFER_HEADER) else {
            return config;
        };
        for entry in prefer.split(',').map(str::trim) {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                CODE_HINT => {
                    if let Some(code) = parse_code(value) {
                        config.code = Some(code);
                    }
                }
                EXAMPLE_HINT if !value.is_empty() => config.example_key = Some(value.to_string()),
                DYNAMIC_HINT => {
                    if let Some(dynamic) = parse_flag(value) {
                        config.dynamic = Some(dynamic);
                    }
                }
                _ => {}
            }
        }
        config
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_media_type(mut self, media_type: &str) -> Self {
        self.media_type = Some(media_type.to_string());
        self
    }

    pub fn with_example(mut self, key: &str) -> Self {
        self.example_key = Some(key.to_string());
        self
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = Some(dynamic);
        self
    }
}

fn parse_code(raw: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(code) => Some(code),
        Err(_) => {
            log::warn!("Ignoring response code hint '{}'", raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            log::warn!("Ignoring dynamic hint '{}'", other);
            None
        }
    }
}

/// Where the mocked body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Example(String),
    Dynamic,
    /// The response declares no content.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationResult {
    pub code: ResponseCode,
    pub media_type: Option<String>,
    pub body: BodySource,
}

impl NegotiationResult {
    fn new(code: ResponseCode, media_type: Option<&str>, body: BodySource) -> Self {
        Self {
            code,
            media_type: media_type.map(str::to_string),
            body,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.body == BodySource::Dynamic
    }

    pub fn example_key(&self) -> Option<&str> {
        match &self.body {
            BodySource::Example(key) => Some(key),
            _ => None,
        }
    }
}

impl Display for NegotiationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let media_type = self.media_type.as_deref().unwrap_or("-");
        match &self.body {
            BodySource::Example(key) => {
                write!(f, "{} {} example '{}'", self.code, media_type, key)
            }
            BodySource::Dynamic => write!(f, "{} {} dynamic", self.code, media_type),
            BodySource::Empty => write!(f, "{} empty", self.code),
        }
    }
}

/// Selects the response to mock for `operation`.
pub fn negotiate(
    operation: &Operation,
    request_is_valid: bool,
    desired: &NegotiationConfig,
) -> Result<NegotiationResult, NegotiationError> {
    let result = if request_is_valid {
        negotiate_valid(operation, desired)
    } else {
        negotiate_invalid(operation)
    };
    match &result {
        Ok(result) => log::debug!("Operation '{}' negotiated to {}", operation.id, result),
        Err(err) => log::debug!("Negotiation for operation '{}' failed: {}", operation.id, err),
    }
    result
}

fn negotiate_invalid(operation: &Operation) -> Result<NegotiationResult, NegotiationError> {
    let response = operation
        .find_response(&ResponseCode::Exact(400))
        .ok_or(NegotiationError::NoBadRequestResponse)?;
    if response.contents.is_empty() {
        return Ok(NegotiationResult::new(response.code, None, BodySource::Empty));
    }

    if let Some((content, example)) = response
        .contents
        .iter()
        .find_map(|content| content.examples.first().map(|example| (content, example)))
    {
        return Ok(NegotiationResult::new(
            response.code,
            Some(&content.media_type),
            BodySource::Example(example.key.clone()),
        ));
    }
    match response.contents.iter().find(|content| content.schema.is_some()) {
        Some(content) => Ok(NegotiationResult::new(
            response.code,
            Some(&content.media_type),
            BodySource::Dynamic,
        )),
        None => Err(NegotiationError::DataCorrupted),
    }
}

fn negotiate_valid(
    operation: &Operation,
    desired: &NegotiationConfig,
) -> Result<NegotiationResult, NegotiationError> {
    if let Some(code) = desired.code {
        match operation.find_response(&ResponseCode::Exact(code)) {
            Some(response) => match negotiate_content(response, desired) {
                Ok(result) => return Ok(result),
                Err(err) => log::debug!(
                    "Forced code {} on '{}' cannot be served ({}), using the default response",
                    code,
                    operation.id,
                    err
                ),
            },
            None => log::debug!(
                "Forced code {} is not declared on '{}', using the default response",
                code,
                operation.id
            ),
        }
    }
    let response = default_response(operation)?;
    negotiate_content(response, desired)
}

/// Lowest exact `2xx`, else `2XX`.
fn default_response(operation: &Operation) -> Result<&Response, NegotiationError> {
    operation
        .responses
        .iter()
        .filter(|response| response.code.is_success_exact())
        .min_by_key(|response| response.code.status())
        .or_else(|| operation.find_response(&ResponseCode::Range(2)))
        .ok_or(NegotiationError::NoSuccessResponse)
}

fn negotiate_content(
    response: &Response,
    desired: &NegotiationConfig,
) -> Result<NegotiationResult, NegotiationError> {
    if response.contents.is_empty() {
        return Ok(NegotiationResult::new(response.code, None, BodySource::Empty));
    }
    let content = select_content(response, desired.media_type.as_deref())?;
    let media_type = Some(content.media_type.as_str());

    if let Some(key) = &desired.example_key {
        return match content.find_example(key) {
            Some(example) => Ok(NegotiationResult::new(
                response.code,
                media_type,
                BodySource::Example(example.key.clone()),
            )),
            None => Err(NegotiationError::ExampleNotFound(key.clone())),
        };
    }
    if desired.dynamic == Some(true) {
        return match content.schema {
            Some(_) => Ok(NegotiationResult::new(
                response.code,
                media_type,
                BodySource::Dynamic,
            )),
            None => Err(NegotiationError::SchemaNotFound),
        };
    }
    if let Some(example) = content.examples.first() {
        return Ok(NegotiationResult::new(
            response.code,
            media_type,
            BodySource::Example(example.key.clone()),
        ));
    }
    match content.schema {
        Some(_) => Ok(NegotiationResult::new(
            response.code,
            media_type,
            BodySource::Dynamic,
        )),
        None => Err(NegotiationError::NotPossibleToGenerate),
    }
}

/// The desired media type when declared (a wildcard hint takes the first
/// declared match), otherwise `application/json`.
fn select_content<'a>(
    response: &'a Response,
    desired: Option<&str>,
) -> Result<&'a Content, NegotiationError> {
    let declared = || response.contents.iter().map(|content| content.media_type.as_str());
    let desired_index = desired.and_then(|desired| {
        declared()
            .position(|media_type| media_type::same_essence(media_type, desired))
            .or_else(|| declared().position(|media_type| media_type::matches(media_type, desired)))
    });
    desired_index
        .or_else(|| media_type::find_json(declared()))
        .and_then(|index| response.contents.get(index))
        .ok_or(NegotiationError::CannotDetermineContentType)
}

#[cfg(test)]
mod test {
    use super::*;
    use http::Method;
    use serde_json::{Value, json};

    fn operation(responses: Value) -> Operation {
        serde_json::from_value(json!({
            "id": "getPet",
            "method": "get",
            "path": "/pets/{id}",
            "responses": responses
        }))
        .unwrap()
    }

    fn pet_operation() -> Operation {
        operation(json!([
            {
                "code": "200",
                "contents": [
                    {
                        "mediaType": "application/xml",
                        "schema": {"type": "string"}
                    },
                    {
                        "mediaType": "application/json",
                        "schema": {"type": "object"},
                        "examples": [
                            {"key": "cat", "value": {"name": "Tom"}},
                            {"key": "dog", "value": {"name": "Rex"}}
                        ]
                    }
                ]
            },
            {
                "code": "404",
                "contents": [
                    {
                        "mediaType": "application/json",
                        "examples": [{"key": "notFound", "value": {"error": "missing"}}]
                    }
                ]
            }
        ]))
    }

    #[test]
    fn test_invalid_request_without_400_is_fatal() {
        let result = negotiate(&pet_operation(), false, &NegotiationConfig::default());
        assert_eq!(result, Err(NegotiationError::NoBadRequestResponse));
    }

    #[test]
    fn test_invalid_request_with_schema_only_400_is_dynamic() {
        let op = operation(json!([
            {"code": "200", "contents": [{"mediaType": "application/json", "schema": {}}]},
            {"code": "400", "contents": [{"mediaType": "application/json", "schema": {"type": "object"}}]}
        ]));
        let result = negotiate(&op, false, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(400));
        assert!(result.is_dynamic());
        assert_eq!(result.media_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_invalid_request_prefers_any_example_over_earlier_schema() {
        let op = operation(json!([
            {"code": "400", "contents": [
                {"mediaType": "application/json", "schema": {"type": "object"}},
                {"mediaType": "text/plain", "examples": [{"key": "bad", "value": "bad request"}]}
            ]}
        ]));
        let result = negotiate(&op, false, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.media_type.as_deref(), Some("text/plain"));
        assert_eq!(result.example_key(), Some("bad"));
    }

    #[test]
    fn test_invalid_request_with_unusable_400_is_data_corrupted() {
        let op = operation(json!([
            {"code": "400", "contents": [{"mediaType": "application/json"}]}
        ]));
        assert_eq!(
            negotiate(&op, false, &NegotiationConfig::default()),
            Err(NegotiationError::DataCorrupted)
        );
    }

    #[test]
    fn test_forced_undeclared_code_degrades_to_default() {
        let op = operation(json!([
            {"code": "200", "contents": [{"mediaType": "application/json", "schema": {}}]},
            {"code": "404", "contents": [{"mediaType": "application/json", "schema": {}}]}
        ]));
        let desired = NegotiationConfig::default().with_code(299);
        let result = negotiate(&op, true, &desired).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(200));
    }

    #[test]
    fn test_forced_declared_code_is_used() {
        let desired = NegotiationConfig::default().with_code(404);
        let result = negotiate(&pet_operation(), true, &desired).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(404));
        assert_eq!(result.example_key(), Some("notFound"));
    }

    #[test]
    fn test_forced_code_that_cannot_be_served_degrades_to_default() {
        // 404 only has examples, so a forced dynamic body fails there.
        let desired = NegotiationConfig::default()
            .with_code(404)
            .with_dynamic(true);
        let result = negotiate(&pet_operation(), true, &desired).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(200));
        assert!(result.is_dynamic());
    }

    #[test]
    fn test_missing_example_key_is_fatal() {
        let desired = NegotiationConfig::default().with_example("bear");
        assert_eq!(
            negotiate(&pet_operation(), true, &desired),
            Err(NegotiationError::ExampleNotFound("bear".to_string()))
        );
    }

    #[test]
    fn test_default_prefers_first_json_example() {
        let result = negotiate(&pet_operation(), true, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(200));
        assert_eq!(result.media_type.as_deref(), Some("application/json"));
        assert_eq!(result.example_key(), Some("cat"));

        let desired = NegotiationConfig::default().with_example("dog");
        let result = negotiate(&pet_operation(), true, &desired).unwrap();
        assert_eq!(result.example_key(), Some("dog"));
    }

    #[test]
    fn test_desired_media_type() {
        let desired = NegotiationConfig::default().with_media_type("application/xml");
        let result = negotiate(&pet_operation(), true, &desired).unwrap();
        assert_eq!(result.media_type.as_deref(), Some("application/xml"));
        assert!(result.is_dynamic());

        let desired = NegotiationConfig::default().with_media_type("image/png");
        let result = negotiate(&pet_operation(), true, &desired).unwrap();
        assert_eq!(result.media_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_no_json_and_no_desired_type_is_fatal() {
        let op = operation(json!([
            {"code": "200", "contents": [{"mediaType": "text/plain", "schema": {}}]}
        ]));
        assert_eq!(
            negotiate(&op, true, &NegotiationConfig::default()),
            Err(NegotiationError::CannotDetermineContentType)
        );
        let desired = NegotiationConfig::default().with_media_type("text/*");
        let result = negotiate(&op, true, &desired).unwrap();
        assert_eq!(result.media_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_lowest_success_code_wins() {
        let op = operation(json!([
            {"code": "2XX", "contents": [{"mediaType": "application/json", "schema": {}}]},
            {"code": "202", "contents": [{"mediaType": "application/json", "schema": {}}]},
            {"code": "201", "contents": [{"mediaType": "application/json", "schema": {}}]}
        ]));
        let result = negotiate(&op, true, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(201));

        let op = operation(json!([
            {"code": "2XX", "contents": [{"mediaType": "application/json", "schema": {}}]},
            {"code": "default", "contents": [{"mediaType": "application/json", "schema": {}}]}
        ]));
        let result = negotiate(&op, true, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.code, ResponseCode::Range(2));
    }

    #[test]
    fn test_no_success_response_is_fatal() {
        let op = operation(json!([{"code": "404"}]));
        assert_eq!(
            negotiate(&op, true, &NegotiationConfig::default()),
            Err(NegotiationError::NoSuccessResponse)
        );
    }

    #[test]
    fn test_content_without_examples_or_schema() {
        let op = operation(json!([
            {"code": "200", "contents": [{"mediaType": "application/json"}]}
        ]));
        assert_eq!(
            negotiate(&op, true, &NegotiationConfig::default()),
            Err(NegotiationError::NotPossibleToGenerate)
        );
        let desired = NegotiationConfig::default().with_dynamic(true);
        assert_eq!(
            negotiate(&op, true, &desired),
            Err(NegotiationError::SchemaNotFound)
        );
    }

    #[test]
    fn test_response_without_content_is_empty() {
        let op = operation(json!([{"code": "204"}]));
        let result = negotiate(&op, true, &NegotiationConfig::default()).unwrap();
        assert_eq!(result.code, ResponseCode::Exact(204));
        assert_eq!(result.body, BodySource::Empty);
        assert_eq!(result.media_type, None);
    }

    #[test]
    fn test_hints_from_request() {
        let request = HttpRequest::new(
            Method::GET,
            "/pets/1?__code=404&__example=cat&__dynamic=false&__contentType=application/xml",
        );
        let config = NegotiationConfig::from_request(&request);
        assert_eq!(config.code, Some(404));
        assert_eq!(config.example_key.as_deref(), Some("cat"));
        assert_eq!(config.dynamic, Some(false));
        assert_eq!(config.media_type.as_deref(), Some("application/xml"));
    }

    #[test]
    fn test_prefer_header_wins_over_query() {
        let request = HttpRequest::new(Method::GET, "/pets/1?__code=404&__example=cat")
            .with_header("Prefer", "code=200, dynamic=true");
        let config = NegotiationConfig::from_request(&request);
        assert_eq!(config.code, Some(200));
        assert_eq!(config.dynamic, Some(true));
        assert_eq!(config.example_key.as_deref(), Some("cat"));
    }

    #[test]
    fn test_unparseable_hints_are_ignored() {
        let request = HttpRequest::new(Method::GET, "/?__code=abc&__dynamic=maybe");
        assert_eq!(
            NegotiationConfig::from_request(&request),
            NegotiationConfig::default()
        );
    }
}

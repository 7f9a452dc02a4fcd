mod request_body;
mod request_parameter;
mod response;
mod security;

use crate::router::PathParams;
use crate::schema::SchemaValidator;
use crate::types::{Diagnostic, HttpRequest, HttpResponse, Operation, ParameterLocation};
use crate::validator::request_body::RequestBodyValidator;
use crate::validator::request_parameter::RequestParameterValidator;
use crate::validator::response::{ResponseBodyValidator, ResponseHeaderValidator};
use crate::validator::security::RequestSecurityValidator;
use std::sync::Arc;

/// Which parts of a request are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestValidation {
    pub enabled: bool,
    pub path: bool,
    pub query: bool,
    pub headers: bool,
    pub cookies: bool,
    pub body: bool,
    pub security: bool,
}

impl Default for RequestValidation {
    fn default() -> Self {
        Self {
            enabled: true,
            path: true,
            query: true,
            headers: true,
            cookies: true,
            body: true,
            security: true,
        }
    }
}

impl RequestValidation {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn checks(&self, location: ParameterLocation) -> bool {
        match location {
            ParameterLocation::Path => self.path,
            ParameterLocation::Query => self.query,
            ParameterLocation::Header => self.headers,
            ParameterLocation::Cookie => self.cookies,
        }
    }
}

/// Which parts of a response are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseValidation {
    pub enabled: bool,
    pub headers: bool,
    pub body: bool,
}

impl Default for ResponseValidation {
    fn default() -> Self {
        Self {
            enabled: true,
            headers: true,
            body: true,
        }
    }
}

impl ResponseValidation {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    pub request: RequestValidation,
    pub response: ResponseValidation,
}

/// One concern of a request or response check.
///
/// Validators never fail: every finding is pushed onto `diagnostics`, so a
/// single pass reports everything wrong with an exchange.
pub(crate) trait Validator {
    fn validate(
        &self,
        operation: &Operation,
        schema: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    );

    /// Root segment of the locations this validator reports.
    fn section(&self) -> &'static str;
}

/// Validates requests and responses of an operation set.
#[derive(Clone)]
pub struct HttpValidator {
    schema: Arc<dyn SchemaValidator>,
    config: ValidationConfig,
}

impl HttpValidator {
    pub fn new(schema: Arc<dyn SchemaValidator>, config: ValidationConfig) -> Self {
        Self { schema, config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn schema(&self) -> &dyn SchemaValidator {
        self.schema.as_ref()
    }

    /// Checks parameters, body and security of `request`. `path_params` holds
    /// the raw path segments captured by routing.
    pub fn validate_request(
        &self,
        operation: &Operation,
        request: &HttpRequest,
        path_params: &PathParams,
    ) -> Vec<Diagnostic> {
        let config = &self.config.request;
        let mut diagnostics = Vec::new();
        if !config.enabled {
            return diagnostics;
        }

        let cookies = request.cookies();
        let locations = [
            ParameterLocation::Path,
            ParameterLocation::Query,
            ParameterLocation::Header,
            ParameterLocation::Cookie,
        ];
        for location in locations.into_iter().filter(|l| config.checks(*l)) {
            RequestParameterValidator::new(location, request, path_params, &cookies).validate(
                operation,
                self.schema(),
                &mut diagnostics,
            );
        }
        if config.body {
            RequestBodyValidator::new(request).validate(operation, self.schema(), &mut diagnostics);
        }
        if config.security {
            RequestSecurityValidator::new(request).validate(
                operation,
                self.schema(),
                &mut diagnostics,
            );
        }

        log::debug!(
            "Request for '{}' produced {} diagnostic(s)",
            operation.id,
            diagnostics.len()
        );
        diagnostics
    }

    /// Checks `response` against the response the operation declares for its status.
    pub fn validate_response(
        &self,
        operation: &Operation,
        response: &HttpResponse,
    ) -> Vec<Diagnostic> {
        let config = &self.config.response;
        let mut diagnostics = Vec::new();
        if !config.enabled {
            return diagnostics;
        }

        if config.headers {
            ResponseHeaderValidator::new(response).validate(
                operation,
                self.schema(),
                &mut diagnostics,
            );
        }
        if config.body {
            ResponseBodyValidator::new(response).validate(
                operation,
                self.schema(),
                &mut diagnostics,
            );
        }
        diagnostics
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::JsonSchemaValidator;
    use crate::types::has_errors;
    use http::Method;
    use serde_json::json;

    pub(crate) fn operation() -> Operation {
        serde_json::from_value(json!({
            "id": "updatePet",
            "method": "put",
            "path": "/pets/{id}",
            "parameters": [
                {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
                {"name": "limit", "in": "query", "schema": {"type": "integer", "maximum": 10}},
                {"name": "x-trace", "in": "header", "required": true, "schema": {"type": "string"}},
                {"name": "session", "in": "cookie", "schema": {"type": "string", "minLength": 3}}
            ],
            "requestBody": {
                "required": true,
                "contents": [{
                    "mediaType": "application/json",
                    "schema": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string"}}
                    }
                }]
            },
            "responses": [{"code": "200"}],
            "security": [[{"key": "bearer", "type": "http", "scheme": "bearer"}]]
        }))
        .unwrap()
    }

    fn validator(config: ValidationConfig) -> HttpValidator {
        HttpValidator::new(Arc::new(JsonSchemaValidator::default()), config)
    }

    fn path_params(id: &str) -> PathParams {
        PathParams::from([("id".to_string(), id.to_string())])
    }

    fn valid_request() -> HttpRequest {
        HttpRequest::new(Method::PUT, "/pets/1?limit=5&__code=404")
            .with_header("x-trace", "abc")
            .with_header("cookie", "session=abcd")
            .with_header("authorization", "Bearer token")
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "Rex"}"#)
    }

    #[test]
    fn test_valid_request_has_no_findings() {
        let diagnostics = validator(ValidationConfig::default()).validate_request(
            &operation(),
            &valid_request(),
            &path_params("1"),
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_findings_accumulate_across_locations() {
        let request = HttpRequest::new(Method::PUT, "/pets/x?limit=50")
            .with_header("cookie", "session=a")
            .with_header("content-type", "application/json")
            .with_body(r#"{}"#);
        let diagnostics = validator(ValidationConfig::default()).validate_request(
            &operation(),
            &request,
            &path_params("x"),
        );
        let locations: Vec<String> = diagnostics.iter().map(|d| d.location.to_string()).collect();
        assert_eq!(
            locations,
            vec!["path.id", "query.limit", "header.x-trace", "cookie.session", "body", "security"]
        );
        assert!(has_errors(&diagnostics));
        assert_eq!(diagnostics.last().map(|d| d.code), Some(401));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = validator(ValidationConfig::default());
        let request = HttpRequest::new(Method::PUT, "/pets/x?limit=abc")
            .with_header("content-type", "text/plain")
            .with_body("nope");
        let first = validator.validate_request(&operation(), &request, &path_params("x"));
        let second = validator.validate_request(&operation(), &request, &path_params("x"));
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_disabled_sections_are_skipped() {
        let config = ValidationConfig {
            request: RequestValidation {
                query: false,
                security: false,
                body: false,
                ..RequestValidation::default()
            },
            ..ValidationConfig::default()
        };
        let request = HttpRequest::new(Method::PUT, "/pets/1?limit=50").with_header("x-trace", "t");
        let diagnostics =
            validator(config).validate_request(&operation(), &request, &path_params("1"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let config = ValidationConfig {
            request: RequestValidation::disabled(),
            response: ResponseValidation::disabled(),
        };
        let request = HttpRequest::new(Method::PUT, "/pets/x");
        assert!(
            validator(config)
                .validate_request(&operation(), &request, &path_params("x"))
                .is_empty()
        );
    }
}

use crate::error::{EngineBuildError, EngineError, RouteError};
use crate::mocker::{Mocker, SchemaExampler, StaticExampler};
use crate::negotiator::{NegotiationConfig, NegotiationResult, negotiate};
use crate::router::{OperationRouter, RouteMatch};
use crate::schema::{JsonSchemaValidator, SchemaValidator};
use crate::types::version::OpenApiVersion;
use crate::types::{Diagnostic, HttpRequest, HttpResponse, Operation, has_errors};
use crate::validator::{HttpValidator, ValidationConfig};
use http::Method;
use std::str::FromStr;
use std::sync::Arc;

/// Everything one mocked exchange produced.
#[derive(Debug, Clone)]
pub struct MockOutcome {
    pub operation_id: String,
    pub negotiated: NegotiationResult,
    pub response: HttpResponse,
    pub request_diagnostics: Vec<Diagnostic>,
    /// Findings on the mocked response itself; empty unless the engine was
    /// built with `validate_mocked_response(true)`.
    pub response_diagnostics: Vec<Diagnostic>,
}

impl MockOutcome {
    pub fn request_is_valid(&self) -> bool {
        !has_errors(&self.request_diagnostics)
    }
}

/// An immutable, fully built operation set with its router, validator and
/// mocker. Safe to share between threads; swap a whole engine to reload.
pub struct ContractEngine {
    operations: Vec<Arc<Operation>>,
    router: OperationRouter,
    validator: HttpValidator,
    mocker: Mocker,
    block_on_errors: bool,
    validate_mocked_response: bool,
}

impl ContractEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    pub fn find_operation(&self, id: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|operation| operation.id == id)
    }

    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        self.router.route(method, path)
    }

    /// Routes `request` and checks it against its operation.
    pub fn validate_request(&self, request: &HttpRequest) -> Result<Vec<Diagnostic>, RouteError> {
        let matched = self.route(&request.method, &request.path)?;
        Ok(self
            .validator
            .validate_request(&matched.operation, request, &matched.path_params))
    }

    /// Checks an upstream `response` against the operation `request` routes to.
    pub fn validate_response(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<Vec<Diagnostic>, RouteError> {
        let matched = self.route(&request.method, &request.path)?;
        Ok(self.validator.validate_response(&matched.operation, response))
    }

    /// Runs the full mock pipeline: route, validate, negotiate, mock and,
    /// when enabled, validate the mocked response.
    pub fn mock(&self, request: &HttpRequest) -> Result<MockOutcome, EngineError> {
        let RouteMatch {
            operation,
            path_params,
        } = self.route(&request.method, &request.path)?;

        let request_diagnostics =
            self.validator
                .validate_request(&operation, request, &path_params);
        let request_is_valid = !(self.block_on_errors && has_errors(&request_diagnostics));
        if !request_is_valid {
            log::debug!(
                "Request for '{}' is invalid: {} finding(s)",
                operation.id,
                request_diagnostics.len()
            );
        }

        let desired = NegotiationConfig::from_request(request);
        let negotiated = negotiate(&operation, request_is_valid, &desired)?;
        let response = self.mocker.mock(&operation, &negotiated)?;

        let response_diagnostics = if self.validate_mocked_response {
            self.validator.validate_response(&operation, &response)
        } else {
            Vec::new()
        };
        for diagnostic in &response_diagnostics {
            log::warn!("Mocked response for '{}': {}", operation.id, diagnostic);
        }

        Ok(MockOutcome {
            operation_id: operation.id.clone(),
            negotiated,
            response,
            request_diagnostics,
            response_diagnostics,
        })
    }
}

pub struct EngineBuilder {
    operations: Vec<Arc<Operation>>,
    validation: ValidationConfig,
    version: Result<OpenApiVersion, EngineBuildError>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    exampler: Option<Arc<dyn SchemaExampler>>,
    block_on_errors: bool,
    validate_mocked_response: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
            validation: ValidationConfig::default(),
            version: Ok(OpenApiVersion::default()),
            schema_validator: None,
            exampler: None,
            block_on_errors: true,
            validate_mocked_response: false,
        }
    }

    pub fn operations<I>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.operations
            .extend(operations.into_iter().map(Arc::new));
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(Arc::new(operation));
        self
    }

    pub fn validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// OpenAPI version of the source document, e.g. `3.0.3`. Selects the
    /// JSON Schema draft.
    pub fn version(mut self, version: impl AsRef<str>) -> Self {
        self.version = OpenApiVersion::from_str(version.as_ref())
            .map_err(|e| EngineBuildError::InvalidVersion(e.to_string()));
        self
    }

    /// Replaces the default `jsonschema` backed validator. Overrides `version`.
    pub fn schema_validator(mut self, schema_validator: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = Some(schema_validator);
        self
    }

    pub fn exampler(mut self, exampler: Arc<dyn SchemaExampler>) -> Self {
        self.exampler = Some(exampler);
        self
    }

    /// When set, Error findings on the request make the engine answer with
    /// the operation's `400` response.
    pub fn block_on_errors(mut self, block: bool) -> Self {
        self.block_on_errors = block;
        self
    }

    pub fn validate_mocked_response(mut self, validate: bool) -> Self {
        self.validate_mocked_response = validate;
        self
    }

    pub fn build(self) -> Result<ContractEngine, EngineBuildError> {
        let version = self.version?;
        let router = OperationRouter::new(self.operations.iter().cloned())?;
        let schema_validator = match self.schema_validator {
            Some(schema_validator) => schema_validator,
            None => Arc::new(JsonSchemaValidator::new(version)),
        };
        let exampler = self
            .exampler
            .unwrap_or_else(|| Arc::new(StaticExampler::default()));

        log::debug!(
            "Built contract engine with {} operation(s) for OpenAPI {}",
            router.len(),
            version
        );
        Ok(ContractEngine {
            operations: self.operations,
            router,
            validator: HttpValidator::new(schema_validator, self.validation),
            mocker: Mocker::new(exampler),
            block_on_errors: self.block_on_errors,
            validate_mocked_response: self.validate_mocked_response,
        })
    }
}

use crate::codec::{self, ParamSource};
use crate::router::PathParams;
use crate::schema::SchemaValidator;
use crate::types::primitive::OpenApiPrimitives;
use crate::types::{Diagnostic, HttpRequest, JsonPath, Operation, Param, ParameterLocation, QueryParams};
use crate::validator::Validator;
use serde_json::Value;

const BAD_REQUEST: u16 = 400;

/// Decodes and checks every declared parameter of one location.
pub(crate) struct RequestParameterValidator<'a> {
    location: ParameterLocation,
    request: &'a HttpRequest,
    path_params: &'a PathParams,
    cookies: &'a QueryParams,
}

impl<'a> RequestParameterValidator<'a> {
    pub(crate) fn new(
        location: ParameterLocation,
        request: &'a HttpRequest,
        path_params: &'a PathParams,
        cookies: &'a QueryParams,
    ) -> Self {
        Self {
            location,
            request,
            path_params,
            cookies,
        }
    }

    fn read(&self, param: &Param, schema: &Value) -> Result<Option<Value>, crate::error::CodecError> {
        let (style, explode) = (param.style(), param.explode());
        match self.location {
            ParameterLocation::Path => match self.path_params.get(&param.name) {
                Some(raw) => codec::deserialize(
                    style,
                    &param.name,
                    ParamSource::Fragment(raw),
                    schema,
                    explode,
                ),
                None => Ok(None),
            },
            ParameterLocation::Header => match self.request.header(&param.name) {
                Some(raw) => codec::deserialize(
                    style,
                    &param.name,
                    ParamSource::Header(&raw),
                    schema,
                    explode,
                ),
                None => Ok(None),
            },
            ParameterLocation::Query => codec::deserialize(
                style,
                &param.name,
                ParamSource::Pairs(&self.request.query),
                schema,
                explode,
            ),
            ParameterLocation::Cookie => codec::deserialize(
                style,
                &param.name,
                ParamSource::Pairs(self.cookies),
                schema,
                explode,
            ),
        }
    }
}

impl Validator for RequestParameterValidator<'_> {
    fn validate(
        &self,
        operation: &Operation,
        schema_validator: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for param in operation.params_in(self.location) {
            let location = JsonPath::from_segments([self.section(), param.name.as_str()]);
            let schema = param.schema.clone().unwrap_or(Value::Bool(true));

            match self.read(param, &schema) {
                Ok(Some(value)) => {
                    let value = OpenApiPrimitives::coerce(&schema, value);
                    diagnostics.extend(schema_validator.validate(
                        &value,
                        &schema,
                        &location,
                        BAD_REQUEST,
                    ));
                }
                Ok(None) if param.required => {
                    diagnostics.push(Diagnostic::error(
                        BAD_REQUEST,
                        &format!(
                            "Missing required {} parameter '{}'",
                            self.location, param.name
                        ),
                        location,
                    ));
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("Cannot decode {} parameter '{}': {}", self.location, param.name, e);
                    diagnostics.push(Diagnostic::error(BAD_REQUEST, &e, location));
                }
            }
        }
    }

    fn section(&self) -> &'static str {
        match self.location {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

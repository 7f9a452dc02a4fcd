use crate::schema::SchemaValidator;
use crate::security;
use crate::types::{Diagnostic, HttpRequest, Operation};
use crate::validator::Validator;

/// Reports at most one finding: the aggregated outcome of the operation's
/// security requirement.
pub(crate) struct RequestSecurityValidator<'a> {
    request: &'a HttpRequest,
}

impl<'a> RequestSecurityValidator<'a> {
    pub(crate) fn new(request: &'a HttpRequest) -> Self {
        Self { request }
    }
}

impl Validator for RequestSecurityValidator<'_> {
    fn validate(
        &self,
        operation: &Operation,
        _schema: &dyn SchemaValidator,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if operation.security.is_empty() {
            log::debug!("Operation '{}' has no security requirement", operation.id);
            return;
        }
        if let Err(diagnostic) = security::evaluate(&operation.security, self.request) {
            diagnostics.push(diagnostic);
        }
    }

    fn section(&self) -> &'static str {
        "security"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::JsonSchemaValidator;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_single_aggregated_finding() {
        let operation: Operation = serde_json::from_value(json!({
            "id": "secured",
            "method": "get",
            "path": "/secured",
            "security": [
                [{"key": "bearer", "type": "http", "scheme": "bearer"}],
                [{"key": "key", "type": "apiKey", "in": "query", "name": "key"}]
            ]
        }))
        .unwrap();
        let validator = JsonSchemaValidator::default();

        let mut diagnostics = Vec::new();
        let anonymous = HttpRequest::new(Method::GET, "/secured");
        RequestSecurityValidator::new(&anonymous).validate(&operation, &validator, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].tags, vec!["Bearer", "apiKey"]);

        let mut diagnostics = Vec::new();
        let keyed = HttpRequest::new(Method::GET, "/secured?key=1");
        RequestSecurityValidator::new(&keyed).validate(&operation, &validator, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }
}

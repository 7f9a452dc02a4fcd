use crate::codec::ParameterStyle;
use crate::types::primitive::OpenApiPrimitives;
use std::fmt::{Display, Formatter};

/// A wire fragment that cannot be read or written in the requested style.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    TypeMismatch {
        style: ParameterStyle,
        expected: OpenApiPrimitives,
        found: OpenApiPrimitives,
    },
    Malformed {
        style: ParameterStyle,
        reason: String,
    },
    UnsupportedValue {
        style: ParameterStyle,
        found: OpenApiPrimitives,
    },
}

impl CodecError {
    pub(crate) fn type_mismatch(
        style: ParameterStyle,
        expected: OpenApiPrimitives,
        found: OpenApiPrimitives,
    ) -> Self {
        CodecError::TypeMismatch {
            style,
            expected,
            found,
        }
    }

    pub(crate) fn malformed<T>(style: ParameterStyle, reason: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        CodecError::Malformed {
            style,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported_value(style: ParameterStyle, found: OpenApiPrimitives) -> Self {
        CodecError::UnsupportedValue { style, found }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::TypeMismatch {
                style,
                expected,
                found,
            } => write!(
                f,
                "Style {} requires a schema of type {} but found {}",
                style, expected, found
            ),
            CodecError::Malformed { style, reason } => {
                write!(f, "Malformed {} value: {}", style, reason)
            }
            CodecError::UnsupportedValue { style, found } => {
                write!(f, "Style {} cannot express a nested {}", style, found)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// A schema the validator engine refused to compile.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    CompilationFailed(String),
}

impl SchemaError {
    pub(crate) fn compilation_failed<T>(message: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        SchemaError::CompilationFailed(message.to_string())
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::CompilationFailed(msg) => write!(f, "Schema compilation failed: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}

/// No response could be selected for the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationError {
    NoBadRequestResponse,
    DataCorrupted,
    NoSuccessResponse,
    CannotDetermineContentType,
    ExampleNotFound(String),
    SchemaNotFound,
    NotPossibleToGenerate,
}

impl Display for NegotiationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationError::NoBadRequestResponse => {
                write!(f, "Request is invalid but no 400 response is defined")
            }
            NegotiationError::DataCorrupted => write!(
                f,
                "The 400 response defines neither examples nor a schema for any content"
            ),
            NegotiationError::NoSuccessResponse => {
                write!(f, "No 2XX response defined, cannot mock")
            }
            NegotiationError::CannotDetermineContentType => {
                write!(f, "Cannot determine the response content type")
            }
            NegotiationError::ExampleNotFound(key) => {
                write!(f, "Response example '{}' not found", key)
            }
            NegotiationError::SchemaNotFound => {
                write!(f, "Dynamic response requested but the content has no schema")
            }
            NegotiationError::NotPossibleToGenerate => write!(
                f,
                "The content has neither examples nor a schema, not possible to generate a response"
            ),
        }
    }
}

impl std::error::Error for NegotiationError {}

/// Failure of a [`SchemaExampler`](crate::mocker::SchemaExampler).
#[derive(Debug, Clone, PartialEq)]
pub enum ExamplerError {
    UnsupportedMediaType(String),
    Generation(String),
}

impl ExamplerError {
    pub(crate) fn generation<T>(message: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        ExamplerError::Generation(message.to_string())
    }
}

impl Display for ExamplerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExamplerError::UnsupportedMediaType(media_type) => {
                write!(f, "Cannot generate a body for media type {}", media_type)
            }
            ExamplerError::Generation(msg) => write!(f, "Body generation failed: {}", msg),
        }
    }
}

impl std::error::Error for ExamplerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum MockError {
    Exampler(ExamplerError),
    ResponseMissing(String),
    ContentMissing(String),
    ExampleMissing(String),
    Serialization(String),
}

impl MockError {
    pub(crate) fn serialization<T>(message: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        MockError::Serialization(message.to_string())
    }
}

impl Display for MockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MockError::Exampler(err) => write!(f, "{}", err),
            MockError::ResponseMissing(code) => write!(f, "Response {} is not declared", code),
            MockError::ContentMissing(media_type) => {
                write!(f, "Content {} is not declared", media_type)
            }
            MockError::ExampleMissing(key) => write!(f, "Example '{}' is not declared", key),
            MockError::Serialization(msg) => write!(f, "Unable to serialize body: {}", msg),
        }
    }
}

impl From<ExamplerError> for MockError {
    fn from(err: ExamplerError) -> Self {
        MockError::Exampler(err)
    }
}

impl std::error::Error for MockError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteError {
    PathNotFound(String),
    MethodNotAllowed { method: String, path: String },
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::PathNotFound(path) => write!(f, "No operation matches path {}", path),
            RouteError::MethodNotAllowed { method, path } => {
                write!(f, "Method {} is not allowed on {}", method, path)
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Terminal failure of one pass through the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Route(RouteError),
    Negotiation(NegotiationError),
    Mock(MockError),
}

impl EngineError {
    /// Status code a caller should answer with.
    pub fn status_hint(&self) -> u16 {
        match self {
            EngineError::Route(RouteError::PathNotFound(_)) => 404,
            EngineError::Route(RouteError::MethodNotAllowed { .. }) => 405,
            EngineError::Negotiation(_) | EngineError::Mock(_) => 500,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Route(err) => write!(f, "Routing failed: {}", err),
            EngineError::Negotiation(err) => write!(f, "Negotiation failed: {}", err),
            EngineError::Mock(err) => write!(f, "Mocking failed: {}", err),
        }
    }
}

impl From<RouteError> for EngineError {
    fn from(err: RouteError) -> Self {
        EngineError::Route(err)
    }
}

impl From<NegotiationError> for EngineError {
    fn from(err: NegotiationError) -> Self {
        EngineError::Negotiation(err)
    }
}

impl From<MockError> for EngineError {
    fn from(err: MockError) -> Self {
        EngineError::Mock(err)
    }
}

impl std::error::Error for EngineError {}

/// The operation set cannot be turned into an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineBuildError {
    InvalidPathTemplate(String),
    DuplicateOperation { method: String, path: String },
    InvalidVersion(String),
}

impl EngineBuildError {
    pub(crate) fn invalid_path_template<T>(message: &T) -> Self
    where
        T: ToString + ?Sized,
    {
        EngineBuildError::InvalidPathTemplate(message.to_string())
    }
}

impl Display for EngineBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineBuildError::InvalidPathTemplate(msg) => {
                write!(f, "Invalid path template: {}", msg)
            }
            EngineBuildError::DuplicateOperation { method, path } => {
                write!(f, "Operation {} {} is declared twice", method, path)
            }
            EngineBuildError::InvalidVersion(msg) => write!(f, "Invalid version: {}", msg),
        }
    }
}

impl std::error::Error for EngineBuildError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_hints() {
        assert_eq!(
            EngineError::from(RouteError::PathNotFound("/x".to_string())).status_hint(),
            404
        );
        assert_eq!(
            EngineError::from(RouteError::MethodNotAllowed {
                method: "PUT".to_string(),
                path: "/x".to_string()
            })
            .status_hint(),
            405
        );
        assert_eq!(
            EngineError::from(NegotiationError::NoSuccessResponse).status_hint(),
            500
        );
    }

    #[test]
    fn test_messages_name_the_missing_example() {
        let err = NegotiationError::ExampleNotFound("bear".to_string());
        assert!(err.to_string().contains("bear"));
    }
}

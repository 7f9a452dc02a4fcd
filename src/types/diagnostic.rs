use crate::types::json_path::JsonPath;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A structured validation finding. Diagnostics are data, never errors: the
/// caller decides whether an `Error` blocks the exchange and how to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// HTTP status hint (400, 401, 403, 415, 500, ...).
    pub code: u16,
    pub message: String,
    pub location: JsonPath,
    /// `WWW-Authenticate` challenges carried by security findings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Diagnostic {
    pub fn error<T>(code: u16, message: &T, location: JsonPath) -> Self
    where
        T: ToString + ?Sized,
    {
        Self {
            severity: Severity::Error,
            code,
            message: message.to_string(),
            location,
            tags: Vec::new(),
        }
    }

    pub fn warning<T>(code: u16, message: &T, location: JsonPath) -> Self
    where
        T: ToString + ?Sized,
    {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message, location)
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.location.is_empty() {
            write!(f, "[{} {}] {}", self.severity, self.code, self.message)
        } else {
            write!(
                f,
                "[{} {}] {}: {}",
                self.severity, self.code, self.location, self.message
            )
        }
    }
}

/// True when any diagnostic has `Error` severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

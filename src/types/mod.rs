pub mod diagnostic;
pub mod json_path;
pub mod operation;
pub mod primitive;
pub mod request;
pub mod version;

pub use diagnostic::{Diagnostic, Severity, has_errors};
pub use json_path::JsonPath;
pub use operation::{
    ApiKeyLocation, Body, Content, Encoding, Example, HttpAuthScheme, Operation, Param, Response,
    ResponseCode, SecurityScheme, SecuritySchemeKind, Server,
};
pub use request::{HttpRequest, HttpResponse, QueryParams};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Header,
    Query,
    Cookie,
    Path,
}

impl Display for ParameterLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = String::from(match self {
            ParameterLocation::Header => "header",
            ParameterLocation::Query => "query",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Path => "path",
        });
        write!(f, "{}", str)
    }
}

use crate::codec::ParameterStyle;
use crate::media_type;
use crate::types::ParameterLocation;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One (method, path) contract entry. Produced by the document loader with
/// every `$ref` already resolved and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Body>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<Response>,
    /// OR of AND-groups. An empty group means anonymous access is allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Vec<SecurityScheme>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
}

impl Operation {
    pub fn params_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Param> {
        self.parameters
            .iter()
            .filter(move |param| param.location == location)
    }

    pub fn find_response(&self, code: &ResponseCode) -> Option<&Response> {
        self.responses.iter().find(|response| &response.code == code)
    }

    /// Response declared for a concrete status: exact code first, then the
    /// `NXX` range, then `default`.
    pub fn response_for_status(&self, status: u16) -> Option<&Response> {
        self.find_response(&ResponseCode::Exact(status))
            .or_else(|| {
                u8::try_from(status / 100)
                    .ok()
                    .and_then(|class| self.find_response(&ResponseCode::Range(class)))
            })
            .or_else(|| self.find_response(&ResponseCode::Default))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

impl Param {
    /// Declared style, or the OpenAPI default for the parameter's location.
    pub fn style(&self) -> ParameterStyle {
        self.style
            .unwrap_or_else(|| ParameterStyle::default_for(self.location))
    }

    /// Declared explode flag; defaults to `true` only for form style.
    pub fn explode(&self) -> bool {
        self.explode
            .unwrap_or_else(|| self.style() == ParameterStyle::Form)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encodings: Vec<Encoding>,
}

impl Content {
    pub fn find_example(&self, key: &str) -> Option<&Example> {
        self.examples.iter().find(|example| example.key == key)
    }

    pub fn find_encoding(&self, property: &str) -> Option<&Encoding> {
        self.encodings
            .iter()
            .find(|encoding| encoding.property == property)
    }
}

/// Per-property serialization override for form and multipart bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Content>,
}

impl Response {
    /// Content declared for `wanted`, compared by essence.
    pub fn find_content(&self, wanted: &str) -> Option<&Content> {
        self.contents
            .iter()
            .find(|content| media_type::same_essence(&content.media_type, wanted))
    }
}

/// A response key: an exact status (`200`), a class wildcard (`2XX`) or `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Exact(u16),
    Range(u8),
    Default,
}

impl ResponseCode {
    pub fn is_success_exact(&self) -> bool {
        matches!(self, ResponseCode::Exact(code) if (200..300).contains(code))
    }

    /// Concrete status used when mocking this response.
    pub fn status(&self) -> u16 {
        match self {
            ResponseCode::Exact(code) => *code,
            ResponseCode::Range(class) => u16::from(*class) * 100,
            ResponseCode::Default => 200,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct InvalidResponseCode(pub String);

impl Display for InvalidResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid response code", self.0)
    }
}

impl std::error::Error for InvalidResponseCode {}

impl FromStr for ResponseCode {
    type Err = InvalidResponseCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("default") {
            return Ok(ResponseCode::Default);
        }
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
            return Err(InvalidResponseCode(s.to_string()));
        }
        if bytes[1..].iter().all(|b| *b == b'X' || *b == b'x') {
            return Ok(ResponseCode::Range(bytes[0] - b'0'));
        }
        match s.parse::<u16>() {
            Ok(code) => Ok(ResponseCode::Exact(code)),
            Err(_) => Err(InvalidResponseCode(s.to_string())),
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseCode::Exact(code) => write!(f, "{}", code),
            ResponseCode::Range(class) => write!(f, "{}XX", class),
            ResponseCode::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let text = match raw {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a response code, found {}",
                    other
                )));
            }
        };
        ResponseCode::from_str(&text).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// Name the scheme is registered under in the document.
    pub key: String,
    #[serde(flatten)]
    pub kind: SecuritySchemeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecuritySchemeKind {
    #[serde(rename = "apiKey")]
    ApiKey {
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        name: String,
    },
    #[serde(rename = "http")]
    Http { scheme: HttpAuthScheme },
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "openIdConnect")]
    OpenIdConnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpAuthScheme {
    #[serde(alias = "Basic")]
    Basic,
    #[serde(alias = "Bearer")]
    Bearer,
    #[serde(alias = "Digest")]
    Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    /// Path portion of the server url (`https://host/v1` gives `/v1`), if any.
    pub fn base_path(&self) -> Option<String> {
        let uri = self.url.parse::<http::Uri>().ok()?;
        let path = uri.path().trim_end_matches('/');
        if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        }
    }
}

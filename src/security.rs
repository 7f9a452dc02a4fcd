//! Evaluation of OR-of-AND security requirements against a request.

use crate::types::{
    ApiKeyLocation, Diagnostic, HttpAuthScheme, HttpRequest, JsonPath, SecurityScheme,
    SecuritySchemeKind,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::header::AUTHORIZATION;

const UNAUTHORIZED_MESSAGE: &str = "Invalid security scheme used";
const FORBIDDEN_MESSAGE: &str = "Invalid credentials used";
const SECURITY_LOCATION: &str = "security";
const DIGEST_FIELDS: [&str; 5] = ["username", "realm", "nonce", "uri", "response"];

/// Why a single scheme or group rejected the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityFailure {
    /// No credential of the expected scheme. Carries one `WWW-Authenticate`
    /// challenge per failing scheme.
    Unauthorized(Vec<String>),
    /// The expected scheme was used with malformed credentials.
    Forbidden,
}

impl SecurityFailure {
    fn unauthorized(challenge: &str) -> Self {
        SecurityFailure::Unauthorized(vec![challenge.to_string()])
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let location = JsonPath::from_segments([SECURITY_LOCATION]);
        match self {
            SecurityFailure::Unauthorized(challenges) => {
                Diagnostic::error(401, UNAUTHORIZED_MESSAGE, location).with_tags(challenges)
            }
            SecurityFailure::Forbidden => Diagnostic::error(403, FORBIDDEN_MESSAGE, location),
        }
    }
}

/// `WWW-Authenticate` challenge advertised when `kind` is missing.
pub fn challenge(kind: &SecuritySchemeKind) -> &'static str {
    match kind {
        SecuritySchemeKind::ApiKey { .. } => "apiKey",
        SecuritySchemeKind::Http {
            scheme: HttpAuthScheme::Basic,
        } => "Basic realm=\"*\"",
        SecuritySchemeKind::Http {
            scheme: HttpAuthScheme::Digest,
        } => "Digest realm=\"*\", nonce=\"abc123\"",
        SecuritySchemeKind::Http {
            scheme: HttpAuthScheme::Bearer,
        } => "Bearer",
        SecuritySchemeKind::OAuth2 => "OAuth2",
        SecuritySchemeKind::OpenIdConnect => "OpenID",
    }
}

/// Passes when any group passes. An empty requirement list or an empty group
/// allows anonymous access.
pub fn evaluate(
    requirements: &[Vec<SecurityScheme>],
    request: &HttpRequest,
) -> Result<(), Diagnostic> {
    if requirements.is_empty() {
        return Ok(());
    }

    let mut failures = Vec::with_capacity(requirements.len());
    for group in requirements {
        match evaluate_group(group, request) {
            Ok(()) => {
                log::debug!(
                    "Security group [{}] satisfied",
                    group
                        .iter()
                        .map(|scheme| scheme.key.as_str())
                        .collect::<Vec<&str>>()
                        .join(", ")
                );
                return Ok(());
            }
            Err(failure) => failures.push(failure),
        }
    }
    log::debug!("No security group satisfied: {:?}", failures);
    Err(aggregate(failures).into_diagnostic())
}

/// The first group's failure decides the outcome. Unless it stands alone or is
/// a 403, the challenges of every group are merged into one 401.
fn aggregate(failures: Vec<SecurityFailure>) -> SecurityFailure {
    let single = failures.len() == 1;
    let mut failures = failures.into_iter();
    let first = match failures.next() {
        Some(first) => first,
        None => return SecurityFailure::Unauthorized(Vec::new()),
    };
    match first {
        SecurityFailure::Unauthorized(mut challenges) if !single => {
            for failure in failures {
                if let SecurityFailure::Unauthorized(more) = failure {
                    challenges.extend(more);
                }
            }
            SecurityFailure::Unauthorized(challenges)
        }
        first => first,
    }
}

/// Every member must pass. A malformed credential wins over missing ones;
/// otherwise the challenges of the failing members are merged in order.
pub fn evaluate_group(group: &[SecurityScheme], request: &HttpRequest) -> Result<(), SecurityFailure> {
    let mut challenges = Vec::new();
    for scheme in group {
        match check_scheme(&scheme.kind, request) {
            Ok(()) => {}
            Err(SecurityFailure::Forbidden) => return Err(SecurityFailure::Forbidden),
            Err(SecurityFailure::Unauthorized(more)) => challenges.extend(more),
        }
    }
    if challenges.is_empty() {
        Ok(())
    } else {
        Err(SecurityFailure::Unauthorized(challenges))
    }
}

pub fn check_scheme(kind: &SecuritySchemeKind, request: &HttpRequest) -> Result<(), SecurityFailure> {
    match kind {
        SecuritySchemeKind::ApiKey { location, name } => {
            check_api_key(*location, name, kind, request)
        }
        SecuritySchemeKind::Http { scheme } => match scheme {
            HttpAuthScheme::Basic => check_authorization(request, "Basic", kind, is_basic_token),
            HttpAuthScheme::Digest => {
                check_authorization(request, "Digest", kind, is_digest_credentials)
            }
            HttpAuthScheme::Bearer => check_authorization(request, "Bearer", kind, is_bearer_token),
        },
        SecuritySchemeKind::OAuth2 | SecuritySchemeKind::OpenIdConnect => {
            check_authorization(request, "Bearer", kind, is_bearer_token)
        }
    }
}

fn check_api_key(
    location: ApiKeyLocation,
    name: &str,
    kind: &SecuritySchemeKind,
    request: &HttpRequest,
) -> Result<(), SecurityFailure> {
    let present = match location {
        ApiKeyLocation::Header => request.header(name).is_some(),
        ApiKeyLocation::Query => request.query.contains(name),
        ApiKeyLocation::Cookie => request
            .cookies()
            .iter()
            .any(|(cookie, value)| cookie == name && value.is_some()),
    };
    if present {
        Ok(())
    } else {
        Err(SecurityFailure::unauthorized(challenge(kind)))
    }
}

/// `Authorization: <scheme> <credentials>`. A different or missing scheme
/// is a 401; the right scheme with credentials failing `valid` is a 403.
fn check_authorization(
    request: &HttpRequest,
    expected: &str,
    kind: &SecuritySchemeKind,
    valid: fn(&str) -> bool,
) -> Result<(), SecurityFailure> {
    let header = request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let Some(header) = header else {
        return Err(SecurityFailure::unauthorized(challenge(kind)));
    };

    let mut parts = header.trim().splitn(2, char::is_whitespace);
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case(expected) {
        return Err(SecurityFailure::unauthorized(challenge(kind)));
    }
    let credentials = parts.next().unwrap_or("").trim();
    if valid(credentials) {
        Ok(())
    } else {
        log::debug!("Malformed {} credentials", expected);
        Err(SecurityFailure::Forbidden)
    }
}

/// base64 of exactly two `:`-separated parts.
fn is_basic_token(token: &str) -> bool {
    let Ok(decoded) = STANDARD.decode(token) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    decoded.split(':').count() == 2
}

fn is_bearer_token(token: &str) -> bool {
    !token.is_empty()
}

/// Every digest field present with a quoted value.
fn is_digest_credentials(credentials: &str) -> bool {
    let fields: Vec<(&str, &str)> = credentials
        .split(',')
        .filter_map(|field| field.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();
    DIGEST_FIELDS.iter().all(|expected| {
        fields.iter().any(|(key, value)| {
            key.eq_ignore_ascii_case(expected)
                && value.len() >= 2
                && value.starts_with('"')
                && value.ends_with('"')
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use http::Method;
    use serde_json::json;

    fn scheme(definition: serde_json::Value) -> SecurityScheme {
        serde_json::from_value(definition).unwrap()
    }

    fn bearer() -> SecurityScheme {
        scheme(json!({"key": "bearer", "type": "http", "scheme": "bearer"}))
    }

    fn basic() -> SecurityScheme {
        scheme(json!({"key": "basic", "type": "http", "scheme": "basic"}))
    }

    fn api_key(location: &str) -> SecurityScheme {
        scheme(json!({"key": "key", "type": "apiKey", "in": location, "name": "x-api-key"}))
    }

    fn oauth2() -> SecurityScheme {
        scheme(json!({"key": "oauth", "type": "oauth2", "scopes": ["read"]}))
    }

    fn request() -> HttpRequest {
        HttpRequest::new(Method::GET, "/pets")
    }

    #[test]
    fn test_two_groups_merge_challenges() {
        let requirements = vec![vec![bearer()], vec![basic()]];
        let diagnostic = evaluate(&requirements, &request()).unwrap_err();
        assert_eq!(diagnostic.code, 401);
        assert_eq!(
            diagnostic.tags,
            vec!["Bearer".to_string(), "Basic realm=\"*\"".to_string()]
        );
    }

    #[test]
    fn test_satisfied_member_contributes_no_challenge() {
        let requirements = vec![vec![api_key("header"), oauth2()]];
        let request = request().with_header("X-API-Key", "secret");
        let diagnostic = evaluate(&requirements, &request).unwrap_err();
        assert_eq!(diagnostic.code, 401);
        assert_eq!(diagnostic.tags, vec!["OAuth2".to_string()]);
    }

    #[test]
    fn test_any_group_passing_is_enough() {
        let requirements = vec![vec![bearer()], vec![basic()]];
        let token = STANDARD.encode("user:pass");
        let request = request().with_header("Authorization", &format!("Basic {}", token));
        assert!(evaluate(&requirements, &request).is_ok());
        assert!(evaluate(&[], &request).is_ok());
        assert!(evaluate(&[vec![]], &request).is_ok());
    }

    #[test]
    fn test_malformed_basic_token_is_forbidden() {
        let token = STANDARD.encode("user:pass:extra");
        let request = request().with_header("Authorization", &format!("Basic {}", token));
        let diagnostic = evaluate(&[vec![basic()]], &request).unwrap_err();
        assert_eq!(diagnostic.code, 403);
        assert!(diagnostic.tags.is_empty());

        let request = HttpRequest::new(Method::GET, "/").with_header("Authorization", "Basic %%%");
        assert_eq!(
            evaluate(&[vec![basic()]], &request).unwrap_err().code,
            403
        );
    }

    #[test]
    fn test_first_group_forbidden_is_surfaced_verbatim() {
        let requirements = vec![vec![basic()], vec![api_key("query")]];
        let request = request().with_header("Authorization", "Basic nope");
        let diagnostic = evaluate(&requirements, &request).unwrap_err();
        assert_eq!(diagnostic.code, 403);
        assert_eq!(diagnostic.message, FORBIDDEN_MESSAGE);
    }

    #[test]
    fn test_bearer_shapes() {
        let ok = request().with_header("authorization", "bearer abc.def");
        assert!(check_scheme(&bearer().kind, &ok).is_ok());
        assert!(check_scheme(&oauth2().kind, &ok).is_ok());

        let empty = request().with_header("authorization", "Bearer");
        assert_eq!(
            check_scheme(&bearer().kind, &empty),
            Err(SecurityFailure::Forbidden)
        );

        let wrong = request().with_header("authorization", "Basic abc");
        let oidc = scheme(json!({"key": "oidc", "type": "openIdConnect"}));
        assert_eq!(
            check_scheme(&oidc.kind, &wrong),
            Err(SecurityFailure::Unauthorized(vec!["OpenID".to_string()]))
        );
    }

    #[test]
    fn test_digest_requires_quoted_fields() {
        let digest = scheme(json!({"key": "digest", "type": "http", "scheme": "digest"}));
        let ok = request().with_header(
            "authorization",
            "Digest username=\"u\", realm=\"r\", nonce=\"n\", uri=\"/\", response=\"x\"",
        );
        assert!(check_scheme(&digest.kind, &ok).is_ok());

        let unquoted = request().with_header(
            "authorization",
            "Digest username=u, realm=\"r\", nonce=\"n\", uri=\"/\", response=\"x\"",
        );
        assert_eq!(
            check_scheme(&digest.kind, &unquoted),
            Err(SecurityFailure::Forbidden)
        );
        let missing = request();
        assert_eq!(
            check_scheme(&digest.kind, &missing),
            Err(SecurityFailure::Unauthorized(vec![
                "Digest realm=\"*\", nonce=\"abc123\"".to_string()
            ]))
        );
    }

    #[test]
    fn test_api_key_locations() {
        let query = HttpRequest::new(Method::GET, "/?x-api-key=1");
        assert!(check_scheme(&api_key("query").kind, &query).is_ok());
        assert!(check_scheme(&api_key("header").kind, &query).is_err());

        let cookie = request().with_header("cookie", "theme=dark; x-api-key=abc");
        assert!(check_scheme(&api_key("cookie").kind, &cookie).is_ok());
        let bare = request().with_header("cookie", "x-api-key");
        assert!(check_scheme(&api_key("cookie").kind, &bare).is_err());
    }
}

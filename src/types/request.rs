use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use percent_encoding::percent_decode_str;

/// Ordered multi-map of query (or cookie) pairs.
///
/// Values are kept as they appeared on the wire; the parameter codec splits
/// them on their style's delimiter before percent-decoding. Names are decoded
/// for lookup but their raw form is kept for deepObject keys. A key that
/// appeared without `=` is stored with a `None` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<QueryPair>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryPair {
    name: String,
    raw_name: String,
    value: Option<String>,
}

impl QueryParams {
    pub fn new() -> Self {
        QueryParams(Vec::new())
    }

    /// Parses a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut params = QueryParams::new();
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, _)) if key.is_empty() => {
                    log::warn!("Invalid query parameter: {}", pair);
                }
                Some((key, value)) => params.push(key, Some(value.to_string())),
                None => params.push(pair, None),
            }
        }
        params
    }

    /// Builds pairs from wire text.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = QueryParams::new();
        for (key, value) in pairs {
            params.push(key.as_ref(), Some(value.into()));
        }
        params
    }

    pub fn push(&mut self, raw_name: &str, value: Option<String>) {
        self.0.push(QueryPair {
            name: decode_query_component(raw_name),
            raw_name: raw_name.to_string(),
            value,
        });
    }

    /// First raw value recorded for `key`. A bare key reads as an empty string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|pair| pair.name == key)
            .map(|pair| pair.value.as_deref().unwrap_or(""))
    }

    /// First value recorded for `key`, percent-decoded.
    pub fn get_decoded(&self, key: &str) -> Option<String> {
        self.get(key).map(decode_query_component)
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|pair| pair.name == key)
            .map(|pair| pair.value.as_deref().unwrap_or(""))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|pair| pair.name == key)
    }

    /// Decoded names with raw values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|pair| (pair.name.as_str(), pair.value.as_deref()))
    }

    /// Names and values exactly as they appeared on the wire.
    pub fn iter_raw(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|pair| (pair.raw_name.as_str(), pair.value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Percent-decodes one query component, reading `+` as a space.
pub fn decode_query_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().to_string()
}

/// Reads every `Cookie` header into an ordered multi-map.
pub fn parse_cookies(headers: &HeaderMap) -> QueryParams {
    let mut cookies = QueryParams::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            log::warn!("Skipping cookie header that is not valid ASCII");
            continue;
        };
        for entry in header.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((name, value)) => cookies.push(name.trim(), Some(value.trim().to_string())),
                None => cookies.push(entry, None),
            }
        }
    }
    cookies
}

/// Joins every value of a header with `,`, the way list-valued headers combine.
pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// A request normalized at the transport boundary.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Builds a request from a method and a `path?query` target.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, QueryParams::parse(query)),
            None => (target, QueryParams::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn cookies(&self) -> QueryParams {
        parse_cookies(&self.headers)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        header_value(&self.headers, name)
    }

    /// Body bytes, treating an empty payload the same as an absent one.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref().filter(|body| !body.is_empty())
    }
}

/// A response as produced by the mocker or received from an upstream.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

pub(crate) fn append_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            headers.append(name, value);
        }
        _ => log::warn!("Skipping invalid header {}: {}", name, value),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_query_keeps_repeated_keys_in_order() {
        let query = QueryParams::parse("a=1&b=x&a=2&a=3");
        assert_eq!(query.get_all("a"), vec!["1", "2", "3"]);
        assert_eq!(query.get("b"), Some("x"));
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_query_names_decoded_values_raw() {
        let query = QueryParams::parse("name=a%20b+c&flag&=skipped&&x%5B0%5D=1&ids=a%2Cb,c");
        assert_eq!(query.get("name"), Some("a%20b+c"));
        assert_eq!(query.get_decoded("name").as_deref(), Some("a b c"));
        assert!(query.contains("flag"));
        assert_eq!(query.iter().nth(1), Some(("flag", None)));
        assert_eq!(query.get("x[0]"), Some("1"));
        assert_eq!(query.iter_raw().nth(2), Some(("x%5B0%5D", Some("1"))));
        assert_eq!(query.get("ids"), Some("a%2Cb,c"));
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_cookie_parsing() {
        let request = HttpRequest::new(Method::GET, "/")
            .with_header("cookie", "session=abc; theme=dark")
            .with_header("cookie", "lang=en");
        let cookies = request.cookies();
        assert_eq!(cookies.get("session"), Some("abc"));
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.get("lang"), Some("en"));
    }

    #[test]
    fn test_request_target_split() {
        let request = HttpRequest::new(Method::POST, "/pets/1?limit=5");
        assert_eq!(request.path, "/pets/1");
        assert_eq!(request.query.get("limit"), Some("5"));
        assert!(request.body_bytes().is_none());
        let request = request.with_body("");
        assert!(request.body_bytes().is_none());
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let request = HttpRequest::new(Method::GET, "/")
            .with_header("x-ids", "1")
            .with_header("X-Ids", "2");
        assert_eq!(request.header("x-ids").as_deref(), Some("1,2"));
    }
}

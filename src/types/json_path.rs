use crate::{ENCODED_BACKSLASH, ENCODED_TILDE, PATH_SEPARATOR, TILDE};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Ordered list of segment names locating a finding inside a request or
/// response, e.g. `["body", "id"]` or `["query", "limit"]`.
///
/// Segments are stored raw. Escaping only happens when the path is rendered
/// as a JSON pointer.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq, Hash)]
pub struct JsonPath(pub Vec<String>);

impl JsonPath {
    pub fn new() -> Self {
        JsonPath(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JsonPath(segments.into_iter().map(Into::into).collect())
    }

    pub fn add(&mut self, segment: impl AsRef<str>) -> &mut Self {
        self.0.push(segment.as_ref().to_owned());
        self
    }

    /// Returns a copy of this path with `segment` appended.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let mut joined = self.clone();
        joined.add(segment);
        joined
    }

    /// Appends every segment of an RFC 6901 pointer (`/a/b~1c`), unescaping each one.
    pub fn extend_from_pointer(&mut self, pointer: &str) -> &mut Self {
        for segment in pointer.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            let segment = segment
                .replace(ENCODED_BACKSLASH, PATH_SEPARATOR)
                .replace(ENCODED_TILDE, TILDE);
            self.0.push(segment);
        }
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the path as a JSON pointer without the leading separator.
    pub fn format_path(&self) -> String {
        self.0
            .iter()
            .map(|segment| {
                if segment.contains(TILDE) || segment.contains(PATH_SEPARATOR) {
                    segment
                        .replace(TILDE, ENCODED_TILDE)
                        .replace(PATH_SEPARATOR, ENCODED_BACKSLASH)
                } else {
                    segment.clone()
                }
            })
            .collect::<Vec<String>>()
            .join(PATH_SEPARATOR)
    }
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

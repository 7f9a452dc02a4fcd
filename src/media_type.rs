//! Wildcard-aware media type comparison.
//!
//! Quality weights are ignored: callers walk their declared contents in order
//! and take the first match.

use crate::JSON_MEDIA_TYPE;

/// `type/subtype+suffix`, lower-cased, parameters dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: String,
    pub subtype: String,
    pub suffix: Option<String>,
}

impl MediaType {
    /// Returns `None` when `raw` is not of the form `type/subtype`.
    pub fn parse(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
        let (kind, rest) = essence.split_once('/')?;
        if kind.is_empty() || rest.is_empty() || rest.contains('/') {
            return None;
        }
        let (subtype, suffix) = match rest.rsplit_once('+') {
            Some((subtype, suffix)) if !subtype.is_empty() && !suffix.is_empty() => {
                (subtype.to_string(), Some(suffix.to_string()))
            }
            Some(_) => return None,
            None => (rest.to_string(), None),
        };
        Some(Self {
            kind: kind.to_string(),
            subtype,
            suffix,
        })
    }

    /// `self` is accepted by `pattern`. A vendor type also satisfies its
    /// structured-syntax suffix, so `application/vnd.x+json` matches `application/json`.
    pub fn matches(&self, pattern: &MediaType) -> bool {
        let kind = pattern.kind == "*" || self.kind == pattern.kind;
        let subtype = pattern.subtype == "*"
            || self.subtype == pattern.subtype
            || self.suffix.as_deref() == Some(pattern.subtype.as_str());
        kind && subtype
    }

    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.suffix.as_deref() == Some("json")
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.kind == "application" && self.subtype == "x-www-form-urlencoded"
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == "*" || self.subtype == "*"
    }
}

/// Never fails: an unparseable side simply does not match.
pub fn matches(candidate: &str, pattern: &str) -> bool {
    match (MediaType::parse(candidate), MediaType::parse(pattern)) {
        (Some(candidate), Some(pattern)) => candidate.matches(&pattern),
        _ => false,
    }
}

/// Both sides name the same media type once parameters are dropped.
pub fn same_essence(left: &str, right: &str) -> bool {
    match (MediaType::parse(left), MediaType::parse(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

pub fn is_json(raw: &str) -> bool {
    MediaType::parse(raw).is_some_and(|media_type| media_type.is_json())
}

/// Index of the declared media type that best accepts `content_type`: an
/// exact match first, then the first declared pattern that matches.
pub fn find_compatible<'a, I>(content_type: &str, declared: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let declared = declared.into_iter();
    let candidate = MediaType::parse(content_type)?;
    declared
        .clone()
        .position(|media_type| MediaType::parse(media_type).as_ref() == Some(&candidate))
        .or_else(|| {
            declared.clone().position(|media_type| {
                MediaType::parse(media_type).is_some_and(|pattern| candidate.matches(&pattern))
            })
        })
}

/// Index of the first declared `application/json`, ignoring parameters.
pub fn find_json<'a, I>(declared: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    declared
        .into_iter()
        .position(|media_type| same_essence(media_type, JSON_MEDIA_TYPE))
}

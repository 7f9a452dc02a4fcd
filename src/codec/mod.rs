//! Parameter (de)serialization for the seven OpenAPI encoding styles.
//!
//! Serialization turns a JSON value into a wire fragment (used when building
//! example request URIs or mocked headers). Deserialization reads a raw wire
//! fragment back into a JSON value whose leaves are strings. Fragments are
//! split on the style's delimiters first and every item is percent-decoded
//! afterwards, so an escaped delimiter inside a value survives. Coercion to the schema's primitive types happens afterwards in
//! [`OpenApiPrimitives::coerce`](crate::types::primitive::OpenApiPrimitives::coerce).

mod deep_object;
mod path;
mod query;

use crate::error::CodecError;
use crate::types::primitive::OpenApiPrimitives;
use crate::types::request::decode_query_component;
use crate::types::{ParameterLocation, QueryParams};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Characters left untouched by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Simple,
    Label,
    Matrix,
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn default_for(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
        }
    }
}

impl Display for ParameterStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterStyle::Simple => write!(f, "simple"),
            ParameterStyle::Label => write!(f, "label"),
            ParameterStyle::Matrix => write!(f, "matrix"),
            ParameterStyle::Form => write!(f, "form"),
            ParameterStyle::SpaceDelimited => write!(f, "spaceDelimited"),
            ParameterStyle::PipeDelimited => write!(f, "pipeDelimited"),
            ParameterStyle::DeepObject => write!(f, "deepObject"),
        }
    }
}

/// Where a parameter's raw value comes from.
#[derive(Debug, Clone, Copy)]
pub enum ParamSource<'a> {
    /// A single percent-encoded value, such as a path segment.
    Fragment(&'a str),
    /// A header value, taken verbatim.
    Header(&'a str),
    /// Name/value pairs as they appeared on the wire: the query string, a
    /// form body or the cookie jar.
    Pairs(&'a QueryParams),
}

/// Turns one raw item into its text.
pub(crate) type Decode = fn(&str) -> String;

impl ParamSource<'_> {
    fn decoder(&self) -> Decode {
        match self {
            ParamSource::Fragment(_) => decode_uri_component,
            ParamSource::Header(_) => verbatim,
            ParamSource::Pairs(_) => decode_query_component,
        }
    }
}

/// Serializes `value` for a URI. Reserved characters inside values are percent-encoded.
pub fn serialize(
    style: ParameterStyle,
    name: &str,
    value: &Value,
    explode: bool,
) -> Result<String, CodecError> {
    serialize_with(style, name, value, explode, encode_component)
}

/// Serializes `value` as a header value: Simple style, nothing percent-encoded.
pub fn serialize_header(value: &Value, explode: bool) -> Result<String, CodecError> {
    path::serialize_simple(value, explode, &|raw: &str| raw.to_string())
}

fn serialize_with(
    style: ParameterStyle,
    name: &str,
    value: &Value,
    explode: bool,
    encode: fn(&str) -> String,
) -> Result<String, CodecError> {
    match style {
        ParameterStyle::Simple => path::serialize_simple(value, explode, &encode),
        ParameterStyle::Label => path::serialize_label(value, explode, &encode),
        ParameterStyle::Matrix => path::serialize_matrix(name, value, explode, &encode),
        ParameterStyle::Form => query::serialize_form(name, value, explode, &encode),
        ParameterStyle::SpaceDelimited => {
            query::serialize_delimited(style, name, value, explode, "%20", &encode)
        }
        ParameterStyle::PipeDelimited => {
            query::serialize_delimited(style, name, value, explode, "|", &encode)
        }
        ParameterStyle::DeepObject => deep_object::serialize(name, value, &encode),
    }
}

/// Reads the parameter `name` from `source` according to `style`.
///
/// Returns `Ok(None)` when the parameter is absent.
pub fn deserialize(
    style: ParameterStyle,
    name: &str,
    source: ParamSource<'_>,
    schema: &Value,
    explode: bool,
) -> Result<Option<Value>, CodecError> {
    let decode = source.decoder();
    match style {
        ParameterStyle::Simple => fragment_of(name, source)
            .map(|fragment| path::deserialize_simple(fragment, schema, explode, decode))
            .transpose(),
        ParameterStyle::Label => fragment_of(name, source)
            .map(|fragment| path::deserialize_label(fragment, schema, explode, decode))
            .transpose(),
        ParameterStyle::Matrix => fragment_of(name, source)
            .map(|fragment| path::deserialize_matrix(name, fragment, schema, explode, decode))
            .transpose(),
        ParameterStyle::Form => {
            query::deserialize_form(name, &pairs_of(name, source), schema, explode, decode)
        }
        ParameterStyle::SpaceDelimited => query::deserialize_delimited(
            style,
            name,
            &pairs_of(name, source),
            schema,
            explode,
            SPACE_DELIMITERS,
            decode,
        ),
        ParameterStyle::PipeDelimited => query::deserialize_delimited(
            style,
            name,
            &pairs_of(name, source),
            schema,
            explode,
            PIPE_DELIMITERS,
            decode,
        ),
        ParameterStyle::DeepObject => {
            deep_object::deserialize(name, &pairs_of(name, source), schema, decode)
        }
    }
}

/// A space may arrive escaped, as `+` or bare.
const SPACE_DELIMITERS: &[&str] = &["%20", "+", " "];
const PIPE_DELIMITERS: &[&str] = &["|"];
const COMMA_DELIMITERS: &[&str] = &[","];

fn fragment_of<'a>(name: &str, source: ParamSource<'a>) -> Option<&'a str> {
    match source {
        ParamSource::Fragment(fragment) | ParamSource::Header(fragment) => Some(fragment),
        ParamSource::Pairs(pairs) => pairs.get(name),
    }
}

fn pairs_of<'a>(name: &str, source: ParamSource<'a>) -> Cow<'a, QueryParams> {
    match source {
        ParamSource::Pairs(pairs) => Cow::Borrowed(pairs),
        ParamSource::Fragment(fragment) | ParamSource::Header(fragment) => {
            Cow::Owned(QueryParams::from_pairs([(name, fragment)]))
        }
    }
}

fn decode_uri_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().to_string()
}

fn verbatim(raw: &str) -> String {
    raw.to_string()
}

pub(crate) fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Renders a scalar for the wire. Composite values nested inside a composite
/// cannot be expressed by any style except deepObject.
fn encode_scalar(
    style: ParameterStyle,
    value: &Value,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(encode(s)),
        Value::Array(_) | Value::Object(_) => Err(CodecError::unsupported_value(
            style,
            OpenApiPrimitives::of_value(value),
        )),
    }
}

fn encode_items(
    style: ParameterStyle,
    items: &[Value],
    encode: &dyn Fn(&str) -> String,
) -> Result<Vec<String>, CodecError> {
    items
        .iter()
        .map(|item| encode_scalar(style, item, encode))
        .collect()
}

/// `k1,v1,k2,v2`
fn encode_flat_pairs(
    style: ParameterStyle,
    entries: &Map<String, Value>,
    encode: &dyn Fn(&str) -> String,
) -> Result<Vec<String>, CodecError> {
    let mut flat = Vec::with_capacity(entries.len() * 2);
    for (key, value) in entries {
        flat.push(encode(key));
        flat.push(encode_scalar(style, value, encode)?);
    }
    Ok(flat)
}

/// `k1=v1`, `k2=v2`
fn encode_assignments(
    style: ParameterStyle,
    entries: &Map<String, Value>,
    encode: &dyn Fn(&str) -> String,
) -> Result<Vec<String>, CodecError> {
    entries
        .iter()
        .map(|(key, value)| Ok(format!("{}={}", encode(key), encode_scalar(style, value, encode)?)))
        .collect()
}

/// Splits raw wire text wherever one of `delimiters` starts.
fn split_wire<'a>(raw: &'a str, delimiters: &[&str]) -> Vec<&'a str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < raw.len() {
        let rest = &raw[index..];
        match delimiters.iter().find(|delimiter| rest.starts_with(**delimiter)) {
            Some(delimiter) => {
                items.push(&raw[start..index]);
                index += delimiter.len();
                start = index;
            }
            None => index += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    items.push(&raw[start..]);
    items
}

/// Like [`split_wire`], but an empty fragment holds no items.
fn non_empty_split<'a>(raw: &'a str, delimiters: &[&str]) -> Vec<&'a str> {
    if raw.is_empty() {
        Vec::new()
    } else {
        split_wire(raw, delimiters)
    }
}

fn split_list(raw: &str, delimiters: &[&str], decode: Decode) -> Vec<Value> {
    non_empty_split(raw, delimiters)
        .into_iter()
        .map(|item| Value::String(decode(item)))
        .collect()
}

/// Reads alternating `key,value` items into an object.
fn object_from_flat_pairs(
    style: ParameterStyle,
    items: &[&str],
    decode: Decode,
) -> Result<Value, CodecError> {
    if items.len() % 2 != 0 {
        return Err(CodecError::malformed(
            style,
            &format!(
                "expected alternating keys and values but found {} items",
                items.len()
            ),
        ));
    }
    let mut object = Map::new();
    for pair in items.chunks(2) {
        object.insert(decode(pair[0]), Value::String(decode(pair[1])));
    }
    Ok(Value::Object(object))
}

/// Reads `key=value` items into an object.
fn object_from_assignments(
    style: ParameterStyle,
    items: &[&str],
    decode: Decode,
) -> Result<Value, CodecError> {
    let mut object = Map::new();
    for item in items.iter().filter(|item| !item.is_empty()) {
        match item.split_once('=') {
            Some((key, value)) => {
                object.insert(decode(key), Value::String(decode(value)));
            }
            None => {
                return Err(CodecError::malformed(
                    style,
                    &format!("'{}' is not a key=value pair", item),
                ));
            }
        }
    }
    Ok(Value::Object(object))
}

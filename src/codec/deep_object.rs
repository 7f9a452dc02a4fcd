use super::{Decode, ParameterStyle, encode_scalar, verbatim};
use crate::error::CodecError;
use crate::types::QueryParams;
use crate::types::primitive::OpenApiPrimitives;
use serde_json::{Map, Value};
use std::borrow::Cow;

const STYLE: ParameterStyle = ParameterStyle::DeepObject;

/// Writes `name[k1]=v1&name[k2][k21]=v2`. Array members use `[]` and a
/// `null` leaf is written as a bare key.
pub(super) fn serialize(
    name: &str,
    value: &Value,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let Value::Object(entries) = value else {
        return Err(CodecError::type_mismatch(
            STYLE,
            OpenApiPrimitives::Object,
            OpenApiPrimitives::of_value(value),
        ));
    };
    let mut pairs = Vec::new();
    let prefix = encode(name);
    for (key, entry) in entries {
        flatten(format!("{}[{}]", prefix, encode(key)), entry, encode, &mut pairs)?;
    }
    Ok(pairs.join("&"))
}

fn flatten(
    prefix: String,
    value: &Value,
    encode: &dyn Fn(&str) -> String,
    out: &mut Vec<String>,
) -> Result<(), CodecError> {
    match value {
        Value::Object(entries) => {
            for (key, entry) in entries {
                flatten(format!("{}[{}]", prefix, encode(key)), entry, encode, out)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(format!("{}[]", prefix), item, encode, out)?;
            }
        }
        Value::Null => out.push(prefix),
        scalar => out.push(format!("{}={}", prefix, encode_scalar(STYLE, scalar, encode)?)),
    }
    Ok(())
}

/// Rebuilds the object named `name` from bracketed query keys.
///
/// Brackets are read from the raw key, so a bracket escaped inside a property
/// name stays part of it. A key sent fully escaped (`a%5Bk%5D`) is decoded
/// first. A bare key (no `=`) anywhere under `name` turns the whole result
/// into `null`.
pub(super) fn deserialize(
    name: &str,
    pairs: &QueryParams,
    schema: &Value,
    decode: Decode,
) -> Result<Option<Value>, CodecError> {
    if !OpenApiPrimitives::schema_is(schema, OpenApiPrimitives::Object) {
        return Err(CodecError::type_mismatch(
            STYLE,
            OpenApiPrimitives::Object,
            OpenApiPrimitives::primary_type(schema).unwrap_or(OpenApiPrimitives::Null),
        ));
    }

    let mut root = Value::Null;
    let mut found = false;
    let mut has_null_leaf = false;
    for (raw_key, value) in pairs.iter_raw() {
        let (key, decode_segment): (Cow<'_, str>, Decode) = if raw_key.contains('[') {
            (Cow::Borrowed(raw_key), decode)
        } else {
            (Cow::Owned(decode(raw_key)), verbatim)
        };
        let Some(open) = key.find('[') else {
            continue;
        };
        if decode_segment(&key[..open]) != name {
            continue;
        }
        found = true;
        let segments: Vec<String> = parse_segments(&key, &key[open..])?
            .into_iter()
            .map(decode_segment)
            .collect();
        match value {
            Some(value) => insert(&mut root, &segments, Value::String(decode(value)))?,
            None => has_null_leaf = true,
        }
    }

    if !found {
        return Ok(None);
    }
    if has_null_leaf {
        log::debug!("Parameter '{}' has a bare key, reading it as null", name);
        return Ok(Some(Value::Null));
    }
    Ok(Some(root))
}

/// `[a][][b]` -> `["a", "", "b"]`
fn parse_segments<'a>(key: &str, mut brackets: &'a str) -> Result<Vec<&'a str>, CodecError> {
    let mut segments = Vec::new();
    while !brackets.is_empty() {
        let Some(inner) = brackets.strip_prefix('[') else {
            return Err(CodecError::malformed(
                STYLE,
                &format!("unexpected text after brackets in '{}'", key),
            ));
        };
        let Some(close) = inner.find(']') else {
            return Err(CodecError::malformed(
                STYLE,
                &format!("unclosed bracket in '{}'", key),
            ));
        };
        let segment = &inner[..close];
        if segment.contains('[') {
            return Err(CodecError::malformed(
                STYLE,
                &format!("nested bracket in '{}'", key),
            ));
        }
        segments.push(segment);
        brackets = &inner[close + 1..];
    }
    Ok(segments)
}

fn insert(target: &mut Value, segments: &[String], value: Value) -> Result<(), CodecError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    if target.is_null() {
        *target = if segment.is_empty() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }

    match (target, segment.is_empty()) {
        (Value::Array(items), true) => {
            if rest.is_empty() {
                items.push(value);
                return Ok(());
            }
            // Keep filling the last member until one of its keys would be overwritten.
            let reuse = items
                .last()
                .is_some_and(|last| last.is_object() && !occupied(last, rest));
            if !reuse {
                items.push(Value::Null);
            }
            match items.last_mut() {
                Some(last) => insert(last, rest, value),
                None => Ok(()),
            }
        }
        (Value::Object(entries), false) => {
            if rest.is_empty() {
                entries.entry(segment.clone()).or_insert(value);
                return Ok(());
            }
            let child = entries.entry(segment.clone()).or_insert(Value::Null);
            insert(child, rest, value)
        }
        (other, _) => Err(CodecError::malformed(
            STYLE,
            &format!(
                "segment '[{}]' conflicts with an existing {}",
                segment,
                OpenApiPrimitives::of_value(other)
            ),
        )),
    }
}

fn occupied(value: &Value, segments: &[String]) -> bool {
    let mut current = value;
    for segment in segments {
        if segment.is_empty() {
            return false;
        }
        match current.get(segment.as_str()) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

use super::{
    COMMA_DELIMITERS, Decode, ParameterStyle, encode_assignments, encode_flat_pairs, encode_items,
    encode_scalar, non_empty_split, object_from_flat_pairs, split_list,
};
use crate::error::CodecError;
use crate::types::QueryParams;
use crate::types::primitive::OpenApiPrimitives;
use crate::{PROPERTIES_FIELD, RESERVED_QUERY_PREFIX};
use serde_json::{Map, Value};

pub(super) fn serialize_form(
    name: &str,
    value: &Value,
    explode: bool,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let style = ParameterStyle::Form;
    let name = encode(name);
    match value {
        Value::Array(items) if explode => Ok(repeat_name(&name, encode_items(style, items, encode)?)),
        Value::Array(items) => Ok(format!(
            "{}={}",
            name,
            encode_items(style, items, encode)?.join(",")
        )),
        Value::Object(entries) if explode => {
            Ok(encode_assignments(style, entries, encode)?.join("&"))
        }
        Value::Object(entries) => Ok(format!(
            "{}={}",
            name,
            encode_flat_pairs(style, entries, encode)?.join(",")
        )),
        scalar => Ok(format!("{}={}", name, encode_scalar(style, scalar, encode)?)),
    }
}

/// spaceDelimited and pipeDelimited: arrays only.
pub(super) fn serialize_delimited(
    style: ParameterStyle,
    name: &str,
    value: &Value,
    explode: bool,
    delimiter: &str,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let Value::Array(items) = value else {
        return Err(CodecError::type_mismatch(
            style,
            OpenApiPrimitives::Array,
            OpenApiPrimitives::of_value(value),
        ));
    };
    let name = encode(name);
    let items = encode_items(style, items, encode)?;
    if explode {
        Ok(repeat_name(&name, items))
    } else {
        Ok(format!("{}={}", name, items.join(delimiter)))
    }
}

fn repeat_name(name: &str, items: Vec<String>) -> String {
    items
        .into_iter()
        .map(|item| format!("{}={}", name, item))
        .collect::<Vec<String>>()
        .join("&")
}

pub(super) fn deserialize_form(
    name: &str,
    pairs: &QueryParams,
    schema: &Value,
    explode: bool,
    decode: Decode,
) -> Result<Option<Value>, CodecError> {
    let style = ParameterStyle::Form;
    match OpenApiPrimitives::primary_type(schema) {
        Some(OpenApiPrimitives::Array) => {
            if explode {
                Ok(exploded_array(name, pairs, decode))
            } else {
                Ok(pairs
                    .get(name)
                    .map(|joined| Value::Array(split_list(joined, COMMA_DELIMITERS, decode))))
            }
        }
        Some(OpenApiPrimitives::Object) => {
            if explode {
                Ok(exploded_object(pairs, schema, decode))
            } else {
                match pairs.get(name) {
                    Some(joined) => {
                        let items = non_empty_split(joined, COMMA_DELIMITERS);
                        object_from_flat_pairs(style, &items, decode).map(Some)
                    }
                    None => Ok(None),
                }
            }
        }
        _ => Ok(pairs.get(name).map(|value| Value::String(decode(value)))),
    }
}

pub(super) fn deserialize_delimited(
    style: ParameterStyle,
    name: &str,
    pairs: &QueryParams,
    schema: &Value,
    explode: bool,
    delimiters: &[&str],
    decode: Decode,
) -> Result<Option<Value>, CodecError> {
    if !OpenApiPrimitives::schema_is(schema, OpenApiPrimitives::Array) {
        return Err(CodecError::type_mismatch(
            style,
            OpenApiPrimitives::Array,
            OpenApiPrimitives::primary_type(schema).unwrap_or(OpenApiPrimitives::Null),
        ));
    }
    if explode {
        return Ok(exploded_array(name, pairs, decode));
    }
    Ok(pairs
        .get(name)
        .map(|joined| Value::Array(split_list(joined, delimiters, decode))))
}

/// `name=a&name=b`
fn exploded_array(name: &str, pairs: &QueryParams, decode: Decode) -> Option<Value> {
    let values = pairs.get_all(name);
    if values.is_empty() {
        return None;
    }
    Some(Value::Array(
        values
            .into_iter()
            .map(|value| Value::String(decode(value)))
            .collect(),
    ))
}

/// `k1=v1&k2=v2`. Keys are limited to the schema's declared properties when
/// it has any; otherwise every non-reserved pair is taken.
fn exploded_object(pairs: &QueryParams, schema: &Value, decode: Decode) -> Option<Value> {
    let declared = schema.get(PROPERTIES_FIELD).and_then(Value::as_object);
    let mut object = Map::new();
    for (key, value) in pairs.iter() {
        let wanted = match declared {
            Some(properties) => properties.contains_key(key),
            None => !key.starts_with(RESERVED_QUERY_PREFIX),
        };
        if wanted && !object.contains_key(key) {
            object.insert(key.to_string(), Value::String(decode(value.unwrap_or(""))));
        }
    }
    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}

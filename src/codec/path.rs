use super::{
    COMMA_DELIMITERS, Decode, ParameterStyle, encode_assignments, encode_flat_pairs, encode_items,
    encode_scalar, non_empty_split, object_from_assignments, object_from_flat_pairs, split_list,
};
use crate::error::CodecError;
use crate::types::primitive::OpenApiPrimitives;
use serde_json::Value;

const LABEL_PREFIX: char = '.';
const MATRIX_PREFIX: char = ';';

pub(super) fn serialize_simple(
    value: &Value,
    explode: bool,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let style = ParameterStyle::Simple;
    match value {
        Value::Array(items) => Ok(encode_items(style, items, encode)?.join(",")),
        Value::Object(entries) if explode => {
            Ok(encode_assignments(style, entries, encode)?.join(","))
        }
        Value::Object(entries) => Ok(encode_flat_pairs(style, entries, encode)?.join(",")),
        scalar => encode_scalar(style, scalar, encode),
    }
}

pub(super) fn serialize_label(
    value: &Value,
    explode: bool,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let style = ParameterStyle::Label;
    let separator = if explode { "." } else { "," };
    let body = match value {
        Value::Array(items) => encode_items(style, items, encode)?.join(separator),
        Value::Object(entries) if explode => {
            encode_assignments(style, entries, encode)?.join(separator)
        }
        Value::Object(entries) => encode_flat_pairs(style, entries, encode)?.join(separator),
        scalar => encode_scalar(style, scalar, encode)?,
    };
    Ok(format!("{}{}", LABEL_PREFIX, body))
}

pub(super) fn serialize_matrix(
    name: &str,
    value: &Value,
    explode: bool,
    encode: &dyn Fn(&str) -> String,
) -> Result<String, CodecError> {
    let style = ParameterStyle::Matrix;
    let name = encode(name);
    match value {
        Value::Array(items) if explode => Ok(encode_items(style, items, encode)?
            .into_iter()
            .map(|item| format!(";{}={}", name, item))
            .collect()),
        Value::Array(items) => Ok(format!(
            ";{}={}",
            name,
            encode_items(style, items, encode)?.join(",")
        )),
        Value::Object(entries) if explode => Ok(encode_assignments(style, entries, encode)?
            .into_iter()
            .map(|assignment| format!(";{}", assignment))
            .collect()),
        Value::Object(entries) => Ok(format!(
            ";{}={}",
            name,
            encode_flat_pairs(style, entries, encode)?.join(",")
        )),
        scalar => Ok(format!(";{}={}", name, encode_scalar(style, scalar, encode)?)),
    }
}

pub(super) fn deserialize_simple(
    fragment: &str,
    schema: &Value,
    explode: bool,
    decode: Decode,
) -> Result<Value, CodecError> {
    let style = ParameterStyle::Simple;
    match OpenApiPrimitives::primary_type(schema) {
        Some(OpenApiPrimitives::Array) => Ok(Value::Array(split_list(fragment, COMMA_DELIMITERS, decode))),
        Some(OpenApiPrimitives::Object) => {
            let items = non_empty_split(fragment, COMMA_DELIMITERS);
            if explode {
                object_from_assignments(style, &items, decode)
            } else {
                object_from_flat_pairs(style, &items, decode)
            }
        }
        _ => Ok(Value::String(decode(fragment))),
    }
}

pub(super) fn deserialize_label(
    fragment: &str,
    schema: &Value,
    explode: bool,
    decode: Decode,
) -> Result<Value, CodecError> {
    let style = ParameterStyle::Label;
    let Some(body) = fragment.strip_prefix(LABEL_PREFIX) else {
        return Err(CodecError::malformed(
            style,
            &format!("'{}' does not start with '{}'", fragment, LABEL_PREFIX),
        ));
    };
    let separator: &[&str] = if explode { &["."] } else { COMMA_DELIMITERS };
    match OpenApiPrimitives::primary_type(schema) {
        Some(OpenApiPrimitives::Array) => Ok(Value::Array(split_list(body, separator, decode))),
        Some(OpenApiPrimitives::Object) => {
            let items = non_empty_split(body, separator);
            if explode {
                object_from_assignments(style, &items, decode)
            } else {
                object_from_flat_pairs(style, &items, decode)
            }
        }
        _ => Ok(Value::String(decode(body))),
    }
}

pub(super) fn deserialize_matrix(
    name: &str,
    fragment: &str,
    schema: &Value,
    explode: bool,
    decode: Decode,
) -> Result<Value, CodecError> {
    let style = ParameterStyle::Matrix;
    if !fragment.starts_with(MATRIX_PREFIX) {
        return Err(CodecError::malformed(
            style,
            &format!("'{}' does not start with '{}'", fragment, MATRIX_PREFIX),
        ));
    }
    let entries: Vec<&str> = fragment
        .split(MATRIX_PREFIX)
        .filter(|entry| !entry.is_empty())
        .collect();

    match OpenApiPrimitives::primary_type(schema) {
        Some(OpenApiPrimitives::Object) if explode => {
            object_from_assignments(style, &entries, decode)
        }
        Some(OpenApiPrimitives::Array) if explode => {
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                items.push(Value::String(decode(named_value(style, name, entry, decode)?)));
            }
            Ok(Value::Array(items))
        }
        primary => {
            let [entry] = entries.as_slice() else {
                return Err(CodecError::malformed(
                    style,
                    &format!("expected a single '{}' entry in '{}'", name, fragment),
                ));
            };
            let value = named_value(style, name, entry, decode)?;
            match primary {
                Some(OpenApiPrimitives::Array) => {
                    Ok(Value::Array(split_list(value, COMMA_DELIMITERS, decode)))
                }
                Some(OpenApiPrimitives::Object) => object_from_flat_pairs(
                    style,
                    &non_empty_split(value, COMMA_DELIMITERS),
                    decode,
                ),
                _ => Ok(Value::String(decode(value))),
            }
        }
    }
}

/// Raw value of a `name=value` matrix entry, checking the decoded name.
fn named_value<'a>(
    style: ParameterStyle,
    name: &str,
    entry: &'a str,
    decode: Decode,
) -> Result<&'a str, CodecError> {
    match entry.split_once('=') {
        Some((key, value)) if decode(key) == name => Ok(value),
        Some((key, _)) => Err(CodecError::malformed(
            style,
            &format!("expected parameter '{}' but found '{}'", name, key),
        )),
        None if decode(entry) == name => Ok(""),
        None => Err(CodecError::malformed(
            style,
            &format!("'{}' is not a key=value pair", entry),
        )),
    }
}

#[cfg(test)]
mod test {
    use crate::codec::{ParamSource, ParameterStyle, deserialize, serialize};
    use crate::error::CodecError;
    use serde_json::{Value, json};

    fn decode(style: ParameterStyle, raw: &str, schema: Value, explode: bool) -> Value {
        deserialize(style, "id", ParamSource::Fragment(raw), &schema, explode)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_simple_serialization() {
        let s = |value: Value, explode| {
            serialize(ParameterStyle::Simple, "id", &value, explode).unwrap()
        };
        assert_eq!(s(json!(5), false), "5");
        assert_eq!(s(json!(["a", "b", "c"]), false), "a,b,c");
        assert_eq!(s(json!(["a", "b", "c"]), true), "a,b,c");
        assert_eq!(s(json!({"first": "Alex", "role": "admin"}), false), "first,Alex,role,admin");
        assert_eq!(s(json!({"first": "Alex", "role": "admin"}), true), "first=Alex,role=admin");
    }

    #[test]
    fn test_label_serialization() {
        let s = |value: Value, explode| {
            serialize(ParameterStyle::Label, "id", &value, explode).unwrap()
        };
        assert_eq!(s(json!(5), false), ".5");
        assert_eq!(s(json!(["a", "b", "c"]), false), ".a,b,c");
        assert_eq!(s(json!(["a", "b", "c"]), true), ".a.b.c");
        assert_eq!(s(json!({"x": 1, "y": 2}), false), ".x,1,y,2");
        assert_eq!(s(json!({"x": 1, "y": 2}), true), ".x=1.y=2");
    }

    #[test]
    fn test_matrix_serialization() {
        let s = |value: Value, explode| {
            serialize(ParameterStyle::Matrix, "id", &value, explode).unwrap()
        };
        assert_eq!(s(json!(5), false), ";id=5");
        assert_eq!(s(json!(["a", "b", "c"]), false), ";id=a,b,c");
        assert_eq!(s(json!(["a", "b", "c"]), true), ";id=a;id=b;id=c");
        assert_eq!(s(json!({"x": 1, "y": 2}), false), ";id=x,1,y,2");
        assert_eq!(s(json!({"x": 1, "y": 2}), true), ";x=1;y=2");
    }

    #[test]
    fn test_simple_deserialization() {
        let array = json!({"type": "array"});
        let object = json!({"type": "object"});
        assert_eq!(
            decode(ParameterStyle::Simple, "5", json!({"type": "integer"}), false),
            json!("5")
        );
        assert_eq!(
            decode(ParameterStyle::Simple, "a,b,c", array.clone(), false),
            json!(["a", "b", "c"])
        );
        assert_eq!(decode(ParameterStyle::Simple, "", array, false), json!([]));
        assert_eq!(
            decode(ParameterStyle::Simple, "x,1,y,2", object.clone(), false),
            json!({"x": "1", "y": "2"})
        );
        assert_eq!(
            decode(ParameterStyle::Simple, "x=1,y=2", object, true),
            json!({"x": "1", "y": "2"})
        );
    }

    #[test]
    fn test_simple_rejects_odd_key_value_list() {
        let result = deserialize(
            ParameterStyle::Simple,
            "id",
            ParamSource::Fragment("x,1,y"),
            &json!({"type": "object"}),
            false,
        );
        assert!(matches!(result, Err(CodecError::Malformed { .. })));
    }

    #[test]
    fn test_label_deserialization() {
        assert_eq!(
            decode(ParameterStyle::Label, ".a.b.c", json!({"type": "array"}), true),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            decode(ParameterStyle::Label, ".a,b,c", json!({"type": "array"}), false),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            decode(ParameterStyle::Label, ".x=1.y=2", json!({"type": "object"}), true),
            json!({"x": "1", "y": "2"})
        );
        assert_eq!(
            decode(ParameterStyle::Label, ".5", json!({"type": "string"}), false),
            json!("5")
        );
        let missing_prefix = deserialize(
            ParameterStyle::Label,
            "id",
            ParamSource::Fragment("5"),
            &json!({"type": "string"}),
            false,
        );
        assert!(matches!(missing_prefix, Err(CodecError::Malformed { .. })));
        let odd = deserialize(
            ParameterStyle::Label,
            "id",
            ParamSource::Fragment(".x,1,y"),
            &json!({"type": "object"}),
            false,
        );
        assert!(odd.is_err());
    }

    #[test]
    fn test_matrix_deserialization() {
        assert_eq!(
            decode(ParameterStyle::Matrix, ";id=5", json!({"type": "integer"}), false),
            json!("5")
        );
        assert_eq!(
            decode(ParameterStyle::Matrix, ";id=a,b", json!({"type": "array"}), false),
            json!(["a", "b"])
        );
        assert_eq!(
            decode(ParameterStyle::Matrix, ";id=a;id=b", json!({"type": "array"}), true),
            json!(["a", "b"])
        );
        assert_eq!(
            decode(ParameterStyle::Matrix, ";x=1;y=2", json!({"type": "object"}), true),
            json!({"x": "1", "y": "2"})
        );
        assert_eq!(
            decode(ParameterStyle::Matrix, ";id=x,1,y,2", json!({"type": "object"}), false),
            json!({"x": "1", "y": "2"})
        );
        let wrong_name = deserialize(
            ParameterStyle::Matrix,
            "id",
            ParamSource::Fragment(";other=5"),
            &json!({"type": "string"}),
            false,
        );
        assert!(matches!(wrong_name, Err(CodecError::Malformed { .. })));
        let odd = deserialize(
            ParameterStyle::Matrix,
            "id",
            ParamSource::Fragment(";id=x,1,y"),
            &json!({"type": "object"}),
            false,
        );
        assert!(odd.is_err());
    }

    #[test]
    fn test_reserved_characters_round_trip() {
        let array = json!({"type": "array", "items": {"type": "string"}});
        let cases = [
            (ParameterStyle::Simple, json!(["a,b", "c"]), false),
            (ParameterStyle::Simple, json!(["50% off", "x=y"]), true),
            (ParameterStyle::Label, json!(["a,b", "c.d"]), false),
            (ParameterStyle::Label, json!(["a,b", "c;d"]), true),
            (ParameterStyle::Matrix, json!(["a,b", "c"]), false),
            (ParameterStyle::Matrix, json!(["a;b", "c,d"]), true),
        ];
        for (style, original, explode) in cases {
            let wire = serialize(style, "id", &original, explode).unwrap();
            assert_eq!(decode(style, &wire, array.clone(), explode), original, "style {} wire {}", style, wire);
        }

        let object = json!({"type": "object"});
        let original = json!({"k=1": "v,2", "k;3": "a b"});
        for style in [ParameterStyle::Simple, ParameterStyle::Label, ParameterStyle::Matrix] {
            for explode in [false, true] {
                let wire = serialize(style, "id", &original, explode).unwrap();
                assert_eq!(
                    decode(style, &wire, object.clone(), explode),
                    original,
                    "style {} wire {}",
                    style,
                    wire
                );
            }
        }

        let string = json!({"type": "string"});
        for style in [ParameterStyle::Simple, ParameterStyle::Label, ParameterStyle::Matrix] {
            let wire = serialize(style, "id", &json!("x;y=z, 1+1"), false).unwrap();
            assert_eq!(decode(style, &wire, string.clone(), false), json!("x;y=z, 1+1"));
        }
    }

    #[test]
    fn test_plus_in_path_is_literal() {
        assert_eq!(
            decode(ParameterStyle::Simple, "a+b", json!({"type": "string"}), false),
            json!("a+b")
        );
    }
}

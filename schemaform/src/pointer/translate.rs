use serde_json::Value;

use super::{ToPointer, access, compile_keys, escape, parse_index};
use crate::{
    context::ArrayMap,
    error::{CompileError, Result},
};

/// Replace the `-` wildcards of a generic pointer with concrete indices.
///
/// Indices are consumed left to right. With an `array_map`, only wildcards
/// whose prefix is a known array are replaced; others stay `-`. Wildcards
/// beyond the supplied indices are left untouched.
pub fn to_indexed_pointer(
    generic: impl ToPointer,
    indices: &[usize],
    array_map: Option<&ArrayMap>,
) -> Result<String> {
    let keys = generic.to_pointer()?.into_keys();
    let mut out = Vec::with_capacity(keys.len());
    let mut next = indices.iter();
    for key in keys {
        if key == "-" && array_map.is_none_or(|map| map.contains_key(&compile_keys(&out))) {
            if let Some(index) = next.next() {
                out.push(index.to_string());
                continue;
            }
        }
        out.push(key);
    }
    Ok(compile_keys(&out))
}

/// Replace concrete list indices with `-`.
///
/// An index is generic when the array above it is in `array_map` and the
/// index is at or past that array's tuple prefix. Tuple positions keep
/// their index.
pub fn to_generic_pointer(pointer: impl ToPointer, array_map: &ArrayMap) -> Result<String> {
    let mut keys = pointer.to_pointer()?.into_keys();
    for i in 0..keys.len() {
        let Some(index) = parse_index(&keys[i]) else {
            continue;
        };
        if let Some(tuple_items) = array_map.get(&compile_keys(&keys[..i]))
            && *tuple_items <= index
        {
            keys[i] = "-".to_string();
        }
    }
    Ok(compile_keys(&keys))
}

/// Translate a data pointer into a pointer inside a control tree.
///
/// Control groups are objects with a `controls` member; arrays of controls
/// are plain JSON arrays. Missing controls are tolerated unless
/// `must_exist` is set.
pub fn to_control_pointer(
    data_pointer: impl ToPointer,
    controls: &Value,
    must_exist: bool,
) -> Result<String> {
    let pointer = data_pointer.to_pointer()?;
    let placeholder = Value::Object(Default::default());
    let mut out: Vec<String> = Vec::new();
    let mut group = controls;
    for key in pointer.keys() {
        if let Some(children) = group.get("controls") {
            out.push("controls".to_string());
            group = children;
        }
        match group {
            Value::Array(items) if key == "-" && !items.is_empty() => {
                out.push((items.len() - 1).to_string());
                group = &items[items.len() - 1];
            }
            _ => match access::get(group, [key.as_str()]) {
                Some(child) => {
                    out.push(key.clone());
                    group = child;
                }
                None if must_exist => return Err(CompileError::miss(pointer.compile())),
                None => {
                    out.push(key.clone());
                    group = &placeholder;
                }
            },
        }
    }
    Ok(compile_keys(&out))
}

/// Translate a data pointer into the schema pointer describing it.
///
/// Object keys map to `/properties/<key>` (or `/additionalProperties`),
/// array positions to `/items/<n>`, `/items` or `/additionalItems`
/// depending on the tuple shape of the array schema. `-` and empty keys are
/// treated as the first list position.
pub fn to_schema_pointer(data_pointer: impl ToPointer, schema: &Value) -> Result<String> {
    let pointer = data_pointer.to_pointer()?;
    schema_path(pointer.keys(), schema).ok_or_else(|| {
        CompileError::malformed(
            "to_schema_pointer",
            format!("data pointer {pointer} is not compatible with schema"),
        )
    })
}

fn schema_path(keys: &[String], schema: &Value) -> Option<String> {
    let Some((first, rest)) = keys.split_first() else {
        return Some(String::new());
    };
    let object_like = schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.get("properties").is_some()
        || schema.get("additionalProperties").is_some();
    if object_like {
        if let Some(sub) = schema.get("properties").and_then(|p| p.get(first)) {
            return Some(format!("/properties/{}{}", escape(first), schema_path(rest, sub)?));
        }
        if let Some(additional) = schema
            .get("additionalProperties")
            .filter(|a| !matches!(a, Value::Bool(false)))
        {
            return Some(format!("/additionalProperties{}", schema_path(rest, additional)?));
        }
    }
    let array_like = schema.get("type").and_then(Value::as_str) == Some("array")
        || schema.get("items").is_some();
    // `-` addresses the list part, past any tuple prefix.
    let position = match first.as_str() {
        "-" | "" => Some(None),
        key => parse_index(key).map(Some),
    };
    if let (true, Some(position)) = (array_like, position) {
        let additional = schema.get("additionalItems").filter(|a| a.is_object());
        match schema.get("items") {
            Some(Value::Array(tuple)) => {
                if let Some((index, sub)) = position.and_then(|i| Some((i, tuple.get(i)?))) {
                    return Some(format!("/items/{index}{}", schema_path(rest, sub)?));
                }
                if let Some(additional) = additional {
                    return Some(format!("/additionalItems{}", schema_path(rest, additional)?));
                }
            }
            Some(items @ Value::Object(_)) => {
                return Some(format!("/items{}", schema_path(rest, items)?));
            }
            _ => {
                if let Some(additional) = additional {
                    return Some(format!("/additionalItems{}", schema_path(rest, additional)?));
                }
            }
        }
    }
    None
}

/// Translate a schema pointer into the generic data pointer it describes.
///
/// Composition keywords (`allOf`, `anyOf`, `oneOf`, `not`) are transparent.
/// Pointers into `definitions`, `additionalProperties` and other
/// non-positional keywords have no data equivalent.
pub fn to_data_pointer(schema_pointer: impl ToPointer, schema: &Value) -> Result<String> {
    let pointer = schema_pointer.to_pointer()?;
    if !access::has(schema, &pointer) {
        return Err(CompileError::miss(pointer.compile()));
    }
    data_path(pointer.keys(), schema).ok_or_else(|| {
        CompileError::malformed(
            "to_data_pointer",
            format!("schema pointer {pointer} has no data equivalent"),
        )
    })
}

fn data_path(keys: &[String], schema: &Value) -> Option<String> {
    let Some((first, rest)) = keys.split_first() else {
        return Some(String::new());
    };
    let tuple = schema.get("items").is_some_and(Value::is_array);
    match first.as_str() {
        "properties" => {
            let (second, rest) = rest.split_first()?;
            let sub = schema.get("properties")?.get(second)?;
            Some(format!("/{}{}", escape(second), data_path(rest, sub)?))
        }
        "items" if tuple => {
            let (second, rest) = rest.split_first()?;
            let sub = schema.get("items")?.get(parse_index(second)?)?;
            Some(format!("/{second}{}", data_path(rest, sub)?))
        }
        "items" | "additionalItems" => {
            let sub = schema.get(first.as_str())?;
            Some(format!("/-{}", data_path(rest, sub)?))
        }
        "allOf" | "anyOf" | "oneOf" => {
            let (second, rest) = rest.split_first()?;
            let sub = schema.get(first.as_str())?.get(parse_index(second)?)?;
            data_path(rest, sub)
        }
        "not" => data_path(rest, schema.get("not")?),
        _ => None,
    }
}

/// [`to_generic_pointer`] for pointers that are already known to be valid.
pub(crate) fn generic_or_same(pointer: &str, array_map: &ArrayMap) -> String {
    to_generic_pointer(pointer, array_map).unwrap_or_else(|_| pointer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn array_map(entries: &[(&str, usize)]) -> ArrayMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_to_indexed_pointer() {
        assert_eq!(
            to_indexed_pointer("/a/-/b/-", &[2, 5], None).unwrap(),
            "/a/2/b/5"
        );
        let map = array_map(&[("/a", 0)]);
        assert_eq!(
            to_indexed_pointer("/a/-/b/-", &[2, 5], Some(&map)).unwrap(),
            "/a/2/b/-"
        );
        assert_eq!(to_indexed_pointer("/a/-", &[], None).unwrap(), "/a/-");
    }

    #[test]
    fn test_to_generic_pointer_respects_tuples() {
        let map = array_map(&[("/pair", 2), ("/list", 0), ("/list/-/tags", 0)]);
        assert_eq!(to_generic_pointer("/pair/1", &map).unwrap(), "/pair/1");
        assert_eq!(to_generic_pointer("/pair/2", &map).unwrap(), "/pair/-");
        assert_eq!(to_generic_pointer("/list/3/tags/0", &map).unwrap(), "/list/-/tags/-");
        assert_eq!(to_generic_pointer("/other/3", &map).unwrap(), "/other/3");
    }

    #[test]
    fn test_to_control_pointer() {
        let controls = json!({"controls": {"a": {"controls": {"b": [{}, {}]}}}});
        assert_eq!(
            to_control_pointer("/a/b/-", &controls, true).unwrap(),
            "/controls/a/controls/b/1"
        );
        assert_eq!(
            to_control_pointer("/a/new", &controls, false).unwrap(),
            "/controls/a/controls/new"
        );
        assert!(to_control_pointer("/a/new", &controls, true).is_err());
    }

    #[test]
    fn test_to_schema_pointer() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "pair": {"type": "array", "items": [{"type": "string"}, {"type": "number"}],
                         "additionalItems": {"type": "boolean"}},
                "extra": {"type": "object", "additionalProperties": {"type": "integer"}}
            }
        });
        assert_eq!(to_schema_pointer("/tags/3", &schema).unwrap(), "/properties/tags/items");
        assert_eq!(to_schema_pointer("/pair/1", &schema).unwrap(), "/properties/pair/items/1");
        assert_eq!(
            to_schema_pointer("/pair/-", &schema).unwrap(),
            "/properties/pair/additionalItems"
        );
        assert_eq!(
            to_schema_pointer("/pair/7", &schema).unwrap(),
            "/properties/pair/additionalItems"
        );
        assert_eq!(
            to_schema_pointer("/extra/anything", &schema).unwrap(),
            "/properties/extra/additionalProperties"
        );
        assert_eq!(to_schema_pointer("", &schema).unwrap(), "");
        assert!(to_schema_pointer("/missing", &schema).is_err());
    }

    #[test]
    fn test_to_data_pointer() {
        let schema = json!({
            "properties": {
                "list": {"items": {"properties": {"name": {"type": "string"}}}},
                "pair": {"items": [{"type": "string"}, {"oneOf": [{"type": "number"}]}]}
            },
            "definitions": {"x": {"type": "string"}}
        });
        assert_eq!(
            to_data_pointer("/properties/list/items/properties/name", &schema).unwrap(),
            "/list/-/name"
        );
        assert_eq!(
            to_data_pointer("/properties/pair/items/1/oneOf/0", &schema).unwrap(),
            "/pair/1"
        );
        assert!(to_data_pointer("/definitions/x", &schema).is_err());
        assert!(to_data_pointer("/properties/nope", &schema).is_err());
    }
}

//! Schema compiler.
//!
//! Turns a raw JSON Schema into a compiled schema in which every
//! non-recursive `$ref` is inlined and every recursive one points at its
//! canonical location, and answers questions about individual schema nodes.
//!
//! ## Submodules
//!
//! - [`resolve`] - `$ref` graph closure, recursive reference maps, sub-schemas
//! - [`merge`] - `allOf` flattening and schema merging
//! - [`input_type`] - schema node to widget type selection

use serde_json::{Map, Value};

use crate::pointer::{self, ToPointer};

pub mod input_type;
pub mod merge;
pub mod resolve;

pub use input_type::{check_inline_type, get_input_type};
pub use merge::{combine_all_of, fix_required_array_properties, merge_schemas};
pub use resolve::{
    ResolvedSchema, get_sub_schema, remove_recursive_references, resolve_schema_references,
};

/// Structural reading of one schema node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaKind<'a> {
    Object {
        properties: Option<&'a Map<String, Value>>,
        additional: Option<&'a Value>,
    },
    Array(ItemsShape<'a>),
    /// `string`, `number`, `integer`, `boolean` or `null`.
    Primitive(&'a str),
    Ref(&'a str),
    /// `oneOf` / `anyOf` without a usable `type`.
    Choice(&'a [Value]),
    Unknown,
}

/// How an array schema describes its items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemsShape<'a> {
    /// Positional `items` array, optionally followed by `additionalItems`.
    Tuple {
        prefix: &'a [Value],
        additional: Option<&'a Value>,
    },
    /// One schema for every item.
    List(&'a Value),
    /// Neither `items` nor `additionalItems`.
    Open,
}

impl ItemsShape<'_> {
    /// Number of fixed positions.
    pub fn tuple_items(&self) -> usize {
        match self {
            ItemsShape::Tuple { prefix, .. } => prefix.len(),
            _ => 0,
        }
    }
}

impl<'a> SchemaKind<'a> {
    pub fn of(schema: &'a Value) -> Self {
        match resolved_type(schema) {
            Some("object") => SchemaKind::Object {
                properties: schema.get("properties").and_then(Value::as_object),
                additional: schema
                    .get("additionalProperties")
                    .filter(|v| v.is_object()),
            },
            Some("array") => SchemaKind::Array(items_shape(schema)),
            Some(ty @ ("string" | "number" | "integer" | "boolean" | "null")) => {
                SchemaKind::Primitive(ty)
            }
            _ => {
                if let Some(target) = schema.get("$ref").and_then(Value::as_str) {
                    SchemaKind::Ref(target)
                } else if let Some(branches) = schema
                    .get("oneOf")
                    .or_else(|| schema.get("anyOf"))
                    .and_then(Value::as_array)
                {
                    SchemaKind::Choice(branches)
                } else {
                    SchemaKind::Unknown
                }
            }
        }
    }
}

fn items_shape(schema: &Value) -> ItemsShape<'_> {
    let additional = schema.get("additionalItems").filter(|v| v.is_object());
    match schema.get("items") {
        Some(Value::Array(prefix)) => ItemsShape::Tuple { prefix, additional },
        Some(items @ Value::Object(_)) => ItemsShape::List(items),
        _ => match additional {
            Some(items) => ItemsShape::List(items),
            None => ItemsShape::Open,
        },
    }
}

/// Single effective `type` of a schema node.
///
/// A `type` list is narrowed by what the node actually describes: `object`
/// when it has `properties`, `array` when it has items, otherwise the first
/// of `string`, `number`, `integer`, `boolean`; `unknown` when nothing fits.
pub fn resolved_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => {
            let has = |ty: &str| types.iter().any(|t| t.as_str() == Some(ty));
            if has("object") && schema.get("properties").is_some() {
                Some("object")
            } else if has("array")
                && (schema.get("items").is_some() || schema.get("additionalItems").is_some())
            {
                Some("array")
            } else {
                ["string", "number", "integer", "boolean"]
                    .into_iter()
                    .find(|ty| has(ty))
                    .or(Some("unknown"))
            }
        }
        _ => None,
    }
}

/// Data type recorded on layout nodes: the resolved `type`, or `$ref`.
pub fn data_type_of(schema: &Value) -> Option<String> {
    resolved_type(schema)
        .map(str::to_string)
        .or_else(|| schema.get("$ref").map(|_| "$ref".to_string()))
}

/// Whether the value addressed by `schema_pointer` is required by its parent.
///
/// Object members are required when listed in the parent's `required`; array
/// positions when they fall below the parent's `minItems`. The root is
/// required only when the schema says `"required": true`.
pub fn is_input_required(schema: &Value, schema_pointer: impl ToPointer) -> bool {
    let Ok(mut keys) = pointer::parse(schema_pointer) else {
        return false;
    };
    let Some(key) = keys.pop() else {
        return schema.get("required") == Some(&Value::Bool(true));
    };
    if keys.last().is_some_and(|k| {
        matches!(
            k.as_str(),
            "properties" | "additionalProperties" | "patternProperties" | "items" | "additionalItems"
        )
    }) {
        keys.pop();
    }
    let Some(parent) = pointer::get(schema, &keys) else {
        return false;
    };
    if let Some(required) = parent.get("required").and_then(Value::as_array) {
        return required.iter().any(|r| r.as_str() == Some(key.as_str()));
    }
    if resolved_type(parent) == Some("array") {
        let min_items = parent.get("minItems").and_then(Value::as_u64);
        return match (min_items, pointer::parse_index(&key)) {
            (Some(min), Some(index)) => (index as u64) < min,
            _ => false,
        };
    }
    false
}

/// Schema describing the value at `data_pointer`, or its parent's.
pub fn get_from_schema<'a>(
    schema: &'a Value,
    data_pointer: impl ToPointer,
    parent: bool,
) -> Option<&'a Value> {
    let mut keys = pointer::parse(data_pointer).ok()?;
    if parent {
        keys.pop()?;
    }
    let schema_pointer = pointer::to_schema_pointer(&keys, schema).ok()?;
    pointer::get(schema, schema_pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_type_lists() {
        assert_eq!(resolved_type(&json!({"type": ["null", "string"]})), Some("string"));
        assert_eq!(
            resolved_type(&json!({"type": ["object", "null"], "properties": {}})),
            Some("object")
        );
        assert_eq!(resolved_type(&json!({"type": ["object", "null"]})), Some("unknown"));
        assert_eq!(resolved_type(&json!({"$ref": "#"})), None);
        assert_eq!(data_type_of(&json!({"$ref": "#"})).as_deref(), Some("$ref"));
    }

    #[test]
    fn test_schema_kind() {
        let tuple = json!({"type": "array", "items": [{}, {}], "additionalItems": {}});
        match SchemaKind::of(&tuple) {
            SchemaKind::Array(shape) => assert_eq!(shape.tuple_items(), 2),
            other => panic!("unexpected {other:?}"),
        }
        let list = json!({"type": "array", "items": {"type": "string"}});
        assert!(matches!(SchemaKind::of(&list), SchemaKind::Array(ItemsShape::List(_))));
        assert!(matches!(
            SchemaKind::of(&json!({"oneOf": []})),
            SchemaKind::Choice(_)
        ));
        assert_eq!(SchemaKind::of(&json!({})), SchemaKind::Unknown);
    }

    #[test]
    fn test_is_input_required() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string"},
                "nick": {"type": "string"},
                "tags": {"type": "array", "minItems": 1, "items": {"type": "string"}}
            }
        });
        assert!(is_input_required(&schema, "/properties/name"));
        assert!(!is_input_required(&schema, "/properties/nick"));
        assert!(!is_input_required(&schema, ""));
        assert!(!is_input_required(&schema, "/properties/tags/items"));
    }

    #[test]
    fn test_get_from_schema() {
        let schema = json!({
            "properties": {"list": {"type": "array", "items": {"type": "string"}}}
        });
        assert_eq!(
            get_from_schema(&schema, "/list/3", false),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(
            get_from_schema(&schema, "/list/3", true).and_then(|s| s.get("type")),
            Some(&json!("array"))
        );
        assert_eq!(get_from_schema(&schema, "/nope", false), None);
    }
}

use serde_json::{Map, Value, json};

/// Merge several schemas into one describing their intersection.
///
/// Keyword rules: `type` and `enum` intersect, `required` unions, lower
/// bounds take the maximum and upper bounds the minimum, `properties` merge
/// recursively, `allOf` lists concatenate, two `not`s become `not: anyOf`.
/// Annotation keywords from later schemas win. When two schemas cannot be
/// merged the result is `{"allOf": [...]}` over the inputs.
pub fn merge_schemas(schemas: &[Value]) -> Value {
    let mut combined = Map::new();
    for schema in schemas {
        let object = match schema {
            Value::Object(object) => object,
            Value::Bool(true) => continue,
            _ => return incompatible(schemas),
        };
        for (key, incoming) in object {
            let merged = match combined.get(key) {
                None => Some(incoming.clone()),
                Some(existing) => merge_keyword(key, existing, incoming),
            };
            match merged {
                Some(value) => {
                    combined.insert(key.clone(), value);
                }
                None => {
                    trace!("merge_schemas: `{key}` conflicts, keeping allOf");
                    return incompatible(schemas);
                }
            }
        }
    }
    Value::Object(combined)
}

fn incompatible(schemas: &[Value]) -> Value {
    json!({ "allOf": schemas })
}

fn merge_keyword(key: &str, existing: &Value, incoming: &Value) -> Option<Value> {
    if existing == incoming {
        return Some(existing.clone());
    }
    match key {
        "type" => intersect_types(existing, incoming),
        "enum" => {
            let (a, b) = (existing.as_array()?, incoming.as_array()?);
            let common: Vec<Value> = a.iter().filter(|v| b.contains(v)).cloned().collect();
            (!common.is_empty()).then_some(Value::Array(common))
        }
        "const" | "$ref" | "anyOf" | "oneOf" | "pattern" | "format" => None,
        "required" => {
            let (a, b) = (existing.as_array()?, incoming.as_array()?);
            let mut union = a.clone();
            union.extend(b.iter().filter(|v| !a.contains(v)).cloned());
            Some(Value::Array(union))
        }
        "properties" | "patternProperties" | "definitions" | "$defs" => {
            let (a, b) = (existing.as_object()?, incoming.as_object()?);
            let mut merged = a.clone();
            for (name, schema) in b {
                let value = match merged.get(name) {
                    Some(current) => merge_schemas(&[current.clone(), schema.clone()]),
                    None => schema.clone(),
                };
                merged.insert(name.clone(), value);
            }
            Some(Value::Object(merged))
        }
        "items" => match (existing, incoming) {
            (Value::Array(a), Value::Array(b)) => {
                let len = a.len().max(b.len());
                let items = (0..len)
                    .map(|i| match (a.get(i), b.get(i)) {
                        (Some(x), Some(y)) => merge_schemas(&[x.clone(), y.clone()]),
                        (Some(x), None) | (None, Some(x)) => x.clone(),
                        (None, None) => Value::Bool(true),
                    })
                    .collect();
                Some(Value::Array(items))
            }
            (Value::Object(_), Value::Object(_)) => {
                Some(merge_schemas(&[existing.clone(), incoming.clone()]))
            }
            _ => None,
        },
        "additionalProperties" | "additionalItems" | "contains" | "propertyNames" => {
            match (existing, incoming) {
                (Value::Bool(false), _) | (_, Value::Bool(false)) => Some(Value::Bool(false)),
                (Value::Bool(true), other) | (other, Value::Bool(true)) => Some(other.clone()),
                _ => Some(merge_schemas(&[existing.clone(), incoming.clone()])),
            }
        }
        "minimum" | "exclusiveMinimum" | "minLength" | "minItems" | "minProperties" => {
            pick_number(existing, incoming, |a, b| a >= b)
        }
        "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" | "maxProperties" => {
            pick_number(existing, incoming, |a, b| a <= b)
        }
        "multipleOf" => {
            let (a, b) = (existing.as_u64()?, incoming.as_u64()?);
            if a == 0 || b == 0 {
                return None;
            }
            (a / gcd(a, b)).checked_mul(b).map(|lcm| json!(lcm))
        }
        "uniqueItems" => Some(Value::Bool(
            existing.as_bool().unwrap_or(false) || incoming.as_bool().unwrap_or(false),
        )),
        "allOf" => {
            let mut all = existing.as_array()?.clone();
            all.extend(incoming.as_array()?.iter().cloned());
            Some(Value::Array(all))
        }
        "not" => Some(json!({ "anyOf": [existing, incoming] })),
        _ => match (existing, incoming) {
            (Value::Object(a), Value::Object(b)) => {
                let mut merged = a.clone();
                merged.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(Value::Object(merged))
            }
            _ => Some(incoming.clone()),
        },
    }
}

fn intersect_types(existing: &Value, incoming: &Value) -> Option<Value> {
    let list = |v: &Value| -> Vec<String> {
        match v {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    };
    let (a, b) = (list(existing), list(incoming));
    let mut common: Vec<String> = Vec::new();
    for ty in &a {
        let hit = if b.contains(ty) {
            Some(ty.clone())
        } else if ty == "number" && b.iter().any(|t| t == "integer") {
            Some("integer".to_string())
        } else if ty == "integer" && b.iter().any(|t| t == "number") {
            Some("integer".to_string())
        } else {
            None
        };
        if let Some(hit) = hit
            && !common.contains(&hit)
        {
            common.push(hit);
        }
    }
    match common.len() {
        0 => None,
        1 => common.pop().map(Value::String),
        _ => Some(json!(common)),
    }
}

fn pick_number(existing: &Value, incoming: &Value, keep_existing: fn(f64, f64) -> bool) -> Option<Value> {
    let (a, b) = (existing.as_f64()?, incoming.as_f64()?);
    Some(if keep_existing(a, b) { existing.clone() } else { incoming.clone() })
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Flatten `allOf` into its parent schema when the members are compatible.
///
/// Sibling keywords next to `allOf` take part in the merge. Incompatible
/// members leave the schema unchanged.
pub fn combine_all_of(schema: &Value) -> Value {
    let Some(object) = schema.as_object() else {
        return schema.clone();
    };
    let Some(members) = object.get("allOf").and_then(Value::as_array) else {
        return schema.clone();
    };
    let merged = merge_schemas(members);
    if object.len() == 1 {
        return merged;
    }
    let mut siblings = object.clone();
    siblings.shift_remove("allOf");
    merge_schemas(&[merged, Value::Object(siblings)])
}

/// Move a `required` list written on an array schema onto its item schema.
///
/// Applies when the items are objects with `properties` and every listed key
/// is one of them; otherwise the schema is returned unchanged.
pub fn fix_required_array_properties(schema: &Value) -> Value {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return schema.clone();
    };
    if schema.get("type").and_then(Value::as_str) != Some("array") {
        return schema.clone();
    }
    let items_key = if schema.get("items").is_some_and(Value::is_object) {
        "items"
    } else if schema.get("additionalItems").is_some_and(Value::is_object) {
        "additionalItems"
    } else {
        return schema.clone();
    };
    let Some(properties) = schema[items_key].get("properties").and_then(Value::as_object) else {
        return schema.clone();
    };
    let fits = required
        .iter()
        .all(|key| key.as_str().is_some_and(|k| properties.contains_key(k)));
    if !fits {
        return schema.clone();
    }
    let mut fixed = schema.clone();
    let Some(object) = fixed.as_object_mut() else {
        return schema.clone();
    };
    let moved = object.shift_remove("required");
    if let (Some(moved), Some(Value::Object(items))) = (moved, object.get_mut(items_key)) {
        items.insert("required".to_string(), moved);
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_compatible() {
        let merged = merge_schemas(&[
            json!({"type": ["string", "number"], "minLength": 2, "required": ["a"]}),
            json!({"type": "string", "minLength": 5, "maxLength": 9, "required": ["b"]}),
        ]);
        assert_eq!(
            merged,
            json!({"type": "string", "minLength": 5, "required": ["a", "b"], "maxLength": 9})
        );
    }

    #[test]
    fn test_merge_integer_number() {
        let merged = merge_schemas(&[json!({"type": "number"}), json!({"type": "integer"})]);
        assert_eq!(merged, json!({"type": "integer"}));
    }

    #[test]
    fn test_merge_properties_recursively() {
        let merged = merge_schemas(&[
            json!({"properties": {"a": {"type": "string"}}}),
            json!({"properties": {"a": {"maxLength": 3}, "b": {"type": "number"}}}),
        ]);
        assert_eq!(
            merged,
            json!({"properties": {"a": {"type": "string", "maxLength": 3}, "b": {"type": "number"}}})
        );
    }

    #[test]
    fn test_merge_conflict_falls_back_to_all_of() {
        let inputs = [json!({"type": "string"}), json!({"type": "number"})];
        assert_eq!(merge_schemas(&inputs), json!({"allOf": inputs}));
    }

    #[test]
    fn test_merge_multiple_of() {
        let merged = merge_schemas(&[json!({"multipleOf": 4}), json!({"multipleOf": 6})]);
        assert_eq!(merged, json!({"multipleOf": 12}));

        let inputs = [
            json!({"multipleOf": 4294967311u64}),
            json!({"multipleOf": 4294967357u64}),
        ];
        assert_eq!(merge_schemas(&inputs), json!({"allOf": inputs}));
    }

    #[test]
    fn test_merge_enum_and_not() {
        let merged = merge_schemas(&[
            json!({"enum": [1, 2, 3], "not": {"const": 1}}),
            json!({"enum": [3, 2], "not": {"const": 2}}),
        ]);
        assert_eq!(
            merged,
            json!({"enum": [2, 3], "not": {"anyOf": [{"const": 1}, {"const": 2}]}})
        );
    }

    #[test]
    fn test_combine_all_of_with_siblings() {
        let schema = json!({
            "title": "Person",
            "allOf": [
                {"type": "object", "properties": {"name": {"type": "string"}}},
                {"required": ["name"]}
            ]
        });
        assert_eq!(
            combine_all_of(&schema),
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
                "title": "Person"
            })
        );
    }

    #[test]
    fn test_combine_all_of_incompatible_keeps_schema() {
        let schema = json!({"allOf": [{"type": "string"}, {"type": "boolean"}]});
        assert_eq!(combine_all_of(&schema), schema);
    }

    #[test]
    fn test_fix_required_array_properties() {
        let schema = json!({
            "type": "array",
            "required": ["name"],
            "items": {"type": "object", "properties": {"name": {"type": "string"}}}
        });
        let fixed = fix_required_array_properties(&schema);
        assert!(fixed.get("required").is_none());
        assert_eq!(fixed["items"]["required"], json!(["name"]));

        let unrelated = json!({"type": "array", "required": ["x"], "items": {"properties": {}}});
        assert_eq!(fix_required_array_properties(&unrelated), unrelated);
    }
}

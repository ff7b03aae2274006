use serde_json::{Map, Value};

use super::{Pointer, ToPointer, compile_keys, parse_index};
use crate::error::{CompileError, Result};

/// Look up the value addressed by `pointer`.
///
/// Returns `None` for unparsable pointers and for paths that do not exist;
/// it never panics. On arrays the key `-` selects the last element.
pub fn get(value: &Value, pointer: impl ToPointer) -> Option<&Value> {
    try_get(value, pointer).ok()
}

/// Like [`get`], but reports why the lookup failed.
pub fn try_get(value: &Value, pointer: impl ToPointer) -> Result<&Value> {
    let pointer = pointer.to_pointer()?;
    resolve(value, pointer.keys())
}

/// Look up a key slice of `pointer`.
///
/// `start` drops leading keys; a negative `end` drops that many trailing
/// keys, so `get_slice(schema, p, 0, Some(-1))` yields the parent.
pub fn get_slice(
    value: &Value,
    pointer: impl ToPointer,
    start: usize,
    end: Option<isize>,
) -> Option<&Value> {
    let pointer = pointer.to_pointer().ok()?;
    let keys = pointer.keys();
    let end = match end {
        Some(e) if e < 0 => keys.len().checked_sub(e.unsigned_abs())?,
        Some(e) => (e as usize).min(keys.len()),
        None => keys.len(),
    };
    if start > end {
        return None;
    }
    resolve(value, &keys[start..end]).ok()
}

/// Whether `pointer` addresses an existing value.
pub fn has(value: &Value, pointer: impl ToPointer) -> bool {
    try_get(value, pointer).is_ok()
}

/// First non-null value among candidate `(object, pointer)` pairs.
pub fn get_first<'a, P, I>(candidates: I) -> Option<&'a Value>
where
    P: ToPointer,
    I: IntoIterator<Item = (&'a Value, P)>,
{
    candidates
        .into_iter()
        .filter_map(|(object, pointer)| get(object, pointer))
        .find(|v| !v.is_null())
}

/// Write `new` at `pointer`, creating missing containers on the way.
///
/// A missing container becomes an array when the key after it is numeric
/// or `-`, and an object otherwise. Writing to `-` appends.
pub fn set(value: &mut Value, pointer: impl ToPointer, new: Value) -> Result<()> {
    write(value, pointer.to_pointer()?, new, false)
}

/// Like [`set`], but numeric keys on arrays shift later elements instead of
/// replacing them.
pub fn insert(value: &mut Value, pointer: impl ToPointer, new: Value) -> Result<()> {
    write(value, pointer.to_pointer()?, new, true)
}

/// Remove and return the value at `pointer`.
///
/// On arrays the key `-` removes the last element.
pub fn remove(value: &mut Value, pointer: impl ToPointer) -> Result<Value> {
    let pointer = pointer.to_pointer()?;
    let Some((last, parents)) = pointer.keys().split_last() else {
        return Err(CompileError::malformed("remove", "cannot remove the root"));
    };
    let parent = resolve_mut(value, parents)?;
    let removed = match parent {
        Value::Object(map) => map.shift_remove(last),
        Value::Array(items) if last == "-" => items.pop(),
        Value::Array(items) => match parse_index(last) {
            Some(i) if i < items.len() => Some(items.remove(i)),
            _ => None,
        },
        _ => None,
    };
    removed.ok_or_else(|| CompileError::miss(pointer.compile()))
}

fn resolve<'a>(value: &'a Value, keys: &[String]) -> Result<&'a Value> {
    let mut current = value;
    for (depth, key) in keys.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(key),
            Value::Array(items) => array_slot(items.len(), key).and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| CompileError::miss(compile_keys(&keys[..=depth])))?;
    }
    Ok(current)
}

fn resolve_mut<'a>(value: &'a mut Value, keys: &[String]) -> Result<&'a mut Value> {
    let mut current = value;
    for (depth, key) in keys.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get_mut(key),
            Value::Array(items) => array_slot(items.len(), key).and_then(|i| items.get_mut(i)),
            _ => None,
        };
        current = next.ok_or_else(|| CompileError::miss(compile_keys(&keys[..=depth])))?;
    }
    Ok(current)
}

/// Index for reading: numeric keys as-is, `-` as the last element.
fn array_slot(len: usize, key: &str) -> Option<usize> {
    if key == "-" {
        len.checked_sub(1)
    } else {
        parse_index(key)
    }
}

fn container_for(next_key: &str) -> Value {
    if next_key == "-" || parse_index(next_key).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn write(value: &mut Value, pointer: Pointer, new: Value, insert: bool) -> Result<()> {
    let keys = pointer.keys();
    let Some((last, parents)) = keys.split_last() else {
        *value = new;
        return Ok(());
    };

    let mut current = value;
    for (depth, key) in parents.iter().enumerate() {
        if current.is_null() {
            *current = container_for(key);
        }
        let next_key = &keys[depth + 1];
        current = match current {
            Value::Object(map) => {
                let child = map
                    .entry(key.clone())
                    .or_insert_with(|| container_for(next_key));
                if child.is_null() {
                    *child = container_for(next_key);
                }
                child
            }
            Value::Array(items) => {
                let index = if key == "-" {
                    items.len()
                } else {
                    parse_index(key).ok_or_else(|| {
                        CompileError::malformed(
                            "set",
                            format!("`{key}` is not an array index at {pointer}"),
                        )
                    })?
                };
                if index == items.len() {
                    items.push(Value::Null);
                }
                let child = items.get_mut(index).ok_or_else(|| past_end(&pointer, index))?;
                if child.is_null() {
                    *child = container_for(next_key);
                }
                child
            }
            _ => {
                return Err(CompileError::malformed(
                    "set",
                    format!(
                        "cannot descend into a scalar at {}",
                        compile_keys(&keys[..=depth])
                    ),
                ));
            }
        };
    }

    if current.is_null() {
        *current = container_for(last);
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), new);
        }
        Value::Array(items) if last == "-" => items.push(new),
        Value::Array(items) => {
            let index = parse_index(last).ok_or_else(|| {
                CompileError::malformed(
                    "set",
                    format!("`{last}` is not an array index at {pointer}"),
                )
            })?;
            if index > items.len() {
                return Err(past_end(&pointer, index));
            }
            if insert || index == items.len() {
                items.insert(index, new);
            } else {
                items[index] = new;
            }
        }
        _ => {
            return Err(CompileError::malformed(
                "set",
                format!("cannot write below a scalar at {pointer}"),
            ));
        }
    }
    Ok(())
}

/// Arrays only grow by appending; a write may not leave holes.
fn past_end(pointer: &Pointer, index: usize) -> CompileError {
    CompileError::malformed(
        "set",
        format!("index {index} is past the end of the array at {pointer}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_paths() {
        let doc = json!({"a": {"b": [1, 2, {"c": "x"}]}});
        assert_eq!(get(&doc, "/a/b/0"), Some(&json!(1)));
        assert_eq!(get(&doc, "/a/b/-/c"), Some(&json!("x")));
        assert_eq!(get(&doc, ""), Some(&doc));
        assert_eq!(get(&doc, "/a/z"), None);
        assert_eq!(get(&doc, "/a/b/9"), None);
        assert_eq!(get(&doc, "not a pointer"), None);
        assert!(has(&doc, ["a", "b"]));
        assert!(!has(&doc, "/a/b/0/deeper"));
    }

    #[test]
    fn test_try_get_reports_deepest_missing_key() {
        let doc = json!({"a": {}});
        let err = try_get(&doc, "/a/b/c").unwrap_err();
        assert_eq!(err, CompileError::miss("/a/b"));
    }

    #[test]
    fn test_get_slice_parent() {
        let doc = json!({"a": {"b": {"c": 1}}});
        assert_eq!(get_slice(&doc, "/a/b/c", 0, Some(-1)), Some(&json!({"c": 1})));
        assert_eq!(get_slice(&doc, "/x/a/b", 1, None), Some(&json!({"c": 1})));
        assert_eq!(get_slice(&doc, "", 0, Some(-1)), None);
    }

    #[test]
    fn test_set_autovivifies() {
        let mut doc = Value::Null;
        set(&mut doc, "/list/0/name", json!("first")).unwrap();
        set(&mut doc, "/list/-", json!({"name": "second"})).unwrap();
        set(&mut doc, "/map/key", json!(true)).unwrap();
        assert_eq!(
            doc,
            json!({"list": [{"name": "first"}, {"name": "second"}], "map": {"key": true}})
        );
    }

    #[test]
    fn test_set_rejects_scalar_parent() {
        let mut doc = json!({"a": 1});
        assert!(set(&mut doc, "/a/b", json!(2)).is_err());
    }

    #[test]
    fn test_set_rejects_indices_past_the_end() {
        let mut doc = json!({"a": []});
        assert!(set(&mut doc, "/a/18446744073709551615/b", json!(1)).is_err());
        assert!(set(&mut doc, "/a/5", json!(1)).is_err());
        assert!(insert(&mut doc, "/a/3", json!(1)).is_err());
        assert_eq!(doc, json!({"a": []}));

        set(&mut doc, "/a/0", json!(1)).unwrap();
        set(&mut doc, "/a/1/b", json!(2)).unwrap();
        assert_eq!(doc, json!({"a": [1, {"b": 2}]}));
    }

    #[test]
    fn test_insert_shifts() {
        let mut doc = json!([1, 3]);
        insert(&mut doc, "/1", json!(2)).unwrap();
        assert_eq!(doc, json!([1, 2, 3]));
        set(&mut doc, "/1", json!(9)).unwrap();
        assert_eq!(doc, json!([1, 9, 3]));
    }

    #[test]
    fn test_remove() {
        let mut doc = json!({"a": [1, 2, 3], "b": 1});
        assert_eq!(remove(&mut doc, "/a/-").unwrap(), json!(3));
        assert_eq!(remove(&mut doc, "/a/0").unwrap(), json!(1));
        assert_eq!(remove(&mut doc, "/b").unwrap(), json!(1));
        assert_eq!(doc, json!({"a": [2]}));
        assert!(remove(&mut doc, "/b").is_err());
        assert!(remove(&mut doc, "").is_err());
    }

    #[test]
    fn test_get_first_skips_null_and_missing() {
        let a = json!({"x": null});
        let b = json!({"y": {"z": 5}});
        let found = get_first([(&a, "/x"), (&a, "/missing"), (&b, "/y/z")]);
        assert_eq!(found, Some(&json!(5)));
    }
}

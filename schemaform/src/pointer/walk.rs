use serde_json::Value;

use super::join;

/// Visiting order for deep walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrder {
    /// Parents before children.
    TopDown,
    /// Children before parents.
    BottomUp,
}

/// Call `f` on every value in `value`, root included, with its pointer.
pub fn for_each_deep<F>(value: &Value, order: WalkOrder, f: &mut F)
where
    F: FnMut(&Value, &str),
{
    walk(value, "", order, f);
}

fn walk<F>(value: &Value, pointer: &str, order: WalkOrder, f: &mut F)
where
    F: FnMut(&Value, &str),
{
    if order == WalkOrder::TopDown {
        f(value, pointer);
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &join(pointer, key), order, f);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, &format!("{pointer}/{index}"), order, f);
            }
        }
        _ => {}
    }
    if order == WalkOrder::BottomUp {
        f(value, pointer);
    }
}

/// Rebuild `value` by passing every object and array through `f`.
///
/// `f` receives each container together with its pointer (prefixed by
/// `base`) and returns its replacement. Scalars are copied unchanged.
/// Top-down, children of the replacement are visited; bottom-up, `f` sees a
/// container whose children have already been rewritten.
pub fn for_each_deep_copy<F>(value: &Value, base: &str, order: WalkOrder, f: &mut F) -> Value
where
    F: FnMut(Value, &str) -> Value,
{
    rebuild(value.clone(), base, order, f)
}

fn rebuild<F>(value: Value, pointer: &str, order: WalkOrder, f: &mut F) -> Value
where
    F: FnMut(Value, &str) -> Value,
{
    if !value.is_object() && !value.is_array() {
        return value;
    }
    let mut node = if order == WalkOrder::TopDown {
        f(value, pointer)
    } else {
        value
    };
    match &mut node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let taken = child.take();
                *child = rebuild(taken, &join(pointer, key), order, f);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                let taken = child.take();
                *child = rebuild(taken, &format!("{pointer}/{index}"), order, f);
            }
        }
        _ => {}
    }
    if order == WalkOrder::BottomUp {
        node = f(node, pointer);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_for_each_deep_orders() {
        let doc = json!({"a": {"b": 1}, "c": [true]});
        let mut top_down = Vec::new();
        for_each_deep(&doc, WalkOrder::TopDown, &mut |_, p| top_down.push(p.to_string()));
        assert_eq!(top_down, ["", "/a", "/a/b", "/c", "/c/0"]);

        let mut bottom_up = Vec::new();
        for_each_deep(&doc, WalkOrder::BottomUp, &mut |_, p| bottom_up.push(p.to_string()));
        assert_eq!(bottom_up, ["/a/b", "/a", "/c/0", "/c", ""]);
    }

    #[test]
    fn test_pointer_keys_are_escaped() {
        let doc = json!({"a/b": {"~": 1}});
        let mut seen = Vec::new();
        for_each_deep(&doc, WalkOrder::TopDown, &mut |_, p| seen.push(p.to_string()));
        assert_eq!(seen, ["", "/a~1b", "/a~1b/~0"]);
    }

    #[test]
    fn test_for_each_deep_copy_bottom_up() {
        let doc = json!({"x": {"count": 1}, "y": [{"count": 2}]});
        let copy = for_each_deep_copy(&doc, "", WalkOrder::BottomUp, &mut |mut node, _| {
            if let Some(n) = node.get("count").and_then(Value::as_i64) {
                node["count"] = json!(n * 10);
            }
            node
        });
        assert_eq!(copy, json!({"x": {"count": 10}, "y": [{"count": 20}]}));
        assert_eq!(doc["x"]["count"], json!(1));
    }

    #[test]
    fn test_for_each_deep_copy_base_pointer() {
        let doc = json!({"k": {}});
        let mut seen = Vec::new();
        for_each_deep_copy(&doc, "/root", WalkOrder::TopDown, &mut |node, p| {
            seen.push(p.to_string());
            node
        });
        assert_eq!(seen, ["/root", "/root/k"]);
    }
}

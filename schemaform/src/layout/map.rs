use serde_json::Value;

/// One layout element handed to the [`map_layout`] callback.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEntry<T> {
    /// The element with its `items` (or `tabs`) removed.
    pub item: Value,
    /// Mapped children, when the element had an `items` / `tabs` list.
    pub items: Option<Vec<T>>,
    /// Position in the output list.
    pub index: usize,
    /// Layout pointer of the element in the output tree.
    pub pointer: String,
    /// `type` of the enclosing layout element, if it has one.
    pub parent_type: Option<String>,
}

/// Map a nested layout list depth-first, children before parents.
///
/// `f` may return zero, one or many outputs per element; output order
/// follows input order and the index of every later sibling is shifted
/// accordingly. `tabs` is read as an alias of `items`.
pub fn map_layout<T, F>(layout: &[Value], f: &mut F) -> Vec<T>
where
    F: FnMut(LayoutEntry<T>) -> Vec<T>,
{
    map_level(layout, "", None, f)
}

fn map_level<T, F>(layout: &[Value], base: &str, parent_type: Option<&str>, f: &mut F) -> Vec<T>
where
    F: FnMut(LayoutEntry<T>) -> Vec<T>,
{
    let mut out = Vec::with_capacity(layout.len());
    for item in layout {
        let index = out.len();
        let pointer = format!("{base}/{index}");
        let mut item = item.clone();
        let mut children = None;
        if let Value::Object(object) = &mut item {
            let nested = object
                .shift_remove("items")
                .or_else(|| object.shift_remove("tabs"));
            if let Some(nested) = nested {
                let list = match nested {
                    Value::Array(list) => list,
                    single => vec![single],
                };
                let node_type = object.get("type").and_then(Value::as_str).map(str::to_string);
                children = Some(map_level(
                    &list,
                    &format!("{pointer}/items"),
                    node_type.as_deref(),
                    f,
                ));
            }
        }
        out.extend(f(LayoutEntry {
            item,
            items: children,
            index,
            pointer,
            parent_type: parent_type.map(str::to_string),
        }));
    }
    out
}

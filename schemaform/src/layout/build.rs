use serde_json::{Map, Value};

use super::{
    ArrayItemType, LayoutEntry, LayoutNode, map_layout,
    from_schema::{ArrayAt, ArraySize, BuildArgs, into_template, starts_with_add},
    options::{apply_title_map, fix_title, normalize_layout_options, update_input_options},
};
use crate::{
    context::CompilationContext,
    error::CompileError,
    pointer::{
        self, Pointer, ToPointer, compile_keys, is_json_pointer, is_sub_pointer, parse_index,
        parse_object_path, to_key, translate::generic_or_same,
    },
    schema::{
        check_inline_type, data_type_of, get_input_type, is_input_required, resolved_type,
        remove_recursive_references,
    },
};

/// Keys of an explicit layout object that describe the node itself. Every
/// other key is a widget option.
const NODE_KEYS: &[&str] = &[
    "id",
    "$ref",
    "arrayItem",
    "arrayItemType",
    "dataPointer",
    "dataType",
    "items",
    "key",
    "name",
    "options",
    "recursiveReference",
    "type",
    "widget",
];

impl CompilationContext {
    /// Compile a layout description into the layout tree.
    ///
    /// Without a layout, and wherever the wildcard `"*"` appears, the form
    /// is built from the schema. Other entries are strings (a `key` path or
    /// a data pointer) or objects; each is matched against the compiled
    /// schema to fill in its type, options and array items. A trailing
    /// `submit` node is added when `addSubmit` is set and none exists.
    pub fn build_layout(&mut self, layout: Option<&Value>) -> Vec<LayoutNode> {
        let layout = match layout {
            None | Some(Value::Null) => vec![Value::from("*")],
            Some(Value::Array(list)) => list.clone(),
            Some(single) => vec![single.clone()],
        };
        let mut has_submit = false;
        let mut tree = map_layout(&layout, &mut |entry: LayoutEntry<LayoutNode>| {
            let nodes = self.build_entry(entry);
            has_submit |= nodes.iter().any(|n| n.node_type == "submit");
            nodes
        });
        if self.options.add_submit && !has_submit {
            tree.push(LayoutNode {
                id: Some(self.next_id()),
                node_type: "submit".to_string(),
                ..Default::default()
            });
        }
        debug!(
            "layout built: {} top-level nodes, {} library templates",
            tree.len(),
            self.layout_ref_library.len()
        );
        tree
    }

    fn build_entry(&mut self, entry: LayoutEntry<LayoutNode>) -> Vec<LayoutNode> {
        let LayoutEntry {
            item,
            items,
            pointer: layout_pointer,
            parent_type,
            ..
        } = entry;
        let object = match item {
            Value::String(s) if s == "*" => return self.build_wildcard(),
            Value::String(s) if is_json_pointer(&s) => {
                Map::from_iter([("dataPointer".to_string(), Value::String(s))])
            }
            Value::String(s) => Map::from_iter([("key".to_string(), Value::String(s))]),
            Value::Object(object) => object,
            other => {
                let err = CompileError::malformed(
                    "build_layout",
                    format!("layout item {other} at {layout_pointer} is neither a key nor an object"),
                );
                self.diagnostics.report("build_layout", &err);
                return Vec::new();
            }
        };

        let mut node = self.explicit_node(object);
        if node.data_pointer.as_deref() == Some("*") {
            return self.build_wildcard();
        }
        if node.data_pointer.is_none()
            && matches!(node.node_type.as_str(), "array" | "tabarray")
            && let Some(items) = &items
        {
            node.data_pointer = list_parent_of(items);
        }
        let node = match node.data_pointer.take() {
            Some(data_pointer) => self.data_node(node, &data_pointer, items),
            None => self.plain_node(node, items, parent_type.as_deref()),
        };
        vec![node]
    }

    fn build_wildcard(&mut self) -> Vec<LayoutNode> {
        let values = self.form_values.clone();
        self.build_layout_from_schema(BuildArgs::root(values))
            .into_iter()
            .collect()
    }

    /// Split an explicit layout object into node fields and options.
    fn explicit_node(&mut self, object: Map<String, Value>) -> LayoutNode {
        let mut node = LayoutNode {
            id: Some(self.next_id()),
            ..Default::default()
        };
        let mut widget = None;
        let mut key = None;
        for (name, value) in object {
            if !NODE_KEYS.contains(&name.as_str()) {
                node.options.insert(name, value);
                continue;
            }
            match name.as_str() {
                "type" => node.node_type = value.as_str().unwrap_or_default().to_string(),
                "widget" => widget = value.as_str().map(str::to_string),
                "dataPointer" => node.data_pointer = value.as_str().map(str::to_string),
                "name" => node.name = value.as_str().map(str::to_string),
                "key" => key = Some(value),
                "arrayItem" => node.array_item = value.as_bool().unwrap_or(false),
                "options" => {
                    if let Value::Object(options) = value {
                        node.options.extend(options);
                    }
                }
                _ => {}
            }
        }
        if node.node_type.is_empty()
            && let Some(widget) = widget
        {
            node.node_type = widget;
        }
        normalize_layout_options(&mut node.options);

        let keys = match key {
            Some(Value::String(key)) if key == "*" => Some(vec!["*".to_string()]),
            Some(Value::String(key)) => Some(parse_object_path(&key)),
            Some(keys @ Value::Array(_)) => keys.to_pointer().ok().map(Pointer::into_keys),
            _ => None,
        };
        match keys {
            Some(keys) if keys == ["*"] => node.data_pointer = Some("*".to_string()),
            Some(keys) => node.data_pointer = Some(Pointer::from(keys).compile_with_default("-")),
            None => {}
        }
        node
    }

    /// Finish a node bound to data: look up its schema and fill in what the
    /// layout left out.
    fn data_node(
        &mut self,
        mut node: LayoutNode,
        raw_pointer: &str,
        items: Option<Vec<LayoutNode>>,
    ) -> LayoutNode {
        let data_pointer = match pointer::compile(raw_pointer) {
            Ok(compiled) => generic_or_same(&compiled, &self.array_map),
            Err(e) => {
                self.diagnostics.report("build_layout", &e);
                raw_pointer.to_string()
            }
        };
        node.data_pointer = Some(data_pointer.clone());
        if node.name.is_none()
            && let Some(key) = to_key(&data_pointer)
            && key != "-"
        {
            node.name = Some(key);
        }
        let short_pointer =
            remove_recursive_references(&data_pointer, &self.data_recursive_ref_map, &self.array_map);
        let recursive =
            !data_pointer.is_empty() && (short_pointer.is_empty() || short_pointer != data_pointer);

        let known = self
            .data_map
            .get(&short_pointer)
            .and_then(|entry| entry.schema_pointer.clone());
        let schema_pointer = match known {
            Some(schema_pointer) => Some(schema_pointer),
            None => {
                let result = pointer::to_schema_pointer(&short_pointer, &self.schema);
                self.diagnostics.ok("build_layout", result)
            }
        };
        let schema = schema_pointer
            .as_deref()
            .and_then(|p| pointer::get(&self.schema, p))
            .cloned();

        match &schema {
            Some(schema) => {
                let layout_options = node.options.clone();
                node.node_type = if node.node_type.is_empty() {
                    let result = get_input_type(schema, Some(&layout_options));
                    self.recover("build_layout", result, "none".to_string())
                } else {
                    check_inline_type(&node.node_type, schema, Some(&layout_options))
                };
                node.data_type = data_type_of(schema);
                update_input_options(&mut node, schema, &self.options);
                if node.node_type == "checkboxes"
                    && let Some(items) = schema.get("items")
                {
                    update_input_options(&mut node, items, &self.options);
                }
                if let Some(schema_pointer) = &schema_pointer
                    && is_input_required(&self.schema, schema_pointer)
                {
                    node.required = true;
                    node.set_option("required", true);
                    self.fields_required = true;
                }
            }
            None => update_input_options(&mut node, &Value::Object(Map::new()), &self.options),
        }
        if node.option_str("title").is_none()
            && let Some(name) = node.name.as_deref()
            && parse_index(name).is_none()
        {
            let title = fix_title(name);
            node.set_option("title", title);
        }
        apply_title_map(&mut node);

        let entry = self.data_map_entry(&short_pointer);
        if let Some(schema_pointer) = &schema_pointer {
            entry.schema_pointer.get_or_insert_with(|| schema_pointer.clone());
        }
        entry.input_type.get_or_insert_with(|| node.node_type.clone());
        entry.required |= node.required;
        entry.disabled = node.option_bool("disabled").unwrap_or(false);
        if let Some(schema) = &schema
            && resolved_type(schema) == Some("object")
            && let Some(required) = schema.get("required").and_then(Value::as_array)
        {
            let keys = required
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect();
            entry.required_properties.get_or_insert(keys);
        }

        let Some(schema) = schema else {
            node.items = items.unwrap_or_default();
            return node;
        };
        let value = self.explicit_value(&data_pointer, &schema);
        let is_array = node.data_type.as_deref() == Some("array");
        if is_array {
            let size = self.explicit_array_size(&node, &schema, value.as_ref());
            size.write_to(&mut node);
            self.record_array(&short_pointer, &size);
            if let Some(items) = items {
                let args = BuildArgs {
                    schema_pointer: schema_pointer.clone().unwrap_or_default(),
                    data_pointer: data_pointer.clone(),
                    ..Default::default()
                };
                let at = ArrayAt {
                    args: &args,
                    short_pointer: &short_pointer,
                    full_pointer: &data_pointer,
                };
                self.explicit_array_items(&mut node, items, &at, &schema, value.as_ref(), recursive, &size);
                return node;
            }
        }
        match items {
            Some(items) => node.items = items,
            None if is_array || node.data_type.as_deref() == Some("object") => {
                let args = BuildArgs {
                    node_value: value,
                    schema_pointer: schema_pointer.unwrap_or_default(),
                    data_pointer,
                    ..Default::default()
                };
                if let Some(built) = self.build_layout_from_schema(args) {
                    node.items = built.items;
                }
            }
            None => {}
        }
        node
    }

    /// Current data at a (generic) data pointer, or the schema default.
    fn explicit_value(&self, data_pointer: &str, schema: &Value) -> Option<Value> {
        let from_data = self
            .form_values
            .as_ref()
            .and_then(|values| pointer::get(values, data_pointer.replace("/-", "/0")));
        match from_data {
            Some(value) => Some(value.clone()),
            None if self.use_schema_defaults() => schema.get("default").cloned(),
            None => None,
        }
    }

    fn explicit_array_size(&self, node: &LayoutNode, schema: &Value, value: Option<&Value>) -> ArraySize {
        let cap = self.options.max_items_cap;
        let schema_usize = |key: &str| {
            schema
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
        };
        let max_items = schema_usize("maxItems")
            .unwrap_or(cap)
            .min(node.option_usize("maxItems").unwrap_or(cap));
        let min_items = schema_usize("minItems")
            .unwrap_or(0)
            .max(node.option_usize("minItems").unwrap_or(0));
        let tuple_items = schema.get("items").and_then(Value::as_array).map_or(0, Vec::len);
        let data_len = value.and_then(Value::as_array).map_or(0, Vec::len);
        let list_items = node
            .option_usize("listItems")
            .unwrap_or(0)
            .max(data_len.saturating_sub(tuple_items));
        ArraySize::new(min_items, max_items, tuple_items, list_items)
    }

    /// Lay out the items of an explicit array node in tuple-then-list
    /// order: one node per tuple position built from its `items/<i>`
    /// schema, then the children addressing list items gathered into one
    /// item group (stored as the list template), further default list
    /// items and the "add" control.
    #[allow(clippy::too_many_arguments)]
    fn explicit_array_items(
        &mut self,
        node: &mut LayoutNode,
        items: Vec<LayoutNode>,
        at: &ArrayAt<'_>,
        schema: &Value,
        value: Option<&Value>,
        recursive: bool,
        size: &ArraySize,
    ) {
        let base = node.data_pointer.clone().unwrap_or_default();
        let item_pointer = format!("{base}/-");
        let (mut group, fixed): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| {
            item.data_pointer
                .as_deref()
                .is_some_and(|p| is_sub_pointer(&base, p, false))
        });
        node.items = fixed;

        let removable = node.option_bool("removable") != Some(false)
            && node.option_bool("readonly") != Some(true);
        self.tuple_items(node, size, at, value, removable);

        let has_list = schema.get("items").is_some_and(Value::is_object)
            || schema.get("additionalItems").is_some_and(Value::is_object);
        if !has_list {
            if !group.is_empty() {
                debug!("{base}: tuple array has no list items, item group dropped");
            }
            return;
        }
        let mut template = match group.len() {
            0 => None,
            1 if group[0].data_pointer.as_deref() == Some(item_pointer.as_str()) => group.pop(),
            _ => Some(LayoutNode {
                id: Some(self.next_id()),
                node_type: "section".to_string(),
                data_pointer: Some(item_pointer.clone()),
                items: group,
                ..Default::default()
            }),
        };
        let key = format!("{}/-", at.short_pointer);
        if let Some(item) = template.as_mut() {
            item.array_item = true;
            item.array_item_type = Some(ArrayItemType::List);
            item.set_option("removable", removable);
            if !self.layout_ref_library.contains(&key) {
                let mut stored = into_template(item.clone(), recursive);
                if recursive {
                    stored.walk_mut(&mut |n| {
                        if let Some(p) = n.data_pointer.as_mut()
                            && is_sub_pointer(&item_pointer, p, true)
                        {
                            *p = p[item_pointer.len()..].to_string();
                        }
                    });
                }
                trace!("layout library: storing explicit item group {key}");
                self.layout_ref_library.insert(&key, stored);
            }
        }
        let length = (size.tuple_items + size.list_items).min(size.max_items);
        if count_items(node) >= length {
            template = None;
        }
        node.items.extend(template);
        if !self.layout_ref_library.contains(&key) {
            return;
        }

        if !recursive || node.required {
            for _ in count_items(node)..length {
                let item = self.instantiate_item(&key, item_pointer.clone(), recursive, None);
                node.items.extend(item);
            }
        }

        let last_is_ref = node.items.last().is_some_and(|n| n.node_type == "$ref");
        let item_count = count_items(node);
        if node.option_bool("addable") != Some(false)
            && size.min_items < size.max_items
            && item_count < size.max_items
            && !last_is_ref
        {
            let title = match node.option_str("title") {
                Some(title) if starts_with_add(title) => title.to_string(),
                Some(title) => format!("Add {title}"),
                None => self.add_button_title(&key, schema, &node.data_pointer),
            };
            let mut button = LayoutNode::reference(&key, item_pointer, recursive);
            button.id = Some(self.next_id());
            size.write_add_button(&mut button, title);
            if let Some(style) = take_add_style(node) {
                button.set_option("fieldStyle", style);
            }
            node.items.push(button);
        }
    }

    /// Finish a node with no data binding: a group, tab or static element.
    fn plain_node(
        &mut self,
        mut node: LayoutNode,
        items: Option<Vec<LayoutNode>>,
        parent_type: Option<&str>,
    ) -> LayoutNode {
        let has_items = items.is_some();
        node.items = items.unwrap_or_default();
        if node.node_type.is_empty() || has_items {
            if node.node_type.is_empty() {
                node.node_type = match parent_type {
                    Some("tabs" | "tabarray") => "tab",
                    _ => "array",
                }
                .to_string();
            }
            node.array_item = parent_type == Some("array");
            update_input_options(&mut node, &Value::Object(Map::new()), &self.options);
        }
        if node.option_str("title").is_none()
            && let Some(name) = node.name.as_deref()
        {
            let title = fix_title(name);
            node.set_option("title", title);
        }
        node
    }
}

/// Array pointer implied by the first descendant addressing a list item.
fn list_parent_of(items: &[LayoutNode]) -> Option<String> {
    let mut found = None;
    for item in items {
        item.walk(&mut |n| {
            if found.is_none()
                && let Some(p) = n.data_pointer.as_deref()
                && let Ok(keys) = pointer::parse(p)
                && let Some(i) = keys.iter().rposition(|k| k == "-")
            {
                found = Some(compile_keys(&keys[..i]));
            }
        });
        if found.is_some() {
            break;
        }
    }
    found
}

/// Number of array item children.
fn count_items(node: &LayoutNode) -> usize {
    node.items.iter().filter(|n| n.array_item).count()
}

/// Remove a string `style.add` from `node`, dropping `style` if it empties.
fn take_add_style(node: &mut LayoutNode) -> Option<Value> {
    let Some(Value::Object(style)) = node.options.get_mut("style") else {
        return None;
    };
    if !style.get("add").is_some_and(Value::is_string) {
        return None;
    }
    let add = style.shift_remove("add");
    let empty = style.is_empty();
    if empty {
        node.options.shift_remove("style");
    }
    add
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FormOptions;
    use serde_json::json;

    fn context(schema: Value, options: FormOptions) -> CompilationContext {
        let mut ctx = CompilationContext::new(options);
        ctx.load_schema(&schema).unwrap();
        ctx
    }

    fn profile_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "tags": {"type": "array", "maxItems": 3, "items": {"type": "string"}}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn test_no_layout_builds_from_schema() {
        let options = FormOptions {
            add_submit: true,
            ..Default::default()
        };
        let mut ctx = context(profile_schema(), options);
        let tree = ctx.build_layout(None);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].node_type, "section");
        assert_eq!(tree[0].items[0].data_pointer.as_deref(), Some("/name"));
        assert_eq!(tree[1].node_type, "submit");
    }

    #[test]
    fn test_explicit_keys() {
        let mut ctx = context(profile_schema(), FormOptions::default());
        let layout = json!([
            "name",
            {"key": "tags", "items": ["tags[]"], "style": {"add": "btn-success"}},
            {"type": "submit", "title": "Go"}
        ]);
        let tree = ctx.build_layout(Some(&layout));
        assert_eq!(tree.len(), 3);

        let name = &tree[0];
        assert_eq!(name.data_pointer.as_deref(), Some("/name"));
        assert_eq!(name.node_type, "text");
        assert!(name.required);
        assert_eq!(name.option_str("title"), Some("Name"));
        assert!(ctx.fields_required);

        let tags = &tree[1];
        assert_eq!(tags.node_type, "array");
        assert_eq!(tags.option_usize("maxItems"), Some(3));
        assert_eq!(tags.items.len(), 2);
        assert_eq!(tags.items[0].data_pointer.as_deref(), Some("/tags/-"));
        assert!(tags.items[0].array_item);
        let add = &tags.items[1];
        assert_eq!(add.node_type, "$ref");
        assert_eq!(add.layout_ref.as_deref(), Some("/tags/-"));
        assert_eq!(add.option_str("title"), Some("Add Tags"));
        assert_eq!(add.option_str("fieldStyle"), Some("btn-success"));
        assert!(tags.option("style").is_none());
        assert!(ctx.layout_ref_library.contains("/tags/-"));

        assert_eq!(tree[2].node_type, "submit");
        assert_eq!(tree[2].option_str("title"), Some("Go"));
        assert_eq!(ctx.data_map["/name"].input_type.as_deref(), Some("text"));
    }

    #[test]
    fn test_array_pointer_inferred_from_items() {
        let mut ctx = context(profile_schema(), FormOptions::default());
        let layout = json!([{"type": "array", "items": [{"key": "tags[]", "legend": "Tag"}]}]);
        let tree = ctx.build_layout(Some(&layout));
        assert_eq!(tree[0].data_pointer.as_deref(), Some("/tags"));
        assert_eq!(tree[0].items[0].option_str("title"), Some("Tag"));
    }

    #[test]
    fn test_tabs_children_default_to_tab() {
        let mut ctx = context(profile_schema(), FormOptions::default());
        let layout = json!([{"type": "tabs", "tabs": [{"title": "One", "items": ["name"]}]}]);
        let tree = ctx.build_layout(Some(&layout));
        let tab = &tree[0].items[0];
        assert_eq!(tab.node_type, "tab");
        assert_eq!(tab.items[0].data_pointer.as_deref(), Some("/name"));
    }

    #[test]
    fn test_object_without_items_is_synthesised() {
        let schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}, "zip": {"type": "string"}}
                }
            }
        });
        let mut ctx = context(schema, FormOptions::default());
        let tree = ctx.build_layout(Some(&json!([{"key": "address", "type": "fieldset"}])));
        assert_eq!(tree[0].node_type, "fieldset");
        let pointers: Vec<_> = tree[0]
            .items
            .iter()
            .filter_map(|n| n.data_pointer.as_deref())
            .collect();
        assert_eq!(pointers, ["/address/city", "/address/zip"]);
    }

    fn pair_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "pair": {
                    "type": "array",
                    "items": [{"type": "string"}, {"type": "number"}],
                    "additionalItems": {"type": "boolean"}
                }
            }
        })
    }

    fn shape(node: &LayoutNode) -> Vec<(&str, &str)> {
        node.items
            .iter()
            .map(|n| (n.node_type.as_str(), n.data_pointer.as_deref().unwrap_or_default()))
            .collect()
    }

    #[test]
    fn test_explicit_tuple_array_orders_tuple_then_list() {
        let mut ctx = context(pair_schema(), FormOptions::default());
        let tree = ctx.build_layout(Some(&json!([{"key": "pair", "items": ["pair[]"]}])));
        let pair = &tree[0];
        assert_eq!(
            shape(pair),
            [
                ("text", "/pair/0"),
                ("number", "/pair/1"),
                ("checkbox", "/pair/-"),
                ("$ref", "/pair/-")
            ]
        );
        assert_eq!(pair.items[0].array_item_type, Some(ArrayItemType::Tuple));
        assert_eq!(pair.items[1].array_item_type, Some(ArrayItemType::Tuple));
        assert_eq!(pair.items[2].array_item_type, Some(ArrayItemType::List));
        assert_eq!(
            ctx.layout_ref_library.get("/pair/-").map(|t| t.node_type.as_str()),
            Some("checkbox")
        );
    }

    #[test]
    fn test_tab_type_ignores_dropped_siblings() {
        let mut ctx = context(profile_schema(), FormOptions::default());
        let layout = json!([42, {"type": "tabs", "items": [{"title": "T", "items": ["name"]}]}]);
        let tree = ctx.build_layout(Some(&layout));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].items[0].node_type, "tab");
    }

    #[test]
    fn test_unknown_item_is_reported() {
        let mut ctx = context(profile_schema(), FormOptions::default());
        let tree = ctx.build_layout(Some(&json!([42, "name"])));
        assert_eq!(tree.len(), 1);
        assert_eq!(ctx.diagnostics.len(), 1);
    }
}

use serde_json::Value;

use super::{
    ArrayItemType, LayoutNode,
    options::{apply_title_map, fix_title, update_input_options},
};
use crate::{
    context::{ArrayMap, CompilationContext},
    error::{CompileError, Result},
    pointer::{self, escape, is_sub_pointer, parse_index, to_key, translate::generic_or_same},
    schema::{
        ItemsShape, SchemaKind, data_type_of, get_input_type, is_input_required,
        remove_recursive_references,
    },
};

/// Where and how to build one node from the compiled schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildArgs {
    /// Current value at the node, used to size arrays.
    pub node_value: Option<Value>,
    pub schema_pointer: String,
    /// Data pointer of the node, relative to `data_pointer_prefix`.
    pub data_pointer: String,
    pub array_item: bool,
    pub array_item_type: Option<ArrayItemType>,
    pub removable: Option<bool>,
    /// Building a layout library template; nodes get no ids.
    pub for_ref_library: bool,
    /// Absolute position of a relative (recursive) template.
    pub data_pointer_prefix: String,
}

impl BuildArgs {
    /// Arguments for the whole form.
    pub fn root(node_value: Option<Value>) -> Self {
        Self {
            node_value,
            ..Default::default()
        }
    }

    fn child(&self, node_value: Option<Value>, schema_pointer: String, data_pointer: String) -> Self {
        Self {
            node_value,
            schema_pointer,
            data_pointer,
            for_ref_library: self.for_ref_library,
            data_pointer_prefix: self.data_pointer_prefix.clone(),
            ..Default::default()
        }
    }
}

/// Resolved array bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArraySize {
    pub min_items: usize,
    pub max_items: usize,
    pub tuple_items: usize,
    pub list_items: usize,
}

impl ArraySize {
    /// Clamp tuple and list counts into `min_items..=max_items`.
    pub fn new(min_items: usize, max_items: usize, tuple_items: usize, list_items: usize) -> Self {
        let (tuple_items, list_items) = if max_items <= tuple_items {
            (max_items, 0)
        } else if max_items < tuple_items + list_items {
            (tuple_items, max_items - tuple_items)
        } else if min_items > tuple_items + list_items {
            (tuple_items, min_items - tuple_items)
        } else {
            (tuple_items, list_items)
        };
        Self {
            min_items,
            max_items,
            tuple_items,
            list_items,
        }
    }

    pub fn write_to(&self, node: &mut LayoutNode) {
        node.set_option("maxItems", self.max_items);
        node.set_option("minItems", self.min_items);
        node.set_option("tupleItems", self.tuple_items);
        node.set_option("listItems", self.list_items);
    }

    /// Mark `button` as the "add item" control of an array of this size.
    pub fn write_add_button(&self, button: &mut LayoutNode, title: String) {
        button.array_item = true;
        button.array_item_type = Some(ArrayItemType::List);
        button.set_option("listItems", self.list_items);
        button.set_option("maxItems", self.max_items);
        button.set_option("minItems", self.min_items);
        button.set_option("removable", false);
        button.set_option("title", title);
        button.set_option("tupleItems", self.tuple_items);
    }
}

impl CompilationContext {
    /// Build the layout node for the schema at `args.schema_pointer`.
    ///
    /// Objects get one child per property, arrays their tuple items, enough
    /// list items for the minimum / current data, and an "add" control.
    /// Array items and recursive references are built once into the layout
    /// library and instantiated from there. Returns `None` for schema nodes
    /// with nothing to render.
    pub fn build_layout_from_schema(&mut self, args: BuildArgs) -> Option<LayoutNode> {
        let schema = match pointer::try_get(&self.schema, &args.schema_pointer) {
            Ok(schema) => schema.clone(),
            Err(e) => {
                self.diagnostics.report("build_layout_from_schema", &e);
                return None;
            }
        };
        if ["type", "$ref", "x-schema-form"]
            .iter()
            .all(|k| schema.get(*k).is_none())
        {
            return None;
        }

        let node_type = self.recover(
            "build_layout_from_schema",
            get_input_type(&schema, None),
            "none".to_string(),
        );
        let node_value = args.node_value.clone().or_else(|| {
            self.use_schema_defaults()
                .then(|| schema.get("default").cloned())
                .flatten()
        });
        let data_pointer = generic_or_same(&args.data_pointer, &self.array_map);
        let full_pointer = format!("{}{}", args.data_pointer_prefix, data_pointer);
        let short_pointer = remove_recursive_references(
            &full_pointer,
            &self.data_recursive_ref_map,
            &self.array_map,
        );
        let id = (!args.for_ref_library).then(|| self.next_id());

        let mut node = LayoutNode {
            id,
            data_pointer: Some(data_pointer.clone()),
            node_type,
            data_type: data_type_of(&schema),
            array_item: args.array_item,
            required: is_input_required(&self.schema, &args.schema_pointer),
            ..Default::default()
        };
        if let Some(key) = to_key(&data_pointer)
            && key != "-"
        {
            node.name = Some(key);
        }
        if node.array_item {
            node.array_item_type = args.array_item_type;
            node.set_option("removable", args.removable != Some(false));
        }
        if node.required {
            node.set_option("required", true);
            self.fields_required = true;
        }
        update_input_options(&mut node, &schema, &self.options);
        if node.option_str("title").is_none()
            && let Some(name) = node.name.as_deref()
            && parse_index(name).is_none()
        {
            let title = fix_title(name);
            node.set_option("title", title);
        }
        apply_title_map(&mut node);

        let entry = self.data_map_entry(&short_pointer);
        if entry.input_type.is_none() {
            entry.schema_pointer = Some(args.schema_pointer.clone());
            entry.input_type = Some(node.node_type.clone());
            entry.required = node.required;
            entry.disabled = node.option_bool("disabled").unwrap_or(false);
        }

        match SchemaKind::of(&schema) {
            SchemaKind::Object { .. } => {
                self.object_items(&mut node, &schema, &args, node_value.as_ref(), &short_pointer);
            }
            SchemaKind::Array(shape) => {
                let at = ArrayAt {
                    args: &args,
                    short_pointer: &short_pointer,
                    full_pointer: &full_pointer,
                };
                self.array_items(&mut node, &schema, shape, &at, node_value.as_ref());
            }
            SchemaKind::Ref(target) => {
                self.reference_node(&mut node, target, &args, &full_pointer);
            }
            _ => {}
        }
        Some(node)
    }

    fn object_items(
        &mut self,
        node: &mut LayoutNode,
        schema: &Value,
        args: &BuildArgs,
        value: Option<&Value>,
        short_pointer: &str,
    ) {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            let keys = required
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect();
            let entry = self.data_map_entry(short_pointer);
            entry.required_properties.get_or_insert(keys);
        }
        let properties = schema.get("properties").and_then(Value::as_object);
        let additional = schema.get("additionalProperties").is_some_and(Value::is_object);
        for key in property_order(schema) {
            let schema_pointer = if properties.is_some_and(|p| p.contains_key(&key)) {
                format!("{}/properties/{}", args.schema_pointer, escape(&key))
            } else if additional {
                format!("{}/additionalProperties", args.schema_pointer)
            } else {
                continue;
            };
            let child = args.child(
                value.and_then(|v| v.get(&key)).cloned(),
                schema_pointer,
                pointer::join(&args.data_pointer, &key),
            );
            if let Some(item) = self.build_layout_from_schema(child) {
                node.items.push(item);
            }
        }
    }

    fn array_items(
        &mut self,
        node: &mut LayoutNode,
        schema: &Value,
        shape: ItemsShape<'_>,
        at: &ArrayAt<'_>,
        value: Option<&Value>,
    ) {
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
        let mut min_items = schema_usize("minItems")
            .unwrap_or(0)
            .max(node.option_usize("minItems").unwrap_or(0));
        if min_items == 0 && node.required {
            min_items = 1;
        }
        let size = ArraySize::new(
            min_items,
            max_items,
            shape.tuple_items(),
            node.option_usize("listItems").unwrap_or(1),
        );
        size.write_to(node);
        self.record_array(at.short_pointer, &size);
        let removable = node.option_bool("removable") != Some(false);
        let args = at.args;
        let relative = node.data_pointer.clone().unwrap_or_default();

        if let ItemsShape::Tuple { .. } = shape {
            self.tuple_items(node, &size, at, value, removable);
        }

        let list_schema = match shape {
            ItemsShape::List(_) if schema.get("items").is_some_and(Value::is_object) => "/items",
            ItemsShape::List(_) | ItemsShape::Tuple { additional: Some(_), .. } => "/additionalItems",
            _ => return,
        };
        let key = format!("{}/-", at.short_pointer);
        let instance = format!("{}/-", at.full_pointer);
        let recursive = self.ensure_item_template(
            &key,
            &format!("{}{list_schema}", args.schema_pointer),
            &instance,
            ArrayItemType::List,
            removable,
        );
        let item_pointer = format!("{relative}/-");

        if !recursive || node.required {
            let data_len = value.and_then(Value::as_array).map_or(0, Vec::len);
            let wanted = if recursive {
                0
            } else {
                size.tuple_items + size.list_items
            };
            let length = wanted.max(data_len).min(size.max_items);
            for i in node.items.len()..length {
                let item_value = value.and_then(|v| v.get(i)).cloned();
                let item = self.instantiate_item(&key, item_pointer.clone(), recursive, item_value);
                node.items.extend(item);
            }
        }

        let last_is_ref = node.items.last().is_some_and(|n| n.node_type == "$ref");
        if node.option_bool("addable") != Some(false)
            && size.min_items < size.max_items
            && node.items.len() < size.max_items
            && !last_is_ref
        {
            let title = self.add_button_title(&key, schema, &node.data_pointer);
            let mut button = LayoutNode::reference(&key, item_pointer, recursive);
            button.id = (!args.for_ref_library).then(|| self.next_id());
            size.write_add_button(&mut button, title);
            node.items.push(button);
        }
    }

    /// Tuple positions `0..tuple_items`, each built from its own
    /// `items/<i>` schema. Positions past `minItems` are removable and come
    /// from per-position library templates.
    pub(crate) fn tuple_items(
        &mut self,
        node: &mut LayoutNode,
        size: &ArraySize,
        at: &ArrayAt<'_>,
        value: Option<&Value>,
        removable: bool,
    ) {
        let args = at.args;
        let relative = node.data_pointer.clone().unwrap_or_default();
        for i in 0..size.tuple_items {
            let item_schema = format!("{}/items/{i}", args.schema_pointer);
            let item_value = value.and_then(|v| v.get(i)).cloned();
            let item = if removable && i >= size.min_items {
                let key = format!("{}/{i}", at.short_pointer);
                let instance = format!("{}/{i}", at.full_pointer);
                let recursive = self.ensure_item_template(
                    &key,
                    &item_schema,
                    &instance,
                    ArrayItemType::Tuple,
                    true,
                );
                self.instantiate_item(&key, format!("{relative}/{i}"), recursive, item_value)
            } else {
                self.build_layout_from_schema(BuildArgs {
                    node_value: item_value,
                    schema_pointer: item_schema,
                    data_pointer: format!("{}/{i}", args.data_pointer),
                    array_item: true,
                    array_item_type: Some(ArrayItemType::Tuple),
                    removable: Some(false),
                    for_ref_library: args.for_ref_library,
                    data_pointer_prefix: args.data_pointer_prefix.clone(),
                })
            };
            node.items.extend(item);
        }
    }

    pub(crate) fn record_array(&mut self, short_pointer: &str, size: &ArraySize) {
        let entry = self.data_map_entry(short_pointer);
        entry.max_items.get_or_insert(size.max_items);
        entry.min_items.get_or_insert(size.min_items);
        entry.tuple_items.get_or_insert(size.tuple_items);
        entry.list_items.get_or_insert(size.list_items);
        self.array_map
            .entry(short_pointer.to_string())
            .or_insert(size.tuple_items);
    }

    /// Build the library template for the array item at `key` unless it is
    /// already there (or being built). Returns whether the item is a
    /// recursive reference to an ancestor.
    pub(crate) fn ensure_item_template(
        &mut self,
        key: &str,
        schema_pointer: &str,
        instance: &str,
        item_type: ArrayItemType,
        removable: bool,
    ) -> bool {
        let canonical =
            remove_recursive_references(key, &self.data_recursive_ref_map, &self.array_map);
        let recursive = canonical.is_empty() || canonical != key;
        if !self.layout_ref_library.reserve(key) {
            return recursive;
        }
        let schema_pointer = remove_recursive_references(
            schema_pointer,
            &self.schema_recursive_ref_map,
            &ArrayMap::new(),
        );
        let (data_pointer, data_pointer_prefix) = if recursive {
            (String::new(), instance.to_string())
        } else {
            (key.to_string(), String::new())
        };
        trace!("layout library: building {key} from {schema_pointer}");
        let template = self
            .build_layout_from_schema(BuildArgs {
                node_value: None,
                schema_pointer,
                data_pointer,
                array_item: true,
                array_item_type: Some(item_type),
                removable: Some(removable),
                for_ref_library: true,
                data_pointer_prefix,
            })
            .map(|template| into_template(template, recursive));
        self.layout_ref_library.complete(key, template);
        recursive
    }

    /// Node for a new array item during the initial build: a clone of the
    /// library template, or a placeholder when the item is recursive.
    pub(crate) fn instantiate_item(
        &mut self,
        key: &str,
        instance: String,
        recursive: bool,
        value: Option<Value>,
    ) -> Option<LayoutNode> {
        let reference = LayoutNode::reference(key, instance, recursive);
        if recursive {
            return Some(self.ref_placeholder(reference));
        }
        let result = self.get_layout_node(&reference, value.as_ref());
        self.diagnostics.ok("get_layout_node", result)
    }

    fn ref_placeholder(&mut self, mut reference: LayoutNode) -> LayoutNode {
        let title = reference
            .layout_ref
            .as_deref()
            .and_then(|key| self.layout_ref_library.get(key))
            .and_then(|template| template.option_str("title"))
            .map_or_else(|| "Add item".to_string(), |t| format!("Add {t}"));
        reference.id = Some(self.next_id());
        reference.array_item = true;
        reference.set_option("removable", false);
        reference.set_option("title", title);
        reference
    }

    pub(crate) fn add_button_title(&self, key: &str, schema: &Value, data_pointer: &Option<String>) -> String {
        let template_title = self
            .layout_ref_library
            .get(key)
            .and_then(|t| t.option_str("title"))
            .map(str::to_string);
        let prefix = if template_title.is_some() { "Add " } else { "Add to " };
        let text = template_title
            .or_else(|| schema.get("title").and_then(Value::as_str).map(str::to_string))
            .or_else(|| {
                data_pointer
                    .as_deref()
                    .and_then(to_key)
                    .filter(|k| k != "-" && parse_index(k).is_none())
                    .map(|k| fix_title(&k))
            })
            .unwrap_or_else(|| "list".to_string());
        if starts_with_add(&text) {
            text
        } else {
            format!("{prefix}{text}")
        }
    }

    /// Turn a schema `$ref` node into a library reference.
    fn reference_node(&mut self, node: &mut LayoutNode, raw: &str, args: &BuildArgs, full_pointer: &str) {
        let target = match pointer::compile(raw) {
            Ok(target) => target,
            Err(e) => return self.diagnostics.report("build_layout_from_schema", &e),
        };
        let data_ref = match pointer::to_data_pointer(&target, &self.schema) {
            Ok(data_ref) => data_ref,
            Err(e) => return self.diagnostics.report("build_layout_from_schema", &e),
        };

        let title = match (node.option_str("add"), node.name.as_deref()) {
            (Some(add), _) => add.to_string(),
            (None, Some(name)) if parse_index(name).is_none() => {
                let title = fix_title(name);
                if starts_with_add(&title) { title } else { format!("Add {title}") }
            }
            _ => {
                let parent_title = pointer::get_slice(&self.schema, &args.schema_pointer, 0, Some(-1))
                    .and_then(|p| p.get("title"))
                    .and_then(Value::as_str);
                match parent_title {
                    Some(t) => format!("Add to {t}"),
                    None => {
                        let keys = pointer::parse(full_pointer).unwrap_or_default();
                        let parent_key = keys.iter().rev().nth(1).filter(|k| *k != "-");
                        match parent_key {
                            Some(k) => format!("Add to {}", fix_title(k)),
                            None => "Add".to_string(),
                        }
                    }
                }
            }
        };
        node.recursive_reference = true;
        node.layout_ref = Some(data_ref.clone());
        node.set_option("removable", false);
        node.set_option("title", title);
        if let Some(max) = pointer::get_slice(&self.schema, &args.schema_pointer, 0, Some(-2))
            .and_then(|p| p.get("maxItems"))
            .filter(|m| m.is_number())
        {
            node.set_option("maxItems", max.clone());
        }

        if self.layout_ref_library.reserve(&data_ref) {
            let template = self
                .build_layout_from_schema(BuildArgs {
                    node_value: None,
                    schema_pointer: target,
                    data_pointer: String::new(),
                    array_item: node.array_item,
                    array_item_type: node.array_item_type,
                    removable: Some(true),
                    for_ref_library: true,
                    data_pointer_prefix: full_pointer.to_string(),
                })
                .map(|template| into_template(template, true));
            self.layout_ref_library.complete(&data_ref, template);
        } else if let Some(template) = self.layout_ref_library.get_mut(&data_ref) {
            template.recursive_reference = true;
        }
    }

    /// Materialise a `$ref` layout node.
    ///
    /// Without a value the library template is cloned with fresh ids. With
    /// a value the node is rebuilt from the schema so nested arrays match
    /// the data. Data pointers of the result are re-based from the
    /// template's position onto the data pointer of `reference`; recursive
    /// templates sit at the relative root `""`.
    pub fn get_layout_node(
        &mut self,
        reference: &LayoutNode,
        node_value: Option<&Value>,
    ) -> Result<LayoutNode> {
        let key = reference
            .layout_ref
            .as_deref()
            .ok_or_else(|| CompileError::malformed("get_layout_node", "node has no `$ref` key"))?;
        let template = self
            .layout_ref_library
            .get(key)
            .cloned()
            .ok_or_else(|| CompileError::miss(key))?;
        let instance = reference.data_pointer.clone().unwrap_or_default();
        let base = template.data_pointer.clone().unwrap_or_default();

        let mut node = match node_value {
            Some(value) => {
                let schema_pointer = self.template_schema_pointer(key)?;
                let args = BuildArgs {
                    node_value: Some(value.clone()),
                    schema_pointer,
                    data_pointer: base.clone(),
                    array_item: template.array_item,
                    array_item_type: template.array_item_type,
                    removable: template.option_bool("removable"),
                    for_ref_library: false,
                    data_pointer_prefix: if reference.recursive_reference {
                        instance.clone()
                    } else {
                        String::new()
                    },
                };
                let mut built = self
                    .build_layout_from_schema(args)
                    .ok_or_else(|| CompileError::miss(key))?;
                built.recursive_reference = template.recursive_reference;
                built
            }
            None => {
                let mut node = template;
                node.walk_mut(&mut |n| n.id = Some(self.next_id()));
                node
            }
        };
        if instance != base {
            node.walk_mut(&mut |n| {
                if let Some(pointer) = n.data_pointer.as_mut()
                    && is_sub_pointer(&base, pointer, true)
                {
                    *pointer = format!("{instance}{}", &pointer[base.len()..]);
                }
            });
        }
        Ok(node)
    }

    fn template_schema_pointer(&self, key: &str) -> Result<String> {
        let canonical =
            remove_recursive_references(key, &self.data_recursive_ref_map, &self.array_map);
        let schema_pointer = pointer::to_schema_pointer(&canonical, &self.schema)?;
        Ok(remove_recursive_references(
            &schema_pointer,
            &self.schema_recursive_ref_map,
            &ArrayMap::new(),
        ))
    }
}

/// Where an array node sits, in the three pointer spaces it needs.
pub(crate) struct ArrayAt<'a> {
    pub args: &'a BuildArgs,
    /// Canonical generic pointer, the key for maps and the library.
    pub short_pointer: &'a str,
    /// Absolute generic pointer of this instance.
    pub full_pointer: &'a str,
}

pub(crate) fn into_template(mut template: LayoutNode, recursive: bool) -> LayoutNode {
    template.walk_mut(&mut |n| n.id = None);
    template.recursive_reference = recursive;
    template
}

pub(crate) fn starts_with_add(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower == "add" || lower.starts_with("add ")
}

/// Property names in display order.
///
/// `ui:order` lists names first; a `*` entry stands for every property it
/// does not name, otherwise unnamed properties follow at the end.
fn property_order(schema: &Value) -> Vec<String> {
    let names: Vec<String> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    let Some(order) = schema.get("ui:order").and_then(Value::as_array) else {
        return names;
    };
    let order: Vec<String> = order
        .iter()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();
    let unnamed: Vec<String> = names
        .iter()
        .filter(|n| !order.contains(n))
        .cloned()
        .collect();
    let mut keys = Vec::with_capacity(names.len());
    let mut wildcard = false;
    for key in order {
        if key == "*" {
            wildcard = true;
            keys.extend(unnamed.iter().cloned());
        } else if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if !wildcard {
        keys.extend(unnamed);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FormOptions;
    use serde_json::json;

    fn context(schema: Value) -> CompilationContext {
        let mut ctx = CompilationContext::new(FormOptions::default());
        ctx.load_schema(&schema).unwrap();
        ctx
    }

    #[test]
    fn test_array_size_clamps() {
        let size = ArraySize::new(1, 3, 0, 1);
        assert_eq!((size.tuple_items, size.list_items), (0, 1));
        let size = ArraySize::new(0, 2, 3, 1);
        assert_eq!((size.tuple_items, size.list_items), (2, 0));
        let size = ArraySize::new(0, 3, 1, 5);
        assert_eq!((size.tuple_items, size.list_items), (1, 2));
        let size = ArraySize::new(4, 10, 1, 1);
        assert_eq!((size.tuple_items, size.list_items), (1, 3));
    }

    #[test]
    fn test_property_order() {
        let schema = json!({
            "properties": {"a": {}, "b": {}, "c": {}},
            "ui:order": ["c", "*", "a"]
        });
        assert_eq!(property_order(&schema), ["c", "b", "a"]);
        let schema = json!({"properties": {"a": {}, "b": {}}, "ui:order": ["b"]});
        assert_eq!(property_order(&schema), ["b", "a"]);
    }

    #[test]
    fn test_object_children_and_titles() {
        let mut ctx = context(json!({
            "type": "object",
            "required": ["firstName"],
            "properties": {
                "firstName": {"type": "string"},
                "age": {"type": "integer", "minimum": 0, "maximum": 150}
            }
        }));
        let root = ctx.build_layout_from_schema(BuildArgs::root(None)).unwrap();
        assert_eq!(root.node_type, "section");
        assert_eq!(root.items.len(), 2);
        let first = &root.items[0];
        assert_eq!(first.data_pointer.as_deref(), Some("/firstName"));
        assert_eq!(first.option_str("title"), Some("First Name"));
        assert!(first.required);
        assert_eq!(root.items[1].node_type, "range");
        assert!(ctx.fields_required);
        assert_eq!(
            ctx.data_map[""].required_properties.as_deref(),
            Some(&["firstName".to_string()][..])
        );
        assert_eq!(ctx.data_map["/age"].input_type.as_deref(), Some("range"));
    }

    #[test]
    fn test_tuple_array() {
        let mut ctx = context(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "number"}],
            "additionalItems": {"type": "boolean"},
            "minItems": 1
        }));
        let root = ctx.build_layout_from_schema(BuildArgs::root(None)).unwrap();
        let types: Vec<&str> = root.items.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(types, ["text", "number", "checkbox", "$ref"]);
        assert_eq!(root.items[0].option_bool("removable"), Some(false));
        assert_eq!(root.items[1].option_bool("removable"), Some(true));
        assert!(ctx.layout_ref_library.contains("/1"));
        assert!(ctx.layout_ref_library.contains("/-"));
        assert_eq!(ctx.array_map.get(""), Some(&2));
    }

    #[test]
    fn test_data_sizes_list() {
        let mut ctx = context(json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
        }));
        let value = json!({"tags": ["a", "b", "c"]});
        ctx.set_form_values(Some(value.clone()));
        let root = ctx
            .build_layout_from_schema(BuildArgs::root(Some(value)))
            .unwrap();
        let tags = &root.items[0];
        assert_eq!(tags.items.len(), 4);
        assert_eq!(tags.items[3].option_str("title"), Some("Add to Tags"));
        let ids: std::collections::BTreeSet<_> = tags.items.iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_get_layout_node_prefixes_recursive_templates() {
        let mut ctx = context(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "children": {"type": "array", "items": {"$ref": "#"}}
            }
        }));
        let root = ctx.build_layout_from_schema(BuildArgs::root(None)).unwrap();
        let children = &root.items[1];
        let add = children.items.last().unwrap().clone();
        assert_eq!(add.node_type, "$ref");
        assert!(add.recursive_reference);

        let item = ctx.get_layout_node(&add, None).unwrap();
        assert_eq!(item.data_pointer.as_deref(), Some("/children/-"));
        assert_eq!(item.items[0].data_pointer.as_deref(), Some("/children/-/name"));
        assert!(item.id.is_some());

        let nested = &item.items[1].items;
        let nested_add = nested.last().unwrap();
        let deeper = ctx.get_layout_node(nested_add, None).unwrap();
        assert_eq!(
            deeper.items[0].data_pointer.as_deref(),
            Some("/children/-/children/-/name")
        );
        assert_eq!(ctx.layout_ref_library.len(), 1);
    }

    #[test]
    fn test_get_layout_node_without_key() {
        let mut ctx = CompilationContext::default();
        let err = ctx.get_layout_node(&LayoutNode::default(), None).unwrap_err();
        assert_eq!(err.kind(), "malformed-argument");
    }
}

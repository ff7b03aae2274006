use serde_json::{Map, Value};

use super::LayoutNode;
use crate::{
    options::FormOptions,
    title_map::{build_title_map, title_map_from_one_of},
};

/// Widget types whose options carry a title map.
pub const CHOICE_TYPES: &[&str] = &[
    "select",
    "radios",
    "radios-inline",
    "radiobuttons",
    "checkboxes",
    "checkboxes-inline",
    "checkboxbuttons",
];

/// Schema keywords that never become widget options.
const SCHEMA_EXCLUDE: &[&str] = &[
    "type",
    "properties",
    "items",
    "additionalItems",
    "additionalProperties",
    "patternProperties",
    "allOf",
    "dependencies",
    "definitions",
    "$defs",
    "$schema",
    "$ref",
    "required",
    "x-schema-form",
];

/// Numeric validation codes and their named equivalents.
const VALIDATION_CODES: &[(&str, &str)] = &[
    ("0", "type"),
    ("1", "enum"),
    ("100", "multipleOf"),
    ("101", "minimum"),
    ("102", "exclusiveMinimum"),
    ("103", "maximum"),
    ("104", "exclusiveMaximum"),
    ("200", "minLength"),
    ("201", "maxLength"),
    ("202", "pattern"),
    ("300", "minProperties"),
    ("301", "maxProperties"),
    ("302", "required"),
    ("400", "minItems"),
    ("401", "maxItems"),
    ("402", "uniqueItems"),
    ("500", "format"),
];

/// Merge option sources into `node.options`, lowest precedence first:
/// form defaults, `ui:widget.options`, `ui:widget`, the schema's own
/// keywords, `x-schema-form.options`, `x-schema-form`, then whatever the
/// node already carries. `ui:` prefixes are dropped from keys.
///
/// Fills in a `titleMap` from `oneOf` or from array item schemas when no
/// explicit one exists, defaults `multipleOf` to 1 for integers, and
/// normalises `typeahead` sources.
pub fn update_input_options(node: &mut LayoutNode, schema: &Value, form_options: &FormOptions) {
    let mut merged = Map::new();
    merge_filtered(&mut merged, &form_options.default_widget_options, &[]);
    let sources: [(Option<&Value>, &[&str]); 5] = [
        (schema.get("ui:widget").and_then(|w| w.get("options")), &[]),
        (schema.get("ui:widget"), &[]),
        (Some(schema), SCHEMA_EXCLUDE),
        (schema.get("x-schema-form").and_then(|x| x.get("options")), &[]),
        (schema.get("x-schema-form"), &["items", "options"]),
    ];
    for (source, exclude) in sources {
        if let Some(Value::Object(source)) = source {
            merge_filtered(&mut merged, source, exclude);
        }
    }
    merge_filtered(&mut merged, &node.options, &[]);

    if !merged.contains_key("titleMap") {
        let flat_list = merged.get("flatList").and_then(Value::as_bool);
        if let Some(map) = title_map_from_one_of(schema, flat_list) {
            merged.insert("titleMap".into(), to_json(&map));
        } else if !merged.contains_key("enum")
            && let Some(items) = schema.get("items")
        {
            if let Some(map) = items.get("titleMap") {
                merged.insert("titleMap".into(), map.clone());
            } else if let Some(values) = items.get("enum") {
                merged.insert("enum".into(), values.clone());
                if !merged.contains_key("enumNames")
                    && let Some(names) = items.get("enumNames")
                {
                    merged.insert("enumNames".into(), names.clone());
                }
            } else if let Some(map) = title_map_from_one_of(items, flat_list) {
                merged.insert("titleMap".into(), to_json(&map));
            }
        }
    }

    if schema.get("type").and_then(Value::as_str) == Some("integer")
        && merged.get("multipleOf").is_none_or(Value::is_null)
    {
        merged.insert("multipleOf".into(), Value::from(1));
    }

    if let Some(source) = merged.get("autocomplete").filter(|a| a.get("source").is_some()) {
        let source = source.clone();
        merged.insert("typeahead".into(), source);
    } else if let Some(source) = merged.get("tagsinput").filter(|t| t.get("source").is_some()) {
        let source = source.clone();
        merged.insert("typeahead".into(), source);
    } else if let Some(source) = merged
        .get("tagsinput")
        .and_then(|t| t.get("typeahead"))
        .filter(|t| t.get("source").is_some())
    {
        let source = source.clone();
        merged.insert("typeahead".into(), source);
    }

    node.options = merged;
}

fn merge_filtered(target: &mut Map<String, Value>, source: &Map<String, Value>, exclude: &[&str]) {
    for (key, value) in source {
        if exclude.contains(&key.as_str()) {
            continue;
        }
        let key = match key.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("ui:") => &key[3..],
            _ => key.as_str(),
        };
        target.insert(key.to_string(), value.clone());
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Turn a property name into a display title.
///
/// `camelCase` and `snake_case` are split into words; every word is
/// capitalised except short connecting words after the first.
pub fn fix_title(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c == '_' || c == '-' {
            spaced.push(' ');
        } else {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                spaced.push(' ');
            }
            spaced.push(c);
        }
        prev = Some(c);
    }
    spaced
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && SMALL_WORDS.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "nor", "of", "on", "or", "the", "to",
    "with",
];

/// Move legacy and misplaced keys of explicit layout options into place.
///
/// `legend` becomes `title`, `errorMessages` becomes `validationMessages`,
/// and numeric validation codes are renamed. A `copyValueTo` string becomes
/// a one-element list.
pub fn normalize_layout_options(options: &mut Map<String, Value>) {
    if let Some(legend) = options.shift_remove("legend")
        && !options.contains_key("title")
    {
        options.insert("title".into(), legend);
    }
    if let Some(messages) = options.shift_remove("errorMessages")
        && !options.contains_key("validationMessages")
    {
        options.insert("validationMessages".into(), messages);
    }
    if let Some(message) = options.shift_remove("validationMessage") {
        match message {
            Value::String(_) => {
                options.insert("validationMessages".into(), message);
            }
            Value::Object(messages) => {
                let renamed = rename_validation_codes(messages);
                options.insert("validationMessages".into(), Value::Object(renamed));
            }
            _ => {}
        }
    }
    if let Some(Value::Object(messages)) = options.shift_remove("validationMessages") {
        options.insert(
            "validationMessages".into(),
            Value::Object(rename_validation_codes(messages)),
        );
    }
    if let Some(target) = options.get("copyValueTo").filter(|v| v.is_string()).cloned() {
        options.insert("copyValueTo".into(), Value::Array(vec![target]));
    }
}

fn rename_validation_codes(messages: Map<String, Value>) -> Map<String, Value> {
    messages
        .into_iter()
        .map(|(code, message)| {
            let name = VALIDATION_CODES
                .iter()
                .find(|(number, _)| *number == code)
                .map_or(code, |(_, name)| name.to_string());
            (name, message)
        })
        .collect()
}

/// Normalise the title map of choice widgets into `options.titleMap`.
pub fn apply_title_map(node: &mut LayoutNode) {
    if !CHOICE_TYPES.contains(&node.node_type.as_str()) {
        return;
    }
    let title_map = node
        .option("titleMap")
        .or_else(|| node.option("enumNames"))
        .cloned();
    let enum_list = node.option("enum").and_then(Value::as_array).cloned();
    let required = node.required || node.option_bool("required").unwrap_or(false);
    let flat_list = node.option_bool("flatList").unwrap_or(false);
    let map = build_title_map(title_map.as_ref(), enum_list.as_deref(), required, flat_list);
    node.set_option("titleMap", to_json(&map));
}

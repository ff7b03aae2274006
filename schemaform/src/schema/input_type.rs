use serde_json::{Map, Value};

use super::resolved_type;
use crate::{
    error::{CompileError, Result},
    pointer,
    title_map::has_title_map_from_one_of,
};

/// What a rule sees of the schema node being classified.
struct Probe<'a> {
    schema: &'a Value,
    layout: Option<&'a Map<String, Value>>,
    ty: Option<&'a str>,
}

impl Probe<'_> {
    fn has(&self, key: &str) -> bool {
        self.schema.get(key).is_some()
    }
}

struct InputTypeRule {
    name: &'static str,
    apply: fn(&Probe<'_>) -> Option<String>,
}

/// Rules in precedence order; the first to answer wins.
const RULES: &[InputTypeRule] = &[
    InputTypeRule { name: "widget", apply: widget_hint },
    InputTypeRule { name: "boolean", apply: boolean },
    InputTypeRule { name: "object", apply: object },
    InputTypeRule { name: "array", apply: array },
    InputTypeRule { name: "null", apply: null },
    InputTypeRule { name: "choice", apply: choice },
    InputTypeRule { name: "number", apply: number },
    InputTypeRule { name: "string", apply: string },
    InputTypeRule { name: "ref", apply: reference },
    InputTypeRule { name: "composition", apply: composition },
];

const WIDGET_HINTS: &[&str] = &[
    "/x-schema-form/type",
    "/x-schema-form/widget/component",
    "/x-schema-form/widget",
    "/widget/component",
    "/widget",
];

fn widget_hint(probe: &Probe<'_>) -> Option<String> {
    let hint = WIDGET_HINTS
        .iter()
        .filter_map(|p| pointer::get(probe.schema, *p))
        .find(|v| !v.is_null())?
        .as_str()?;
    Some(check_inline_type(hint, probe.schema, probe.layout))
}

fn boolean(probe: &Probe<'_>) -> Option<String> {
    (probe.ty == Some("boolean")).then(|| "checkbox".to_string())
}

fn object(probe: &Probe<'_>) -> Option<String> {
    if probe.ty != Some("object") {
        return None;
    }
    if probe.has("properties") || probe.has("additionalProperties") {
        Some("section".to_string())
    } else if probe.has("$ref") {
        Some("$ref".to_string())
    } else {
        None
    }
}

fn array(probe: &Probe<'_>) -> Option<String> {
    if probe.ty != Some("array") {
        return None;
    }
    let items_enum = ["/items/enum", "/additionalItems/enum"]
        .iter()
        .any(|p| pointer::get(probe.schema, *p).is_some_and(Value::is_array));
    let max_items = probe.schema.get("maxItems").and_then(Value::as_u64);
    if items_enum && max_items != Some(1) {
        Some(check_inline_type("checkboxes", probe.schema, probe.layout))
    } else {
        Some("array".to_string())
    }
}

fn null(probe: &Probe<'_>) -> Option<String> {
    (probe.ty == Some("null")).then(|| "none".to_string())
}

fn choice(probe: &Probe<'_>) -> Option<String> {
    probe.ty?;
    let layout_titles = probe.layout.is_some_and(|l| l.contains_key("titleMap"));
    (layout_titles || probe.has("enum") || has_title_map_from_one_of(probe.schema))
        .then(|| "select".to_string())
}

fn number(probe: &Probe<'_>) -> Option<String> {
    let ty = probe.ty?;
    if ty != "number" && ty != "integer" {
        return None;
    }
    let stepped = ty == "integer" || probe.has("multipleOf");
    let bounded = probe.has("maximum") && probe.has("minimum");
    Some(if stepped && bounded { "range" } else { ty }.to_string())
}

fn string(probe: &Probe<'_>) -> Option<String> {
    if probe.ty != Some("string") {
        return None;
    }
    let input = match probe.schema.get("format").and_then(Value::as_str) {
        Some("color") => "color",
        Some("date") => "date",
        Some("date-time") => "datetime-local",
        Some("email") => "email",
        Some("uri") => "url",
        _ => "text",
    };
    Some(input.to_string())
}

fn reference(probe: &Probe<'_>) -> Option<String> {
    probe.has("$ref").then(|| "$ref".to_string())
}

fn composition(probe: &Probe<'_>) -> Option<String> {
    let branches = probe
        .schema
        .get("oneOf")
        .or_else(|| probe.schema.get("anyOf"))?;
    branches.is_array().then(|| "one-of".to_string())
}

/// Pick the widget type for a schema node.
///
/// Explicit widget hints (`x-schema-form`, `widget`) come first, then the
/// schema type. `layout` carries options of an existing layout node, which
/// may supply a `titleMap` or `inline` flag. Fails with
/// [`CompileError::SchemaTypeIndeterminate`] when no rule applies.
pub fn get_input_type(schema: &Value, layout: Option<&Map<String, Value>>) -> Result<String> {
    let probe = Probe {
        schema,
        layout,
        ty: resolved_type(schema),
    };
    for rule in RULES {
        if let Some(input) = (rule.apply)(&probe) {
            trace!("get_input_type: rule `{}` -> {input}", rule.name);
            return Ok(input);
        }
    }
    Err(CompileError::SchemaTypeIndeterminate {
        schema_type: match schema.get("type") {
            Some(ty) => ty.to_string(),
            None => "none".to_string(),
        },
    })
}

const SCHEMA_INLINE: &[&str] = &[
    "/inline",
    "/x-schema-form/inline",
    "/x-schema-form/options/inline",
    "/x-schema-form/widget/inline",
    "/x-schema-form/widget/component/inline",
    "/x-schema-form/widget/component/options/inline",
    "/widget/inline",
    "/widget/component/inline",
    "/widget/component/options/inline",
];

/// Upgrade `radios` / `checkboxes` to their inline variants when the layout
/// node or schema asks for it; other types are returned unchanged.
pub fn check_inline_type(
    control_type: &str,
    schema: &Value,
    layout: Option<&Map<String, Value>>,
) -> String {
    if control_type != "radios" && control_type != "checkboxes" {
        return control_type.to_string();
    }
    let set = |v: &&Value| !v.is_null();
    let from_layout = layout.and_then(|l| {
        l.get("inline")
            .filter(set)
            .or_else(|| l.get("options").and_then(|o| o.get("inline")).filter(set))
    });
    let flag = from_layout
        .or_else(|| {
            SCHEMA_INLINE
                .iter()
                .find_map(|p| pointer::get(schema, *p).filter(set))
        })
        .is_some_and(truthy);
    if flag {
        format!("{control_type}-inline")
    } else {
        control_type.to_string()
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

//! Option lists for choice widgets.
//!
//! A title map is the list of `{name, value}` choices a select, radio or
//! checkbox widget offers. It can come from a layout `titleMap` (array or
//! object form), `enumNames`, a schema `enum`, or a `oneOf` whose branches
//! each carry a title and a single value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleMapItem {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl TitleMapItem {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            group: None,
        }
    }
}

/// A choice, or a named group of consecutive choices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TitleMapEntry {
    Item(TitleMapItem),
    Group {
        group: String,
        items: Vec<TitleMapItem>,
    },
}

/// Label used for the empty choice of optional fields.
pub const EMPTY_CHOICE: &str = "None";

/// Build the choice list for a widget.
///
/// `title_map` may be an array of `{name, value, group}` objects, an array
/// of labels matched to `enum_list` by position (`enumNames` style), or an
/// object mapping values to labels. With an `enum_list`, only its values are
/// offered, in its order for the object form. Without either input the list
/// is `True` / `False`. Unless `field_required` is set, an empty choice is
/// prepended when none exists. With `flat_list`, groups are flattened to
/// `"Group: name"` labels; otherwise consecutive items of one group are
/// collected under a [`TitleMapEntry::Group`].
pub fn build_title_map(
    title_map: Option<&Value>,
    enum_list: Option<&[Value]>,
    field_required: bool,
    flat_list: bool,
) -> Vec<TitleMapEntry> {
    let mut items: Vec<RawEntry> = match (title_map, enum_list) {
        (Some(Value::Array(map)), Some(enums)) => map
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry {
                Value::Object(object) => {
                    let value = object.get("value").cloned().unwrap_or(Value::Null);
                    enums.contains(&value).then(|| {
                        RawEntry::item(
                            object.get("name").map(label).unwrap_or_else(|| label(&value)),
                            value,
                        )
                    })
                }
                Value::String(name) => enums.get(i).map(|v| RawEntry::item(name.clone(), v.clone())),
                _ => None,
            })
            .collect(),
        (Some(Value::Array(map)), None) => map.iter().filter_map(RawEntry::from_value).collect(),
        (Some(Value::Object(map)), Some(enums)) => enums
            .iter()
            .filter_map(|value| {
                map.get(&value_key(value))
                    .map(|name| RawEntry::item(label(name), value.clone()))
            })
            .collect(),
        (Some(Value::Object(map)), None) => map
            .iter()
            .map(|(value, name)| RawEntry::item(label(name), Value::String(value.clone())))
            .collect(),
        (_, Some(enums)) => enums
            .iter()
            .map(|value| RawEntry::item(label(value), value.clone()))
            .collect(),
        (_, None) => vec![
            RawEntry::item("True", Value::Bool(true)),
            RawEntry::item("False", Value::Bool(false)),
        ],
    };

    let has_empty = items
        .iter()
        .any(|e| e.value.as_ref().is_some_and(Value::is_null));

    if !flat_list && !items.iter().any(|e| e.group.is_some()) {
        split_group_labels(&mut items);
    }

    let mut entries = if flat_list {
        flatten(items)
    } else {
        group(items)
    };
    if !field_required && !has_empty {
        entries.insert(
            0,
            TitleMapEntry::Item(TitleMapItem::new(EMPTY_CHOICE, Value::Null)),
        );
    }
    entries
}

/// Title map taken from a `oneOf` (or `anyOf`) list.
///
/// Every branch must have a `title` and either a one-value `enum` or a
/// `const`; otherwise there is no title map. Titles written as
/// `"Group: Label"` are split into groups when grouping is requested, or when
/// neighbouring branches share a group and `flat_list` is not `Some(true)`.
pub fn title_map_from_one_of(schema: &Value, flat_list: Option<bool>) -> Option<Vec<TitleMapItem>> {
    let branches = schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))?
        .as_array()?;
    if branches.is_empty() {
        return None;
    }
    let titles = branches
        .iter()
        .map(|b| b.get("title").and_then(Value::as_str))
        .collect::<Option<Vec<_>>>()?;
    let single_enum = |b: &Value| {
        b.get("enum")
            .and_then(Value::as_array)
            .filter(|e| e.len() == 1)
            .map(|e| e[0].clone())
    };
    let values = branches
        .iter()
        .map(single_enum)
        .collect::<Option<Vec<_>>>()
        .or_else(|| branches.iter().map(|b| b.get("const").cloned()).collect())?;

    let mut items: Vec<TitleMapItem> = titles
        .into_iter()
        .zip(values)
        .map(|(title, value)| TitleMapItem::new(title, value))
        .collect();

    if flat_list == Some(true) {
        return Some(items);
    }
    let split: Vec<TitleMapItem> = items
        .iter()
        .map(|item| match item.name.split_once(": ") {
            Some((group, name)) if !group.is_empty() => TitleMapItem {
                name: name.to_string(),
                value: item.value.clone(),
                group: Some(group.to_string()),
            },
            _ => item.clone(),
        })
        .collect();
    let grouped = split.iter().filter(|i| i.group.is_some()).count() > 1
        && split
            .windows(2)
            .any(|w| w[0].group.is_some() && w[0].group == w[1].group);
    if flat_list == Some(false) || grouped {
        items = split;
    }
    Some(items)
}

/// Whether `schema` has a `oneOf` usable as a title map.
pub fn has_title_map_from_one_of(schema: &Value) -> bool {
    title_map_from_one_of(schema, Some(true)).is_some()
}

#[derive(Debug, Clone)]
struct RawEntry {
    name: Option<String>,
    value: Option<Value>,
    group: Option<String>,
    items: Option<Vec<TitleMapItem>>,
}

impl RawEntry {
    fn item(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
            group: None,
            items: None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::item(s.clone(), value.clone())),
            Value::Object(object) => Some(Self {
                name: object.get("name").map(label),
                value: object.get("value").cloned(),
                group: object.get("group").and_then(Value::as_str).map(str::to_string),
                items: object
                    .get("items")
                    .and_then(|i| serde_json::from_value(i.clone()).ok()),
            }),
            _ => None,
        }
    }

    fn into_item(self) -> TitleMapItem {
        let value = self.value.unwrap_or(Value::Null);
        TitleMapItem {
            name: self.name.unwrap_or_else(|| label(&value)),
            value,
            group: self.group,
        }
    }
}

/// Split `"Group: Label"` names when neighbours share a group.
fn split_group_labels(items: &mut [RawEntry]) {
    let groups: Vec<Option<String>> = items
        .iter()
        .map(|e| {
            e.name
                .as_deref()
                .and_then(|n| n.split_once(": "))
                .filter(|(g, _)| !g.is_empty())
                .map(|(g, _)| g.to_string())
        })
        .collect();
    let shared = groups
        .windows(2)
        .any(|w| w[0].is_some() && w[0] == w[1]);
    if !shared {
        return;
    }
    for (entry, group) in items.iter_mut().zip(groups) {
        if let (Some(group), Some(name)) = (group, entry.name.as_mut()) {
            *name = name[group.len() + 2..].to_string();
            entry.group = Some(group);
        }
    }
}

fn flatten(items: Vec<RawEntry>) -> Vec<TitleMapEntry> {
    let mut out = Vec::new();
    for entry in items {
        match (entry.group.clone(), entry.items.clone()) {
            (Some(group), Some(children)) => {
                out.extend(children.into_iter().map(|child| {
                    TitleMapEntry::Item(TitleMapItem {
                        name: format!("{group}: {}", child.name),
                        value: child.value,
                        group: None,
                    })
                }));
            }
            (Some(group), None) => {
                let mut item = entry.into_item();
                item.name = format!("{group}: {}", item.name);
                item.group = None;
                out.push(TitleMapEntry::Item(item));
            }
            _ => out.push(TitleMapEntry::Item(entry.into_item())),
        }
    }
    out
}

fn group(items: Vec<RawEntry>) -> Vec<TitleMapEntry> {
    let mut out: Vec<TitleMapEntry> = Vec::new();
    for entry in items {
        let Some(group) = entry.group.clone() else {
            out.push(TitleMapEntry::Item(entry.into_item()));
            continue;
        };
        let children = match entry.items.clone() {
            Some(children) => children,
            None => {
                let mut item = entry.into_item();
                item.group = None;
                vec![item]
            }
        };
        match out.last_mut() {
            Some(TitleMapEntry::Group { group: last, items }) if *last == group => {
                items.extend(children);
            }
            _ => out.push(TitleMapEntry::Group {
                group,
                items: children,
            }),
        }
    }
    out
}

/// Display text for a value.
fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Object-form title map key for an enum value.
fn value_key(value: &Value) -> String {
    label(value)
}

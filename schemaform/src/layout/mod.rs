//! Layout compiler.
//!
//! Produces the tree of [`LayoutNode`]s a renderer walks to draw a form,
//! either from an explicit layout description ([`build`]) or straight from
//! the compiled schema ([`from_schema`]). Array items and recursive
//! sub-forms are instantiated from templates kept in a
//! [`LayoutRefLibrary`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub mod build;
pub mod from_schema;
pub mod map;
pub mod options;

pub use from_schema::BuildArgs;
pub use map::{LayoutEntry, map_layout};
pub use options::{fix_title, update_input_options};

/// Whether an array item sits in the fixed tuple prefix or the open list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayItemType {
    Tuple,
    List,
}

/// One node of the compiled layout tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    /// Unique within one compilation; `None` on library templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Widget type.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LayoutNode>,
    pub array_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_item_type: Option<ArrayItemType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recursive_reference: bool,
    /// Layout library key this node is instantiated from.
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub layout_ref: Option<String>,
}

impl LayoutNode {
    /// A `$ref` node pointing at library template `key`.
    pub fn reference(key: &str, data_pointer: String, recursive: bool) -> Self {
        Self {
            node_type: "$ref".to_string(),
            data_pointer: Some(data_pointer),
            recursive_reference: recursive,
            layout_ref: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key).filter(|v| !v.is_null())
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.option(key).and_then(Value::as_bool)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }

    pub fn option_usize(&self, key: &str) -> Option<usize> {
        self.option(key)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<Value>) {
        self.options.insert(key.to_string(), value.into());
    }

    /// Apply `f` to this node and every descendant, parents first.
    pub fn walk_mut<F: FnMut(&mut LayoutNode)>(&mut self, f: &mut F) {
        f(self);
        for item in &mut self.items {
            item.walk_mut(f);
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<F: FnMut(&LayoutNode)>(&self, f: &mut F) {
        f(self);
        for item in &self.items {
            item.walk(f);
        }
    }
}

/// Templates for array items and recursive references, keyed by generic
/// data pointer.
///
/// A key is reserved before its template is built so a reference met while
/// building it sees the key as taken; this is what keeps recursive schemas
/// from expanding forever.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutRefLibrary {
    templates: BTreeMap<String, LayoutNode>,
    pending: BTreeSet<String>,
}

impl LayoutRefLibrary {
    /// Whether `key` has a template or is being built.
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key) || self.pending.contains(key)
    }

    /// Mark `key` as being built. Returns `false` if it was already taken.
    pub fn reserve(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.pending.insert(key.to_string())
    }

    /// Finish a reservation, storing `template` if one was built.
    pub fn complete(&mut self, key: &str, template: Option<LayoutNode>) {
        self.pending.remove(key);
        if let Some(template) = template {
            self.templates.insert(key.to_string(), template);
        }
    }

    pub fn insert(&mut self, key: &str, template: LayoutNode) {
        self.pending.remove(key);
        self.templates.insert(key.to_string(), template);
    }

    pub fn get(&self, key: &str) -> Option<&LayoutNode> {
        self.templates.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut LayoutNode> {
        self.templates.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LayoutNode)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for LayoutRefLibrary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.templates.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_reservation() {
        let mut library = LayoutRefLibrary::default();
        assert!(library.reserve("/a/-"));
        assert!(library.contains("/a/-"));
        assert!(!library.reserve("/a/-"));
        assert!(library.is_empty());
        library.complete("/a/-", Some(LayoutNode::default()));
        assert_eq!(library.len(), 1);
        library.reserve("/b");
        library.complete("/b", None);
        assert!(!library.contains("/b"));
    }

    #[test]
    fn test_node_serialization() {
        let mut node = LayoutNode::reference("/tags/-", "/tags/-".to_string(), false);
        node.set_option("title", "Add tag");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], json!("$ref"));
        assert_eq!(value["$ref"], json!("/tags/-"));
        assert_eq!(value["dataPointer"], json!("/tags/-"));
        assert!(value.get("items").is_none());
        assert!(value.get("recursiveReference").is_none());
    }

    #[test]
    fn test_walk_mut_reaches_descendants() {
        let mut root = LayoutNode {
            items: vec![LayoutNode {
                items: vec![LayoutNode::default()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut next = 0;
        root.walk_mut(&mut |n| {
            next += 1;
            n.id = Some(next);
        });
        assert_eq!(root.items[0].items[0].id, Some(3));
    }
}

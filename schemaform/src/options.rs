//! Form-level configuration.
//!
//! Options are plain serde data so they can be read from TOML or JSON, and
//! derive `JsonSchema` so a form can be compiled for them too.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// When schema `default` keywords seed node values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDefaults {
    /// Only when no data was supplied.
    #[default]
    Auto,
    /// Always, for every node without a value.
    Always,
    /// Never.
    Never,
}

/// Options applied to one compilation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Append a `submit` node when the layout has none.
    pub add_submit: bool,
    /// When to use schema defaults as node values.
    pub set_schema_defaults: SchemaDefaults,
    /// Options merged first into every layout node.
    pub default_widget_options: Map<String, Value>,
    /// Upper bound used for arrays without `maxItems`.
    pub max_items_cap: usize,
}

impl Default for FormOptions {
    fn default() -> Self {
        let defaults = json!({
            "addable": true,
            "orderable": true,
            "removable": true,
            "listItems": 1,
        });
        Self {
            add_submit: false,
            set_schema_defaults: SchemaDefaults::Auto,
            default_widget_options: defaults.as_object().cloned().unwrap_or_default(),
            max_items_cap: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_partial_toml() {
        let opts: FormOptions = toml::from_str(
            r#"
            addSubmit = true
            setSchemaDefaults = "never"
            "#,
        )
        .unwrap();
        assert!(opts.add_submit);
        assert_eq!(opts.set_schema_defaults, SchemaDefaults::Never);
        assert_eq!(opts.max_items_cap, 1000);
        assert_eq!(opts.default_widget_options.get("listItems"), Some(&json!(1)));
    }
}

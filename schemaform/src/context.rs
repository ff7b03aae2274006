//! Per-compilation state.
//!
//! A [`CompilationContext`] owns every map and library built while compiling
//! one schema: it is created for a form, filled by one pass, read by the
//! renderer, and dropped with the form. Two forms never share one.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{Diagnostics, Result},
    layout::LayoutRefLibrary,
    options::{FormOptions, SchemaDefaults},
    schema::resolve::{ResolvedSchema, resolve_schema_references},
};

/// Generic array data pointer → number of tuple (fixed-position) items.
pub type ArrayMap = BTreeMap<String, usize>;

/// Recursive pointer → canonical shallower pointer.
pub type RecursiveRefMap = BTreeMap<String, String>;

/// Schema pointer → resolved copy of the referenced subschema.
pub type SchemaRefLibrary = BTreeMap<String, Value>;

/// Generic data pointer → per-field metadata.
pub type DataMap = BTreeMap<String, DataMapEntry>;

/// Metadata recorded for one data location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    pub required: bool,
    /// `required` list of an object schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_properties: Option<Vec<String>>,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuple_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_items: Option<usize>,
}

/// All state of one compilation pass.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    pub options: FormOptions,
    /// Compiled schema: non-recursive `$ref`s inlined, recursive ones
    /// pointing at their canonical location.
    pub schema: Value,
    pub schema_ref_library: SchemaRefLibrary,
    pub schema_recursive_ref_map: RecursiveRefMap,
    pub data_recursive_ref_map: RecursiveRefMap,
    pub array_map: ArrayMap,
    pub data_map: DataMap,
    pub layout_ref_library: LayoutRefLibrary,
    /// Current data snapshot, if any.
    pub form_values: Option<Value>,
    /// Set when any compiled field is required.
    pub fields_required: bool,
    pub diagnostics: Diagnostics,
    next_id: u64,
}

impl CompilationContext {
    pub fn new(options: FormOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Resolve `schema` and install the compiled schema and its maps.
    ///
    /// Replaces any previous schema state; layout state is reset as well.
    pub fn load_schema(&mut self, schema: &Value) -> Result<()> {
        let ResolvedSchema {
            compiled,
            schema_ref_library,
            schema_recursive_ref_map,
            data_recursive_ref_map,
            array_map,
        } = resolve_schema_references(schema, &mut self.diagnostics)?;
        debug!(
            "schema resolved: {} library refs, {} recursive refs, {} arrays",
            schema_ref_library.len(),
            schema_recursive_ref_map.len(),
            array_map.len()
        );
        self.schema = compiled;
        self.schema_ref_library = schema_ref_library;
        self.schema_recursive_ref_map = schema_recursive_ref_map;
        self.data_recursive_ref_map = data_recursive_ref_map;
        self.array_map = array_map;
        self.data_map.clear();
        self.layout_ref_library = LayoutRefLibrary::default();
        self.fields_required = false;
        Ok(())
    }

    /// Replace the data snapshot used to size arrays.
    pub fn set_form_values(&mut self, values: Option<Value>) {
        self.form_values = values;
    }

    /// Fresh layout node id.
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Data map entry for `pointer`, created on first use.
    pub fn data_map_entry(&mut self, pointer: &str) -> &mut DataMapEntry {
        self.data_map.entry(pointer.to_string()).or_default()
    }

    pub(crate) fn use_schema_defaults(&self) -> bool {
        match self.options.set_schema_defaults {
            SchemaDefaults::Always => true,
            SchemaDefaults::Never => false,
            SchemaDefaults::Auto => self.form_values.as_ref().is_none_or(is_empty_value),
        }
    }

    /// Unwrap `result`, reporting failures to the diagnostics channel.
    pub(crate) fn recover<T>(&mut self, source: &'static str, result: Result<T>, default: T) -> T {
        self.diagnostics.recover(source, result, default)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

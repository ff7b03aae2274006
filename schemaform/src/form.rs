//! Top-level entry points.
//!
//! [`compile`] runs one full pass (schema resolution, then layout
//! compilation) and hands back a [`CompiledForm`] holding the layout tree
//! together with the context a renderer needs to expand it later.
//! [`FormSource`] loads the three inputs from disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{
    context::{ArrayMap, CompilationContext, DataMap, RecursiveRefMap, SchemaRefLibrary},
    error::{CompileError, Diagnostics, Result},
    layout::{LayoutNode, LayoutRefLibrary},
    options::FormOptions,
};

/// Result of one compilation pass.
#[derive(Debug, Clone)]
pub struct CompiledForm {
    pub layout: Vec<LayoutNode>,
    pub context: CompilationContext,
}

impl CompiledForm {
    /// Materialise a `$ref` node of the tree, see
    /// [`CompilationContext::get_layout_node`].
    pub fn get_layout_node(&mut self, reference: &LayoutNode, value: Option<&Value>) -> Result<LayoutNode> {
        self.context.get_layout_node(reference, value)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.context.diagnostics
    }

    /// Everything a renderer consumes, as one JSON document.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormView<'a> {
    layout_tree: &'a [LayoutNode],
    data_map: &'a DataMap,
    array_map: &'a ArrayMap,
    schema_ref_library: &'a SchemaRefLibrary,
    schema_recursive_ref_map: &'a RecursiveRefMap,
    data_recursive_ref_map: &'a RecursiveRefMap,
    layout_ref_library: &'a LayoutRefLibrary,
    fields_required: bool,
    diagnostics: &'a Diagnostics,
}

impl Serialize for CompiledForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ctx = &self.context;
        FormView {
            layout_tree: &self.layout,
            data_map: &ctx.data_map,
            array_map: &ctx.array_map,
            schema_ref_library: &ctx.schema_ref_library,
            schema_recursive_ref_map: &ctx.schema_recursive_ref_map,
            data_recursive_ref_map: &ctx.data_recursive_ref_map,
            layout_ref_library: &ctx.layout_ref_library,
            fields_required: ctx.fields_required,
            diagnostics: &ctx.diagnostics,
        }
        .serialize(serializer)
    }
}

/// Compile `schema` with an optional explicit layout and current data.
///
/// Fails only when the schema itself cannot be resolved; everything else
/// lands in the form's diagnostics.
pub fn compile(
    schema: &Value,
    layout: Option<&Value>,
    data: Option<&Value>,
    options: FormOptions,
) -> Result<CompiledForm> {
    let mut context = CompilationContext::new(options);
    context.load_schema(schema)?;
    context.set_form_values(data.cloned());
    let layout = context.build_layout(layout);
    if !context.diagnostics.is_empty() {
        debug!("compiled with {} diagnostics", context.diagnostics.len());
    }
    Ok(CompiledForm { layout, context })
}

/// Compile the form for a Rust type through its generated JSON Schema.
pub fn compile_for<C: JsonSchema>(
    layout: Option<&Value>,
    data: Option<&Value>,
    options: FormOptions,
) -> Result<CompiledForm> {
    let schema = schemars::schema_for!(C).to_value();
    compile(&schema, layout, data, options)
}

/// Schema, layout and data loaded from files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSource {
    pub schema: Value,
    pub layout: Option<Value>,
    pub data: Option<Value>,
}

impl FormSource {
    /// Read the schema and, when given, the layout and data files.
    ///
    /// An empty data file counts as no data.
    pub fn load(
        schema: impl AsRef<Path>,
        layout: Option<&Path>,
        data: Option<&Path>,
    ) -> Result<Self> {
        let schema = read_value(schema.as_ref())?.ok_or_else(|| CompileError::Parse {
            path: schema.as_ref().display().to_string(),
            reason: "schema file is empty".to_string(),
        })?;
        let layout = layout.map(read_value).transpose()?.flatten();
        let data = data.map(read_value).transpose()?.flatten();
        Ok(Self {
            schema,
            layout,
            data,
        })
    }

    pub fn compile(&self, options: FormOptions) -> Result<CompiledForm> {
        compile(&self.schema, self.layout.as_ref(), self.data.as_ref(), options)
    }
}

/// Read a JSON or TOML document, chosen by file extension.
///
/// Files without an extension are read as JSON. Returns `None` for a file
/// holding only whitespace.
pub fn read_value(path: &Path) -> Result<Option<Value>> {
    let content = fs::read_to_string(path).map_err(|e| CompileError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let parse_err = |reason: String| CompileError::Parse {
        path: path.display().to_string(),
        reason,
    };
    let value = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => {
            let v: toml::Value = toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            serde_json::to_value(v).map_err(|e| parse_err(e.to_string()))?
        }
        Some("json") | None => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some(other) => return Err(parse_err(format!("unsupported file extension `{other}`"))),
    };
    trace!("loaded {}", path.display());
    Ok(Some(value))
}

/// Default layout path next to a schema: `form-schema.json` pairs with
/// `form-layout.json`.
pub fn default_layout_path(schema: &Path) -> PathBuf {
    let stem = schema
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = stem.strip_suffix("-schema").unwrap_or(&stem);
    let name = format!("{base}-layout.json");
    match schema.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("schemaform-form-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_compile_to_json() {
        let schema = json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
        });
        let form = compile(&schema, None, Some(&json!({"tags": ["a", "b"]})), FormOptions::default())
            .unwrap();
        let out = form.to_json().unwrap();
        assert_eq!(out["layoutTree"][0]["type"], json!("section"));
        assert_eq!(out["arrayMap"]["/tags"], json!(0));
        assert!(out["layoutRefLibrary"].get("/tags/-").is_some());
        assert_eq!(out["dataMap"]["/tags"]["schemaPointer"], json!("/properties/tags"));
        assert_eq!(out["diagnostics"], json!([]));
    }

    #[test]
    fn test_compile_for_type() {
        let form = compile_for::<FormOptions>(None, None, FormOptions::default()).unwrap();
        let root = &form.layout[0];
        let find = |pointer: &str| {
            root.items
                .iter()
                .find(|n| n.data_pointer.as_deref() == Some(pointer))
                .map(|n| n.node_type.clone())
        };
        assert_eq!(find("/addSubmit").as_deref(), Some("checkbox"));
        assert_eq!(find("/maxItemsCap").as_deref(), Some("integer"));
    }

    #[test]
    fn test_source_load_json_and_toml() {
        let schema = temp_file(
            "profile-schema.json",
            r#"{"type": "object", "properties": {"name": {"type": "string"}}}"#,
        );
        let data = temp_file("profile.toml", "name = \"Ada\"\n");
        let empty = temp_file("empty.json", "  \n");
        let source = FormSource::load(&schema, None, Some(&data)).unwrap();
        assert_eq!(source.data, Some(json!({"name": "Ada"})));
        let source = FormSource::load(&schema, None, Some(&empty)).unwrap();
        assert_eq!(source.data, None);
        let form = source.compile(FormOptions::default()).unwrap();
        assert_eq!(form.layout[0].items[0].data_pointer.as_deref(), Some("/name"));
    }

    #[test]
    fn test_read_value_errors() {
        let missing = std::env::temp_dir().join("schemaform-does-not-exist.json");
        assert!(matches!(read_value(&missing), Err(CompileError::Io { .. })));
        let bad = temp_file("bad.json", "{");
        assert!(matches!(read_value(&bad), Err(CompileError::Parse { .. })));
        let yaml = temp_file("data.yaml", "a: 1");
        assert!(matches!(read_value(&yaml), Err(CompileError::Parse { .. })));
    }

    #[test]
    fn test_default_layout_path() {
        assert_eq!(
            default_layout_path(Path::new("forms/profile-schema.json")),
            PathBuf::from("forms/profile-layout.json")
        );
        assert_eq!(
            default_layout_path(Path::new("profile.json")),
            PathBuf::from("profile-layout.json")
        );
    }
}

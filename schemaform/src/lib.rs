//! # schemaform
//!
//! Schema resolution and layout compilation for schema-driven forms.
//!
//! `schemaform` takes a JSON Schema (with arbitrary `$ref` graphs,
//! `allOf` composition and self-recursive types), an optional explicit
//! layout and the current data, and compiles them into a finite layout
//! tree a renderer can walk to draw controls.
//!
//! ## Features
//!
//! - JSON Pointer algebra: parsing, escaping, generic (`-`) array pointers,
//!   schema / data / control pointer translation
//! - Cycle-safe `$ref` resolution with recursive reference maps
//! - Layout compilation from explicit layouts or straight from the schema
//! - Recursive sub-forms built once and expanded on demand
//! - Title maps for choice widgets from `enum`, `oneOf` or explicit maps
//! - Schema and data from JSON or TOML files
//!
//! ## Quick Start
//!
//! ```rust
//! use schemaform::{FormOptions, compile};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string"}}
//! });
//! let form = compile(&schema, None, None, FormOptions::default()).unwrap();
//! assert_eq!(form.layout[0].items[0].data_pointer.as_deref(), Some("/name"));
//! ```
//!
//! ## Modules
//!
//! - [`pointer`] - JSON Pointer library
//! - [`schema`] - schema compiler
//! - [`layout`] - layout compiler
//! - [`title_map`] - title map normalisation
//! - [`context`] - per-compilation state
//! - [`form`] - entry points and file loading

#[macro_use]
extern crate log;

/// Per-compilation state: data map, array map, reference maps.
pub mod context;

pub mod error;

/// Top-level compile entry points and form source loading.
pub mod form;

/// Layout compiler.
pub mod layout;

pub mod options;

/// JSON Pointer library.
pub mod pointer;

/// Schema compiler.
pub mod schema;

pub mod title_map;

pub use context::CompilationContext;
pub use error::{CompileError, Diagnostic, Diagnostics, Result};
pub use form::{CompiledForm, FormSource, compile, compile_for};
pub use layout::{LayoutNode, LayoutRefLibrary};
pub use options::{FormOptions, SchemaDefaults};
pub use pointer::Pointer;
pub use serde_json::Value;

//! # schemaform-cli
//!
//! Command line front end for [`schemaform`].
//!
//! Reads a schema, an optional layout and optional data from JSON or TOML
//! files, compiles them and prints the result as JSON. Defaults come from a
//! `.schemaform.toml` file in the workspace.
//!
//! ## Modules
//!
//! - [`config`] - `.schemaform.toml` configuration
//! - [`ctx`] - workspace and configuration state
//! - [`utils`] - placeholder expansion and output helpers

#[macro_use]
extern crate log;

#[macro_use]
extern crate anyhow;

pub mod config;

/// Application context.
pub mod ctx;

pub mod utils;

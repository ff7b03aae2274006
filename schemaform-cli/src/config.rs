//! Configuration file support.
//!
//! `.schemaform.toml` names the input files and carries the
//! [`FormOptions`] used for every compilation:
//!
//! ```toml
//! schema = "${workspaceFolder}/forms/user-schema.json"
//! data = "${env:FORM_DATA}"
//!
//! [options]
//! addSubmit = true
//! setSchemaDefaults = "never"
//! ```

use std::path::Path;

use anyhow::Context;
use schemaform::FormOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default configuration file name, looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = ".schemaform.toml";

/// Contents of `.schemaform.toml`.
///
/// Paths may use `${workspaceFolder}` and `${env:VAR}` placeholders and are
/// resolved relative to the workspace.
#[derive(Default, Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// JSON Schema file.
    pub schema: Option<String>,
    /// Explicit layout file. Defaults to `<name>-layout.json` next to a
    /// `<name>-schema.json` schema when that file exists.
    pub layout: Option<String>,
    /// Current form data.
    pub data: Option<String>,
    /// Compilation options.
    pub options: FormOptions,
}

impl CliConfig {
    /// Parse a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// JSON Schema describing the configuration file, for editor support.
    pub fn json_schema() -> serde_json::Value {
        schemars::schema_for!(CliConfig).to_value()
    }
}

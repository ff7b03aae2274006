use std::path::{Path, PathBuf};

use schemaform::{CompiledForm, FormOptions, FormSource, form::default_layout_path};

use crate::{
    config::{CONFIG_FILE_NAME, CliConfig},
    utils::replace_env_placeholders,
};

/// Input files given on the command line. Each overrides the matching
/// configuration entry.
#[derive(Default, Clone, Debug)]
pub struct SourcePaths {
    pub schema: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub data: Option<PathBuf>,
}

/// Workspace and configuration shared by every subcommand.
#[derive(Default, Clone, Debug)]
pub struct AppContext {
    /// Root that relative paths and `${workspaceFolder}` resolve against.
    pub workspace: PathBuf,
    pub config: CliConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            ..Default::default()
        }
    }

    /// Load the configuration file.
    ///
    /// Without an explicit path `.schemaform.toml` in the workspace is used
    /// when present; a missing explicit file is an error.
    pub fn load_config(&mut self, path: Option<PathBuf>) -> anyhow::Result<()> {
        let (path, explicit) = match path {
            Some(path) => (self.resolve_path(&path.to_string_lossy())?, true),
            None => (self.workspace.join(CONFIG_FILE_NAME), false),
        };
        if !path.exists() {
            if explicit {
                bail!("configuration file {} does not exist", path.display());
            }
            debug!("no {CONFIG_FILE_NAME} in {}", self.workspace.display());
            return Ok(());
        }
        self.config = CliConfig::load(&path)?;
        self.config_path = Some(path);
        Ok(())
    }

    /// Replace `${workspaceFolder}` with the workspace path.
    pub fn value_replace_with_var(&self, value: &str) -> String {
        value.replace(
            "${workspaceFolder}",
            &format!("{}", self.workspace.display()),
        )
    }

    /// Expand placeholders in `raw` and anchor a relative result at the
    /// workspace.
    pub fn resolve_path(&self, raw: &str) -> anyhow::Result<PathBuf> {
        let expanded = replace_env_placeholders(&self.value_replace_with_var(raw))?;
        if expanded.trim().is_empty() {
            bail!("path `{raw}` expands to an empty string");
        }
        let path = PathBuf::from(expanded);
        Ok(if path.is_relative() {
            self.workspace.join(path)
        } else {
            path
        })
    }

    fn pick(&self, cli: Option<&Path>, configured: Option<&str>) -> anyhow::Result<Option<PathBuf>> {
        match (cli, configured) {
            (Some(path), _) => self.resolve_path(&path.to_string_lossy()).map(Some),
            (None, Some(raw)) => self.resolve_path(raw).map(Some),
            (None, None) => Ok(None),
        }
    }

    /// Load schema, layout and data, command line paths first.
    pub fn form_source(&self, paths: &SourcePaths) -> anyhow::Result<FormSource> {
        let schema = self
            .pick(paths.schema.as_deref(), self.config.schema.as_deref())?
            .ok_or_else(|| {
                anyhow!("no schema given: pass --schema or set `schema` in {CONFIG_FILE_NAME}")
            })?;
        let layout = match self.pick(paths.layout.as_deref(), self.config.layout.as_deref())? {
            Some(layout) => Some(layout),
            None => Some(default_layout_path(&schema)).filter(|p| p.exists()),
        };
        let data = self.pick(paths.data.as_deref(), self.config.data.as_deref())?;

        info!("schema: {}", schema.display());
        if let Some(layout) = &layout {
            info!("layout: {}", layout.display());
        }
        if let Some(data) = &data {
            info!("data: {}", data.display());
        }
        Ok(FormSource::load(&schema, layout.as_deref(), data.as_deref())?)
    }

    pub fn options(&self) -> FormOptions {
        self.config.options.clone()
    }

    pub fn compile(&self, paths: &SourcePaths, options: FormOptions) -> anyhow::Result<CompiledForm> {
        Ok(self.form_source(paths)?.compile(options)?)
    }
}

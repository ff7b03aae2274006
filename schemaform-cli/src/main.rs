use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use schemaform::{CompilationContext, LayoutNode, SchemaDefaults, pointer};
use schemaform_cli::{
    config::CliConfig,
    ctx::{AppContext, SourcePaths},
    utils::print_diagnostics,
};
use serde_json::{Value, json};

/// Compile JSON Schema forms into layout trees.
#[derive(Parser)]
#[command(name = "schemaform", version, about, long_about = None)]
struct Cli {
    /// Workspace directory, defaults to the current directory.
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Configuration file, defaults to `<workspace>/.schemaform.toml`.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed JSON.
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Compile a form and print the layout tree with all maps.
    Layout {
        #[command(flatten)]
        source: SourceArgs,

        /// Print only the layout tree.
        #[arg(long)]
        tree_only: bool,
    },
    /// Resolve `$ref`s and print the compiled schema with its reference maps.
    Resolve {
        /// JSON Schema file.
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
    /// Materialise a layout library template for one array item.
    Expand {
        #[command(flatten)]
        source: SourceArgs,

        /// Layout library key, e.g. `/children/-`.
        key: String,

        /// Data pointer of the item being expanded, e.g. `/children/0`.
        data_pointer: String,
    },
    /// Print the JSON Schema of `.schemaform.toml`.
    ConfigSchema,
}

#[derive(Args)]
struct SourceArgs {
    /// JSON Schema file.
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Explicit layout file.
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Current form data.
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Append a submit button when the layout has none.
    #[arg(long)]
    add_submit: bool,

    /// When schema defaults seed node values.
    #[arg(long, value_enum)]
    defaults: Option<DefaultsMode>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DefaultsMode {
    /// Only when no data was supplied.
    Auto,
    /// For every node without a value.
    Always,
    /// Never.
    Never,
}

impl From<DefaultsMode> for SchemaDefaults {
    fn from(mode: DefaultsMode) -> Self {
        match mode {
            DefaultsMode::Auto => SchemaDefaults::Auto,
            DefaultsMode::Always => SchemaDefaults::Always,
            DefaultsMode::Never => SchemaDefaults::Never,
        }
    }
}

impl SourceArgs {
    fn paths(&self) -> SourcePaths {
        SourcePaths {
            schema: self.schema.clone(),
            layout: self.layout.clone(),
            data: self.data.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let workspace = match cli.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let mut ctx = AppContext::new(workspace);

    let output = match cli.command {
        SubCommands::ConfigSchema => CliConfig::json_schema(),
        command => {
            ctx.load_config(cli.config)?;
            run(&ctx, command)?
        }
    };

    let text = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{text}");
    Ok(())
}

fn run(ctx: &AppContext, command: SubCommands) -> Result<Value> {
    match command {
        SubCommands::Layout { source, tree_only } => {
            let form = ctx.compile(&source.paths(), options(ctx, &source))?;
            print_diagnostics(form.diagnostics());
            info!("compiled {} top-level nodes", form.layout.len());
            Ok(if tree_only {
                serde_json::to_value(&form.layout)?
            } else {
                form.to_json()?
            })
        }
        SubCommands::Resolve { schema } => {
            let paths = SourcePaths {
                schema,
                ..Default::default()
            };
            let source = ctx.form_source(&paths)?;
            let mut compiler = CompilationContext::new(ctx.options());
            compiler.load_schema(&source.schema)?;
            print_diagnostics(&compiler.diagnostics);
            Ok(json!({
                "schema": compiler.schema,
                "schemaRefLibrary": compiler.schema_ref_library,
                "schemaRecursiveRefMap": compiler.schema_recursive_ref_map,
                "dataRecursiveRefMap": compiler.data_recursive_ref_map,
                "arrayMap": compiler.array_map,
            }))
        }
        SubCommands::Expand {
            source,
            key,
            data_pointer,
        } => {
            let form_source = ctx.form_source(&source.paths())?;
            let mut form = form_source.compile(options(ctx, &source))?;
            let template = form
                .context
                .layout_ref_library
                .get(&key)
                .ok_or_else(|| anyhow::anyhow!("no layout template for `{key}`"))?;
            let reference =
                LayoutNode::reference(&key, data_pointer.clone(), template.recursive_reference);
            let value = form_source
                .data
                .as_ref()
                .and_then(|data| pointer::get(data, data_pointer.as_str()))
                .cloned();
            let node = form.get_layout_node(&reference, value.as_ref())?;
            print_diagnostics(form.diagnostics());
            Ok(serde_json::to_value(&node)?)
        }
        SubCommands::ConfigSchema => Ok(CliConfig::json_schema()),
    }
}

fn options(ctx: &AppContext, source: &SourceArgs) -> schemaform::FormOptions {
    let mut options = ctx.options();
    if source.add_submit {
        options.add_submit = true;
    }
    if let Some(mode) = source.defaults {
        options.set_schema_defaults = mode.into();
    }
    options
}

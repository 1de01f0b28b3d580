use crate::adapters::form::MemoryFormState;
use crate::core::visibility::FormTarget;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "qgis-form-expr")]
#[command(about = "Evaluate QGIS form expressions through a QGIS Server EXPRESSION service")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "qgis-form-expr.toml", global = true)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log as JSON lines instead of compact text
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the dependencies of an expression, without contacting the server
    Criteria {
        #[arg(short, long)]
        expression: String,
    },

    /// Evaluate named expressions on a layer
    Evaluate {
        #[command(flatten)]
        target: TargetArgs,

        /// Expression to evaluate, as `id=expression` (repeatable)
        #[arg(short, long = "expression", value_parser = parse_key_val, required = true)]
        expressions: Vec<(String, String)>,

        /// Send the form values as the evaluation feature
        #[arg(long)]
        form_scope: bool,

        #[command(flatten)]
        form: FormArgs,
    },

    /// Compute form group visibilities for the given form values
    Visibility {
        #[command(flatten)]
        target: TargetArgs,

        /// Group visibility expression, as `group_id=expression` (repeatable)
        #[arg(short, long = "group", value_parser = parse_key_val)]
        groups: Vec<(String, String)>,

        #[command(flatten)]
        form: FormArgs,
    },

    /// Fetch the features matching a filter evaluated in the form scope
    Features {
        #[command(flatten)]
        target: TargetArgs,

        #[arg(long)]
        filter: String,

        /// Fields to return, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,

        #[command(flatten)]
        form: FormArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub repository: String,

    #[arg(long)]
    pub project: String,

    /// Layer id in the project
    #[arg(long)]
    pub layer: String,
}

impl TargetArgs {
    pub fn target(&self) -> FormTarget<'_> {
        FormTarget {
            repository: &self.repository,
            project: &self.project,
            layer_id: &self.layer,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct FormArgs {
    /// Form value, as `field=value` (repeatable)
    #[arg(long = "value", value_parser = parse_key_val)]
    pub values: Vec<(String, String)>,

    /// Field holding the geometry as WKT
    #[arg(long)]
    pub geometry_field: Option<String>,
}

impl FormArgs {
    pub fn form_state(&self) -> MemoryFormState {
        let mut form = MemoryFormState::new();
        for (field, value) in &self.values {
            form.set_value(field.clone(), value.clone());
        }
        form.set_geometry_field(self.geometry_field.clone());
        form
    }
}

/// Splits `key=value` on the first `=`; the value may be empty.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

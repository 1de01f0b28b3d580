use anyhow::Context;
use clap::Parser;
use indexmap::IndexMap;
use qgis_form_expr::config::cli::{Command, FormArgs, TargetArgs};
use qgis_form_expr::core::criteria::{
    criteria_from_expression, criteria_from_expressions, current_value_criteria,
    has_current_geometry,
};
use qgis_form_expr::core::feature_builder::{build_form_feature, form_scope_criteria};
use qgis_form_expr::domain::model::ExpressionMap;
use qgis_form_expr::domain::ports::ProjectRegistry;
use qgis_form_expr::utils::{logger, validation::Validate};
use qgis_form_expr::{
    Cli, ConfiguredProjects, ExpressionClient, GroupVisibilityEvaluator, HttpTransport,
    StaticPermissions, TomlConfig, WktParser,
};

type Client = ExpressionClient<HttpTransport, StaticPermissions>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    let output = match cli.command {
        Command::Criteria { expression } => criteria_report(&expression),
        command => {
            let config = load_config(&cli.config)?;
            let client = ExpressionClient::new(config.transport()?, config.permissions());
            let registry = config.registry();
            run_remote(command, &client, &registry).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<TomlConfig> {
    tracing::info!("Loading configuration from: {}", path);
    let config = TomlConfig::from_file(path)
        .with_context(|| format!("Failed to load config file '{}'", path))?;

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }

    tracing::debug!(
        "Server {} with {} configured layers",
        config.server.url,
        config.registry().len()
    );
    Ok(config)
}

fn criteria_report(expression: &str) -> serde_json::Value {
    serde_json::json!({
        "criteria": criteria_from_expression(Some(expression)),
        "current_value_criteria": current_value_criteria(expression),
        "has_current_geometry": has_current_geometry(expression),
    })
}

async fn run_remote(
    command: Command,
    client: &Client,
    registry: &ConfiguredProjects,
) -> anyhow::Result<serde_json::Value> {
    let output = match command {
        Command::Criteria { .. } => unreachable!("criteria is answered without the server"),

        Command::Evaluate {
            target,
            expressions,
            form_scope,
            form,
        } => {
            let expressions: ExpressionMap = expressions.into_iter().collect();
            let layer = find_layer(registry, &target)?;

            let feature = if form_scope {
                let criteria = criteria_from_expressions(expressions.values().map(|e| Some(e.as_str())));
                Some(build_form_feature(&criteria, &form.form_state(), &WktParser)?)
            } else {
                None
            };

            match client.evaluate(layer, &expressions, feature.as_ref()).await {
                Some(results) => serde_json::Value::Object(results),
                None => {
                    tracing::warn!("No evaluation result");
                    serde_json::Value::Null
                }
            }
        }

        Command::Visibility {
            target,
            groups,
            form,
        } => {
            let groups: IndexMap<String, Option<String>> = groups
                .into_iter()
                .map(|(id, exp)| (id, Some(exp)))
                .collect();
            let evaluator = GroupVisibilityEvaluator::new(client, registry, &WktParser);
            let visibilities = evaluator
                .evaluate_group_visibilities(&groups, &form.form_state(), &target.target())
                .await?;
            serde_json::to_value(visibilities)?
        }

        Command::Features {
            target,
            filter,
            fields,
            form,
        } => {
            let layer = find_layer(registry, &target)?;
            let feature = form_feature_for_filter(&filter, &form)?;
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();

            let features = client
                .get_feature_with_form_scope(layer, &filter, &feature, &fields)
                .await;
            tracing::info!("{} features matched", features.len());
            serde_json::Value::Array(features)
        }
    };

    Ok(output)
}

fn find_layer<'r>(
    registry: &'r ConfiguredProjects,
    target: &TargetArgs,
) -> anyhow::Result<&'r dyn qgis_form_expr::domain::ports::Layer> {
    let target = target.target();
    registry
        .layer(target.repository, target.project, target.layer_id)
        .with_context(|| {
            format!(
                "Layer '{}' not found in project '{}~{}'",
                target.layer_id, target.repository, target.project
            )
        })
}

fn form_feature_for_filter(
    filter: &str,
    form: &FormArgs,
) -> anyhow::Result<qgis_form_expr::domain::model::FormFeature> {
    let state = form.form_state();
    let criteria = form_scope_criteria(filter, &state);
    Ok(build_form_feature(&criteria, &state, &WktParser)?)
}

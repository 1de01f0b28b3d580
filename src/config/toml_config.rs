use crate::adapters::http::HttpTransport;
use crate::config::project::{ConfiguredLayer, ConfiguredProject, ConfiguredProjects, StaticPermissions};
use crate::utils::error::{ExprError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("invalid regex"));

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub acl: AclConfig,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// QGIS Server endpoint handling the `EXPRESSION` service.
    pub url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AclConfig {
    /// Repositories where login filters are not applied.
    #[serde(default)]
    pub override_repositories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub repository: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub login_filters: BTreeMap<String, String>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    pub name: String,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ExprError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable, leaving
    /// unknown variables untouched.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_server_url("server.url", &self.server.url)?;

        if let Some(timeout) = self.server.timeout_seconds {
            validation::validate_positive_number("server.timeout_seconds", timeout, 1)?;
        }

        let keys: Vec<String> = self.projects.iter().map(ProjectConfig::key).collect();
        validation::validate_unique("projects", keys.iter().map(String::as_str))?;

        for project in &self.projects {
            validation::require("projects.repository", &project.repository)?;
            validation::require("projects.name", &project.name)?;
            validation::require("projects.path", &project.path)?;
            validation::validate_unique(
                "projects.layers.id",
                project.layers.iter().map(|l| l.id.as_str()),
            )?;
            for layer in &project.layers {
                validation::require("projects.layers.id", &layer.id)?;
                validation::require("projects.layers.name", &layer.name)?;
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn transport(&self) -> Result<HttpTransport> {
        HttpTransport::new(&self.server.url, self.timeout())
    }

    pub fn permissions(&self) -> StaticPermissions {
        StaticPermissions::new(self.acl.override_repositories.iter().cloned())
    }

    pub fn registry(&self) -> ConfiguredProjects {
        let layers = self
            .projects
            .iter()
            .flat_map(|config| {
                let project = Arc::new(ConfiguredProject {
                    repository: config.repository.clone(),
                    name: config.name.clone(),
                    path: config.path.clone(),
                    plugins: config.plugins.iter().cloned().collect(),
                    login_filters: config.login_filters.clone(),
                });
                config.layers.iter().map(move |layer| ConfiguredLayer {
                    id: layer.id.clone(),
                    name: layer.name.clone(),
                    project: project.clone(),
                })
            })
            .collect();

        ConfiguredProjects::new(layers)
    }
}

impl ProjectConfig {
    /// `repository~project`, the way projects are addressed.
    pub fn key(&self) -> String {
        format!("{}~{}", self.repository, self.name)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Layer, PermissionChecker, Project, ProjectRegistry};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[server]
url = "http://localhost:8080/ows/"
timeout_seconds = 10

[acl]
override_repositories = ["admin"]

[[projects]]
repository = "montpellier"
name = "events"
path = "montpellier/events.qgs"
plugins = ["Lizmap", "atlasprint"]

[projects.login_filters]
tramway = "\"owner\" = 'bob'"

[[projects.layers]]
id = "tramway_1"
name = "tramway"

[[projects.layers]]
id = "stops_2"
name = "stops"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.server.url, "http://localhost:8080/ows/");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.projects[0].key(), "montpellier~events");
        assert_eq!(config.projects[0].login_filters["tramway"], "\"owner\" = 'bob'");

        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        let layer = registry.layer("montpellier", "events", "stops_2").unwrap();
        assert_eq!(layer.name(), "stops");
        assert!(layer.project().plugin_capabilities().contains("Lizmap"));

        assert!(config.permissions().has_override_permission("admin"));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
[server]
url = "https://qgis.example.com/ows"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert!(config.registry().is_empty());
        assert!(!config.permissions().has_override_permission("any"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("QGIS_FORM_EXPR_TEST_URL", "https://test.qgis.com/ows");

        let config = TomlConfig::from_toml_str(
            r#"
[server]
url = "${QGIS_FORM_EXPR_TEST_URL}"
"#,
        )
        .unwrap();
        assert_eq!(config.server.url, "https://test.qgis.com/ows");

        std::env::remove_var("QGIS_FORM_EXPR_TEST_URL");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = TomlConfig::from_toml_str(
            r#"
[server]
url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(invalid_url.validate().is_err());

        let zero_timeout = TomlConfig::from_toml_str(
            r#"
[server]
url = "http://localhost/ows"
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(zero_timeout.validate().is_err());

        let duplicate_layers = BASIC.replace("stops_2", "tramway_1");
        let config = TomlConfig::from_toml_str(&duplicate_layers).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_layer_name_is_missing() {
        let config = TomlConfig::from_toml_str(&BASIC.replace("name = \"stops\"", "name = \" \""))
            .unwrap();

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ExprError::MissingConfigError { ref field } if field == "projects.layers.name")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[server").unwrap_err();
        assert!(matches!(err, ExprError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.projects[0].layers.len(), 2);
        assert!(config.transport().is_ok());
    }
}

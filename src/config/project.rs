use crate::domain::ports::{Layer, PermissionChecker, Project, ProjectRegistry};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Project described in the configuration file.
#[derive(Debug, Clone)]
pub struct ConfiguredProject {
    pub repository: String,
    pub name: String,
    pub path: String,
    pub plugins: HashSet<String>,
    pub login_filters: BTreeMap<String, String>,
}

impl Project for ConfiguredProject {
    fn repository_key(&self) -> &str {
        &self.repository
    }

    fn login_filters(&self, layer_names: &[&str]) -> BTreeMap<String, String> {
        self.login_filters
            .iter()
            .filter(|(layer, _)| layer_names.contains(&layer.as_str()))
            .map(|(layer, filter)| (layer.clone(), filter.clone()))
            .collect()
    }

    fn relative_definition_path(&self) -> String {
        self.path.clone()
    }

    fn plugin_capabilities(&self) -> HashSet<String> {
        self.plugins.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ConfiguredLayer {
    pub id: String,
    pub name: String,
    pub project: Arc<ConfiguredProject>,
}

impl Layer for ConfiguredLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn project(&self) -> &dyn Project {
        self.project.as_ref()
    }
}

/// Every configured layer, looked up by `repository~project` and layer id.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredProjects {
    layers: Vec<ConfiguredLayer>,
}

impl ConfiguredProjects {
    pub fn new(layers: Vec<ConfiguredLayer>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl ProjectRegistry for ConfiguredProjects {
    fn layer(&self, repository: &str, project: &str, layer_id: &str) -> Option<&dyn Layer> {
        self.layers
            .iter()
            .find(|layer| {
                layer.id == layer_id
                    && layer.project.repository == repository
                    && layer.project.name == project
            })
            .map(|layer| layer as &dyn Layer)
    }
}

/// Repositories in which the caller may bypass login filters.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    override_repositories: HashSet<String>,
}

impl StaticPermissions {
    pub fn new<I: IntoIterator<Item = String>>(override_repositories: I) -> Self {
        Self {
            override_repositories: override_repositories.into_iter().collect(),
        }
    }
}

impl PermissionChecker for StaticPermissions {
    fn has_override_permission(&self, repository_key: &str) -> bool {
        self.override_repositories.contains(repository_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Arc<ConfiguredProject> {
        Arc::new(ConfiguredProject {
            repository: "montpellier".to_string(),
            name: "events".to_string(),
            path: "montpellier/events.qgs".to_string(),
            plugins: HashSet::from(["Lizmap".to_string()]),
            login_filters: BTreeMap::from([
                ("tramway".to_string(), "\"owner\" = 'bob'".to_string()),
                ("stops".to_string(), "\"zone\" = 'A'".to_string()),
            ]),
        })
    }

    #[test]
    fn test_login_filters_restricted_to_requested_layers() {
        let project = project();

        let filters = project.login_filters(&["tramway", "bus"]);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters["tramway"], "\"owner\" = 'bob'");

        assert!(project.login_filters(&["bus"]).is_empty());
    }

    #[test]
    fn test_registry_lookup() {
        let project = project();
        let registry = ConfiguredProjects::new(vec![ConfiguredLayer {
            id: "tramway_1".to_string(),
            name: "tramway".to_string(),
            project: project.clone(),
        }]);

        let layer = registry.layer("montpellier", "events", "tramway_1").unwrap();
        assert_eq!(layer.name(), "tramway");
        assert_eq!(layer.project().relative_definition_path(), "montpellier/events.qgs");

        assert!(registry.layer("montpellier", "events", "tramway").is_none());
        assert!(registry.layer("paris", "events", "tramway_1").is_none());
        assert!(registry.layer("montpellier", "other", "tramway_1").is_none());
    }

    #[test]
    fn test_static_permissions() {
        let permissions = StaticPermissions::new(vec!["admin".to_string()]);
        assert!(permissions.has_override_permission("admin"));
        assert!(!permissions.has_override_permission("montpellier"));
    }
}

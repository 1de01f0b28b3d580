use crate::domain::ports::{Layer, PermissionChecker};

/// Combines `expression` with the login filter of the caller for `layer`.
///
/// Callers allowed to override login filters in the layer's repository get the
/// expression back untouched, as do layers present in the project's login filter
/// mapping. Only a layer missing from a non-empty mapping gets the mapping's
/// filters appended.
pub fn apply_access_filter<P>(permissions: &P, layer: &dyn Layer, expression: &str) -> String
where
    P: PermissionChecker + ?Sized,
{
    let project = layer.project();
    if permissions.has_override_permission(project.repository_key()) {
        return expression.to_string();
    }

    let layer_name = layer.name();
    let login_filters = project.login_filters(&[layer_name]);

    if login_filters.is_empty() || login_filters.contains_key(layer_name) {
        return expression.to_string();
    }

    let filter = login_filters
        .values()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(") AND (");

    tracing::debug!("Applying login filter on layer '{}': {}", layer_name, filter);
    format!("({}) AND ({})", expression, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Project;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProject {
        filters: BTreeMap<String, String>,
    }

    impl Project for FakeProject {
        fn repository_key(&self) -> &str {
            "montpellier"
        }

        fn login_filters(&self, _layer_names: &[&str]) -> BTreeMap<String, String> {
            self.filters.clone()
        }

        fn relative_definition_path(&self) -> String {
            "montpellier/events.qgs".to_string()
        }

        fn plugin_capabilities(&self) -> HashSet<String> {
            HashSet::new()
        }
    }

    struct FakeLayer {
        project: FakeProject,
    }

    impl Layer for FakeLayer {
        fn name(&self) -> &str {
            "tramway"
        }

        fn project(&self) -> &dyn Project {
            &self.project
        }
    }

    struct FakePermissions {
        allowed: bool,
        checks: AtomicUsize,
    }

    impl FakePermissions {
        fn new(allowed: bool) -> Self {
            Self {
                allowed,
                checks: AtomicUsize::new(0),
            }
        }
    }

    impl PermissionChecker for FakePermissions {
        fn has_override_permission(&self, repository_key: &str) -> bool {
            assert_eq!(repository_key, "montpellier");
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.allowed
        }
    }

    fn layer_with_filters(filters: &[(&str, &str)]) -> FakeLayer {
        FakeLayer {
            project: FakeProject {
                filters: filters
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        }
    }

    #[test]
    fn test_override_permission_keeps_expression() {
        let layer = layer_with_filters(&[("stops", "\"owner\" = 'bob'")]);
        let permissions = FakePermissions::new(true);

        assert_eq!(apply_access_filter(&permissions, &layer, "\"a\" = 1"), "\"a\" = 1");
        assert_eq!(permissions.checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_login_filters_keeps_expression() {
        let layer = layer_with_filters(&[]);
        let permissions = FakePermissions::new(false);

        assert_eq!(apply_access_filter(&permissions, &layer, "\"a\" = 1"), "\"a\" = 1");
    }

    #[test]
    fn test_listed_layer_keeps_expression() {
        let layer = layer_with_filters(&[("tramway", "\"owner\" = 'bob'")]);
        let permissions = FakePermissions::new(false);

        assert_eq!(apply_access_filter(&permissions, &layer, "\"a\" = 1"), "\"a\" = 1");
    }

    #[test]
    fn test_unlisted_layer_gets_filter_appended() {
        let layer = layer_with_filters(&[("stops", "\"owner\" = 'bob'")]);
        let permissions = FakePermissions::new(false);

        assert_eq!(
            apply_access_filter(&permissions, &layer, "\"a\" = 1"),
            "(\"a\" = 1) AND (\"owner\" = 'bob')"
        );
    }

    #[test]
    fn test_unlisted_layer_with_several_filters() {
        let layer = layer_with_filters(&[("stops", "\"b\" = 2"), ("lines", "\"c\" = 3")]);
        let permissions = FakePermissions::new(false);

        assert_eq!(
            apply_access_filter(&permissions, &layer, "\"a\" = 1"),
            "(\"a\" = 1) AND (\"c\" = 3) AND (\"b\" = 2)"
        );
    }
}

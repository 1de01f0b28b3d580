use crate::domain::model::{Geometry, ProxyRequest, RemoteData, RequestOptions};
use crate::utils::error::{GeometryParseError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

/// Answers whether the caller may bypass login filters in a repository.
pub trait PermissionChecker: Send + Sync {
    fn has_override_permission(&self, repository_key: &str) -> bool;
}

pub trait Project: Send + Sync {
    fn repository_key(&self) -> &str;

    /// Login filters for the given layers, keyed by layer name.
    fn login_filters(&self, layer_names: &[&str]) -> BTreeMap<String, String>;

    /// Path of the project definition, relative to the server's root.
    fn relative_definition_path(&self) -> String;

    fn plugin_capabilities(&self) -> HashSet<String>;
}

pub trait Layer: Send + Sync {
    fn name(&self) -> &str;
    fn project(&self) -> &dyn Project;
}

/// Looks a layer up from an explicit repository / project / layer id triple.
pub trait ProjectRegistry: Send + Sync {
    fn layer(&self, repository: &str, project: &str, layer_id: &str) -> Option<&dyn Layer>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn build_request(
        &self,
        params: &[(String, String)],
        options: RequestOptions,
    ) -> Result<ProxyRequest>;

    async fn fetch(&self, request: &ProxyRequest) -> Result<RemoteData>;
}

pub trait GeometryParser: Send + Sync {
    fn parse(&self, wkt: &str) -> std::result::Result<Geometry, GeometryParseError>;
}

/// Read access to the values currently held by a form.
pub trait FormState {
    fn value(&self, field: &str) -> Option<String>;

    /// Name of the field holding the feature geometry as WKT.
    fn geometry_field(&self) -> Option<&str>;
}

pub mod access_filter;
pub mod criteria;
pub mod evaluation;
pub mod feature_builder;
pub mod visibility;

pub use crate::domain::model::{Criteria, ExpressionMap, FormFeature, VisibilityMap};
pub use crate::domain::ports::{
    FormState, GeometryParser, Layer, PermissionChecker, Project, ProjectRegistry, Transport,
};
pub use crate::utils::error::Result;

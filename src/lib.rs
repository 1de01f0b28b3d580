pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{form::MemoryFormState, http::HttpTransport, wkt::WktParser};
pub use config::{ConfiguredProjects, StaticPermissions, TomlConfig};
pub use core::{
    evaluation::ExpressionClient,
    visibility::{FormTarget, GroupVisibilityEvaluator},
};
pub use utils::error::{ExprError, Result};

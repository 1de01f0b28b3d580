#[cfg(feature = "cli")]
pub mod cli;
pub mod project;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::Cli;
pub use project::{ConfiguredLayer, ConfiguredProject, ConfiguredProjects, StaticPermissions};
pub use toml_config::TomlConfig;

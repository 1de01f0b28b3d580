use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExprError {
    #[error("Remote request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    GeometryError(#[from] GeometryParseError),

    #[error("Layer '{layer_id}' not found in project '{repository}~{project}'")]
    LayerNotFound {
        repository: String,
        project: String,
        layer_id: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

/// Raised by a geometry parser when a WKT string cannot be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Geometry parse error: {message} (input: '{input}')")]
pub struct GeometryParseError {
    pub input: String,
    pub message: String,
}

impl GeometryParseError {
    pub fn new(input: &str, message: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;

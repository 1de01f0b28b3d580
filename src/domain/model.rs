use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Field names an expression depends on, deduplicated in first-seen order.
pub type Criteria = IndexSet<String>;

/// Expressions keyed by an identifier (group id, constraint name, ...).
pub type ExpressionMap = IndexMap<String, String>;

/// Group id to visibility flag.
pub type VisibilityMap = IndexMap<String, bool>;

/// Name of the server plugin that provides the `EXPRESSION` service.
pub const EVALUATOR_PLUGIN: &str = "Lizmap";

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: serde_json::Value,
}

/// Feature sent to the evaluator to resolve expressions against in-progress form edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Option<Geometry>,
    pub properties: IndexMap<String, Option<String>>,
}

impl FormFeature {
    pub fn new(geometry: Option<Geometry>, properties: IndexMap<String, Option<String>>) -> Self {
        Self {
            feature_type: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

/// HTTP verb the transport uses for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Get,
    #[default]
    Post,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub method: RequestMethod,
}

/// A request ready to be sent: for POST the params travel as a form body,
/// for GET they are already encoded in `url`.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub url: url::Url,
    pub method: RequestMethod,
    pub form: Vec<(String, String)>,
}

/// Raw answer of the remote server.
#[derive(Debug, Clone)]
pub struct RemoteData {
    pub body: Vec<u8>,
    pub mime_type: String,
    pub status_code: u16,
}

impl RemoteData {
    pub fn is_json(&self) -> bool {
        self.mime_type.starts_with("text/json") || self.mime_type.starts_with("application/json")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Decoded body of an `EXPRESSION` service response. Every field is optional
/// because the service omits the ones that do not apply to a request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpressionResponse {
    pub status: Option<String>,
    pub results: Option<Vec<serde_json::Value>>,
    pub errors: Option<serde_json::Value>,
    pub features: Option<Vec<serde_json::Value>>,
}

/// What an `Evaluate` response means for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// The evaluator answered with a status other than `success`.
    Failure { errors: Option<serde_json::Value> },
    /// First results entry.
    Results(serde_json::Map<String, serde_json::Value>),
    /// Neither a failure status nor a usable `results[0]` object.
    Malformed,
}

impl ExpressionResponse {
    pub fn into_outcome(self) -> EvaluationOutcome {
        match self {
            Self {
                status: Some(status),
                errors,
                ..
            } if status != "success" => EvaluationOutcome::Failure { errors },
            Self {
                results: Some(results),
                ..
            } => match results.into_iter().next() {
                Some(serde_json::Value::Object(first)) => EvaluationOutcome::Results(first),
                _ => EvaluationOutcome::Malformed,
            },
            _ => EvaluationOutcome::Malformed,
        }
    }
}

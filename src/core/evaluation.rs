use crate::core::access_filter::apply_access_filter;
use crate::domain::model::{
    EvaluationOutcome, ExpressionMap, ExpressionResponse, FormFeature, RemoteData, RequestMethod,
    RequestOptions, EVALUATOR_PLUGIN,
};
use crate::domain::ports::{Layer, PermissionChecker, Transport};
use serde::Serialize;
use serde_json::{Map, Value};

pub const EXPRESSION_SERVICE: &str = "EXPRESSION";
pub const EVALUATE_REQUEST: &str = "Evaluate";
pub const FEATURE_WITH_FORM_SCOPE_REQUEST: &str = "getFeatureWithFormScope";

/// Parameters of one `EXPRESSION` service call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationRequest {
    pub request: String,
    pub map: String,
    pub layer: String,
    pub expressions: Option<String>,
    pub feature: Option<String>,
    pub form_scope: bool,
    pub filter: Option<String>,
    pub form_feature: Option<String>,
    pub fields: Option<String>,
}

impl EvaluationRequest {
    pub fn evaluate(layer: &dyn Layer, expressions: String) -> Self {
        Self {
            request: EVALUATE_REQUEST.to_string(),
            map: layer.project().relative_definition_path(),
            layer: layer.name().to_string(),
            expressions: Some(expressions),
            ..Default::default()
        }
    }

    /// Evaluates against `feature` instead of a stored row.
    pub fn with_form_scope(mut self, feature: String) -> Self {
        self.feature = Some(feature);
        self.form_scope = true;
        self
    }

    pub fn feature_with_form_scope(
        layer: &dyn Layer,
        filter: String,
        form_feature: String,
        fields: &[&str],
    ) -> Self {
        Self {
            request: FEATURE_WITH_FORM_SCOPE_REQUEST.to_string(),
            map: layer.project().relative_definition_path(),
            layer: layer.name().to_string(),
            filter: Some(filter),
            form_feature: Some(form_feature),
            fields: Some(fields.join(",")),
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("service".to_string(), EXPRESSION_SERVICE.to_string()),
            ("request".to_string(), self.request.clone()),
            ("map".to_string(), self.map.clone()),
            ("layer".to_string(), self.layer.clone()),
        ];

        let optional = [
            ("expressions", &self.expressions),
            ("feature", &self.feature),
            ("filter", &self.filter),
            ("form_feature", &self.form_feature),
            ("fields", &self.fields),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key.to_string(), value.clone()));
            }
        }
        if self.form_scope {
            params.push(("form_scope".to_string(), "true".to_string()));
        }

        params
    }
}

/// Client of the remote `EXPRESSION` service.
pub struct ExpressionClient<T: Transport, P: PermissionChecker> {
    transport: T,
    permissions: P,
}

impl<T: Transport, P: PermissionChecker> ExpressionClient<T, P> {
    pub fn new(transport: T, permissions: P) -> Self {
        Self {
            transport,
            permissions,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Applies the caller's login filter to every expression, keeping ids and order.
    pub fn filter_expressions(&self, layer: &dyn Layer, expressions: &ExpressionMap) -> ExpressionMap {
        expressions
            .iter()
            .map(|(id, exp)| (id.clone(), apply_access_filter(&self.permissions, layer, exp)))
            .collect()
    }

    /// Evaluates a batch of expressions in one request and returns the first
    /// results entry, keyed by expression id.
    pub async fn evaluate(
        &self,
        layer: &dyn Layer,
        expressions: &ExpressionMap,
        feature: Option<&FormFeature>,
    ) -> Option<Map<String, Value>> {
        let filtered = self.filter_expressions(layer, expressions);

        if !supports_evaluation(layer) {
            tracing::debug!(
                "Project of layer '{}' has no {} plugin, skipping evaluation",
                layer.name(),
                EVALUATOR_PLUGIN
            );
            return None;
        }

        let mut request = EvaluationRequest::evaluate(layer, encode(&filtered)?);
        if let Some(feature) = feature {
            request = request.with_form_scope(encode(feature)?);
        }

        let data = self.send(&request).await?;
        results_from(&data)
    }

    /// Fetches the features of `layer` matching `expression`, evaluated with
    /// `feature` as the form scope. Any failure yields an empty list.
    pub async fn get_feature_with_form_scope(
        &self,
        layer: &dyn Layer,
        expression: &str,
        feature: &FormFeature,
        fields: &[&str],
    ) -> Vec<Value> {
        if !supports_evaluation(layer) {
            tracing::debug!(
                "Project of layer '{}' has no {} plugin, no feature fetched",
                layer.name(),
                EVALUATOR_PLUGIN
            );
            return Vec::new();
        }

        let filter = apply_access_filter(&self.permissions, layer, expression);
        let Some(form_feature) = encode(feature) else {
            return Vec::new();
        };
        let request = EvaluationRequest::feature_with_form_scope(layer, filter, form_feature, fields);

        let Some(data) = self.send(&request).await else {
            return Vec::new();
        };
        match serde_json::from_slice::<ExpressionResponse>(&data.body) {
            Ok(ExpressionResponse {
                features: Some(features),
                ..
            }) => features,
            Ok(_) => {
                tracing::debug!("No features in response: {}", data.body_text());
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Malformed response ({}): {}", e, data.body_text());
                Vec::new()
            }
        }
    }

    /// Sends `request` as a POST and returns the response when it is JSON.
    /// Transport failures and other content types yield `None`.
    pub(crate) async fn send(&self, request: &EvaluationRequest) -> Option<RemoteData> {
        let options = RequestOptions {
            method: RequestMethod::Post,
        };
        let proxy_request = match self.transport.build_request(&request.to_params(), options) {
            Ok(proxy_request) => proxy_request,
            Err(e) => {
                tracing::error!("Unable to build {} request: {}", request.request, e);
                return None;
            }
        };

        tracing::debug!("Sending {} request to {}", request.request, proxy_request.url);
        let data = match self.transport.fetch(&proxy_request).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("{} request failed: {}", request.request, e);
                return None;
            }
        };
        tracing::debug!(
            "{} response: status {}, content type '{}'",
            request.request,
            data.status_code,
            data.mime_type
        );

        if !data.is_json() {
            tracing::warn!(
                "{} response is not JSON ('{}'), ignoring it",
                request.request,
                data.mime_type
            );
            return None;
        }

        Some(data)
    }
}

fn supports_evaluation(layer: &dyn Layer) -> bool {
    layer
        .project()
        .plugin_capabilities()
        .contains(EVALUATOR_PLUGIN)
}

fn encode<S: Serialize + ?Sized>(value: &S) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Unable to encode request parameter: {}", e);
            None
        }
    }
}

/// Interprets an `Evaluate` response body.
pub fn evaluation_outcome(data: &RemoteData) -> EvaluationOutcome {
    match serde_json::from_slice::<ExpressionResponse>(&data.body) {
        Ok(response) => response.into_outcome(),
        Err(_) => EvaluationOutcome::Malformed,
    }
}

/// First results entry of an `Evaluate` response, logging the body otherwise.
pub(crate) fn results_from(data: &RemoteData) -> Option<Map<String, Value>> {
    match evaluation_outcome(data) {
        EvaluationOutcome::Results(results) => Some(results),
        // TODO: report the `errors` entries per expression once the evaluator documents their shape
        EvaluationOutcome::Failure { .. } => {
            tracing::error!("{}", data.body_text());
            None
        }
        EvaluationOutcome::Malformed => {
            tracing::error!("Malformed evaluation response: {}", data.body_text());
            None
        }
    }
}

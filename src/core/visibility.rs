use crate::core::criteria::criteria_from_expression;
use crate::core::evaluation::{results_from, EvaluationRequest, ExpressionClient};
use crate::core::feature_builder::build_form_feature;
use crate::domain::model::{Criteria, ExpressionMap, VisibilityMap};
use crate::domain::ports::{FormState, GeometryParser, PermissionChecker, ProjectRegistry, Transport};
use crate::utils::error::{ExprError, Result};
use indexmap::IndexMap;
use serde_json::Value;

/// Layer a form edits, identified explicitly.
#[derive(Debug, Clone, Copy)]
pub struct FormTarget<'a> {
    pub repository: &'a str,
    pub project: &'a str,
    pub layer_id: &'a str,
}

/// Computes which groups of a form are visible for the values currently entered.
pub struct GroupVisibilityEvaluator<'a, T: Transport, P: PermissionChecker> {
    client: &'a ExpressionClient<T, P>,
    registry: &'a dyn ProjectRegistry,
    parser: &'a dyn GeometryParser,
}

impl<'a, T: Transport, P: PermissionChecker> GroupVisibilityEvaluator<'a, T, P> {
    pub fn new(
        client: &'a ExpressionClient<T, P>,
        registry: &'a dyn ProjectRegistry,
        parser: &'a dyn GeometryParser,
    ) -> Self {
        Self {
            client,
            registry,
            parser,
        }
    }

    /// Every group listed in `group_expressions` starts visible. Groups whose
    /// expression references at least one field are evaluated together in a
    /// single request; a group is hidden only when its result is exactly `0`.
    ///
    /// Transport and response problems leave the groups visible. A geometry
    /// that cannot be parsed, or a target layer that does not exist, is an error.
    pub async fn evaluate_group_visibilities<F>(
        &self,
        group_expressions: &IndexMap<String, Option<String>>,
        form: &F,
        target: &FormTarget<'_>,
    ) -> Result<VisibilityMap>
    where
        F: FormState + Sync + ?Sized,
    {
        let mut visibilities = VisibilityMap::new();
        let mut expressions = ExpressionMap::new();
        let mut criteria = Criteria::new();

        for (id, exp) in group_expressions {
            visibilities.insert(id.clone(), true);

            let Some(exp) = exp.as_deref().filter(|e| !e.trim().is_empty()) else {
                continue;
            };

            let group_criteria = criteria_from_expression(Some(exp));
            if group_criteria.is_empty() {
                tracing::debug!("Group '{}' expression has no field dependency", id);
                continue;
            }

            expressions.insert(id.clone(), exp.to_string());
            criteria.extend(group_criteria);
        }

        if expressions.is_empty() || criteria.is_empty() {
            return Ok(visibilities);
        }

        let feature = build_form_feature(&criteria, form, self.parser)?;

        let layer = self
            .registry
            .layer(target.repository, target.project, target.layer_id)
            .ok_or_else(|| ExprError::LayerNotFound {
                repository: target.repository.to_string(),
                project: target.project.to_string(),
                layer_id: target.layer_id.to_string(),
            })?;

        let filtered = self.client.filter_expressions(layer, &expressions);
        let request = EvaluationRequest::evaluate(layer, serde_json::to_string(&filtered)?)
            .with_form_scope(serde_json::to_string(&feature)?);

        tracing::debug!(
            "Evaluating {} group visibility expressions on layer '{}'",
            expressions.len(),
            layer.name()
        );

        let Some(results) = self.client.send(&request).await.and_then(|data| results_from(&data))
        else {
            return Ok(visibilities);
        };

        for (id, result) in results {
            if is_hidden(&result) {
                if let Some(visible) = visibilities.get_mut(&id) {
                    *visible = false;
                }
            }
        }

        Ok(visibilities)
    }
}

fn is_hidden(result: &Value) -> bool {
    matches!(result, Value::Number(n) if n.as_i64() == Some(0))
}

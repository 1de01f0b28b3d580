use crate::core::criteria::{current_value_criteria, has_current_geometry};
use crate::domain::model::{Criteria, FormFeature};
use crate::domain::ports::{FormState, GeometryParser};
use crate::utils::error::GeometryParseError;
use indexmap::IndexMap;

/// Builds the feature the evaluator resolves form-scoped expressions against,
/// reading only the fields listed in `criteria`.
///
/// A geometry field with no drawn geometry yet leaves `geometry` null; only
/// a non-blank value that is not valid WKT is an error.
pub fn build_form_feature<F, G>(
    criteria: &Criteria,
    form: &F,
    parser: &G,
) -> Result<FormFeature, GeometryParseError>
where
    F: FormState + ?Sized,
    G: GeometryParser + ?Sized,
{
    let geometry_field = form.geometry_field();
    let mut geometry = None;
    let mut properties = IndexMap::new();

    for criterion in criteria {
        if geometry_field == Some(criterion.as_str()) {
            geometry = match form.value(criterion) {
                Some(wkt) if !wkt.trim().is_empty() => Some(parser.parse(wkt.trim())?),
                _ => None,
            };
        } else {
            properties.insert(criterion.clone(), form.value(criterion));
        }
    }

    Ok(FormFeature::new(geometry, properties))
}

/// Form fields a filter reads through `current_value()`, plus the geometry
/// field when the filter uses `@current_geometry`.
pub fn form_scope_criteria<F>(filter: &str, form: &F) -> Criteria
where
    F: FormState + ?Sized,
{
    let mut criteria = current_value_criteria(filter);
    if has_current_geometry(filter) {
        if let Some(geometry_field) = form.geometry_field() {
            criteria.insert(geometry_field.to_string());
        }
    }
    criteria
}

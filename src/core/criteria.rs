//! Static dependency extraction from QGIS expressions.
//!
//! Field references are double-quoted identifiers (`"name"`). Values read from the
//! form being edited are `current_value('name')` calls. Nothing here parses the
//! expression language; the scans are best-effort and never fail.

use crate::domain::model::Criteria;
use regex::Regex;
use std::sync::LazyLock;

static FIELD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("invalid regex"));

static CURRENT_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcurrent_value\(\s*'([^)]*)'\s*\)").expect("invalid regex")
});

static CURRENT_GEOMETRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\B@current_geometry\b").expect("invalid regex"));

fn is_blank(exp: Option<&str>) -> bool {
    exp.is_none_or(|e| e.trim().is_empty())
}

/// Fields referenced by `exp`, in first-seen order.
pub fn criteria_from_expression(exp: Option<&str>) -> Criteria {
    let Some(exp) = exp.filter(|e| !e.trim().is_empty()) else {
        return Criteria::new();
    };

    FIELD_REGEX
        .captures_iter(exp)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Union of the fields referenced by every non-blank expression.
pub fn criteria_from_expressions<'a, I>(expressions: I) -> Criteria
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut criteria = Criteria::new();
    for exp in expressions {
        if is_blank(exp) {
            continue;
        }
        criteria.extend(criteria_from_expression(exp));
    }
    criteria
}

/// Literal arguments of `current_value('...')` calls.
pub fn current_value_criteria(exp: &str) -> Criteria {
    CURRENT_VALUE_REGEX
        .captures_iter(exp)
        .map(|caps| caps[1].to_string())
        .collect()
}

pub fn has_current_geometry(exp: &str) -> bool {
    CURRENT_GEOMETRY_REGEX.is_match(exp)
}

use crate::utils::error::{ExprError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> ExprError {
    ExprError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// A blank required field is reported as missing.
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExprError::MissingConfigError {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// QGIS Server endpoints are reached over plain HTTP(S) only.
pub fn validate_server_url(field: &str, value: &str) -> Result<()> {
    require(field, value)?;

    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("not a URL ({})", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, value, format!("'{}' is not an http(s) scheme", url.scheme())));
    }
    Ok(())
}

pub fn validate_positive_number(field: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(field, value, format!("must be at least {}", min_value)));
    }
    Ok(())
}

/// Rejects the second occurrence of any key in `keys`.
pub fn validate_unique<'a>(field: &str, keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    match keys.into_iter().find(|key| !seen.insert(*key)) {
        Some(duplicate) => Err(invalid(field, duplicate, "declared more than once")),
        None => Ok(()),
    }
}

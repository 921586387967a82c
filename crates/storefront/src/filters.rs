//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Appends `s` unless the count is exactly one.
///
/// Usage in templates: `{{ count }} item{{ count|plural }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn plural(count: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(if count.to_string() == "1" { "" } else { "s" })
}

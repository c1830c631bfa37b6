//! First-sample type inference
//!
//! A column's type is decided by its first non-null value. Nothing after
//! that value is consulted; see the crate docs for why.

use extractflow_protocol::{ColumnType, Value};

use crate::date_formats::parse_calendar_date;

/// Infer a column type from its values, top to bottom.
///
/// All-null and empty columns fall back to [`ColumnType::Text`].
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .find_map(sample_type)
        .unwrap_or_default()
}

/// Type implied by one sampled value, `None` for null.
pub fn sample_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Null => None,
        Value::Integer(_) => Some(ColumnType::Integer),
        Value::Float(_) => Some(ColumnType::Float),
        Value::Date(_) | Value::DateTime(_) => Some(ColumnType::Date),
        Value::Text(text) => Some(text_sample_type(text)),
    }
}

/// Text samples are sniffed: integer, then float, then date.
fn text_sample_type(text: &str) -> ColumnType {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ColumnType::Text;
    }
    if trimmed.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if looks_like_decimal(trimmed) && trimmed.parse::<f64>().is_ok() {
        return ColumnType::Float;
    }
    if parse_calendar_date(trimmed).is_some() {
        return ColumnType::Date;
    }
    ColumnType::Text
}

/// Rejects words `f64::from_str` accepts ("inf", "NaN") so they stay text.
fn looks_like_decimal(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && text.chars().any(|c| c.is_ascii_digit())
}

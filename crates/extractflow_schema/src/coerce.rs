//! Fitting loosely-typed values into typed columns
//!
//! | Column | Accepts | Becomes null |
//! |--------|---------|--------------|
//! | Integer | integers, whole floats, integer text | fractional floats, other text, dates |
//! | Float | integers, floats, numeric text | other text, dates |
//! | Date | dates, datetimes (truncated), date text | numbers, other text |
//! | Text | everything, rendered as a string | nothing |
//!
//! Blank text is treated as missing for non-text columns.

use extractflow_protocol::{ColumnDef, ColumnType, Value};
use serde::{Deserialize, Serialize};

use crate::date_formats::parse_calendar_date;
use crate::{Result, SchemaError};

/// Coerce one value to `target`.
///
/// `Some(Value::Null)` means the input was missing. `None` means a present
/// value did not fit the column.
pub fn coerce_value(value: &Value, target: ColumnType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    if target != ColumnType::Text {
        if let Value::Text(text) = value {
            if text.trim().is_empty() {
                return Some(Value::Null);
            }
        }
    }

    match target {
        ColumnType::Integer => to_integer(value).map(Value::Integer),
        ColumnType::Float => to_float(value).map(Value::Float),
        ColumnType::Date => to_date(value).map(Value::Date),
        ColumnType::Text => Some(Value::Text(value.to_string())),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(v) => Some(*v),
        Value::Float(v) => whole_float(*v),
        Value::Text(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn whole_float(v: f64) -> Option<i64> {
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    if v.is_finite() && v.fract() == 0.0 && in_range {
        Some(v as i64)
    } else {
        None
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Text(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<chrono::NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::Text(text) => parse_calendar_date(text),
        _ => None,
    }
}

/// Write-time coercion policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCoercer {
    /// Store missing text as `""` instead of null.
    #[serde(default)]
    pub fill_text_nulls: bool,
    /// Fail on values that do not fit instead of nulling them.
    #[serde(default)]
    pub strict: bool,
}

impl ValueCoercer {
    pub fn new(fill_text_nulls: bool, strict: bool) -> Self {
        Self {
            fill_text_nulls,
            strict,
        }
    }

    /// Coerce the cell at (`row`, `column`).
    pub fn coerce(&self, row: usize, column: &ColumnDef, value: &Value) -> Result<Value> {
        let coerced = match coerce_value(value, column.column_type) {
            Some(coerced) => coerced,
            None if self.strict => {
                return Err(SchemaError::ValueCoercion {
                    row,
                    column: column.name.clone(),
                    value_kind: value.kind(),
                    value: value.to_string(),
                    target: column.column_type,
                })
            }
            None => {
                tracing::trace!(
                    row,
                    column = %column.name,
                    kind = value.kind(),
                    "Value does not fit {} column, storing null",
                    column.column_type
                );
                Value::Null
            }
        };

        if coerced.is_null() && self.fill_text_nulls && column.column_type == ColumnType::Text {
            return Ok(Value::Text(String::new()));
        }
        Ok(coerced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_integer_column() {
        let t = ColumnType::Integer;
        assert_eq!(coerce_value(&Value::Integer(5), t), Some(Value::Integer(5)));
        assert_eq!(coerce_value(&Value::Float(4.0), t), Some(Value::Integer(4)));
        assert_eq!(coerce_value(&Value::Float(4.5), t), None);
        assert_eq!(coerce_value(&Value::from(" 12 "), t), Some(Value::Integer(12)));
        assert_eq!(coerce_value(&Value::from("x"), t), None);
        assert_eq!(coerce_value(&Value::from("  "), t), Some(Value::Null));
        assert_eq!(coerce_value(&Value::Date(date(2023, 1, 1)), t), None);
        assert_eq!(coerce_value(&Value::Float(f64::NAN), t), None);
    }

    #[test]
    fn test_float_column() {
        let t = ColumnType::Float;
        assert_eq!(coerce_value(&Value::Integer(2), t), Some(Value::Float(2.0)));
        assert_eq!(coerce_value(&Value::from("3.25"), t), Some(Value::Float(3.25)));
        assert_eq!(coerce_value(&Value::from("x"), t), None);
        assert_eq!(coerce_value(&Value::Null, t), Some(Value::Null));
    }

    #[test]
    fn test_date_column() {
        let t = ColumnType::Date;
        let d = date(2023, 1, 2);
        assert_eq!(coerce_value(&Value::Date(d), t), Some(Value::Date(d)));
        assert_eq!(
            coerce_value(&Value::DateTime(d.and_hms_opt(23, 59, 0).unwrap()), t),
            Some(Value::Date(d))
        );
        assert_eq!(coerce_value(&Value::from("2023-01-02"), t), Some(Value::Date(d)));
        assert_eq!(coerce_value(&Value::from("01/02/2023"), t), Some(Value::Date(d)));
        assert_eq!(coerce_value(&Value::Integer(20230102), t), None);
    }

    #[test]
    fn test_text_column_renders_everything() {
        let t = ColumnType::Text;
        assert_eq!(coerce_value(&Value::Integer(1), t), Some(Value::from("1")));
        assert_eq!(coerce_value(&Value::Float(2.5), t), Some(Value::from("2.5")));
        assert_eq!(
            coerce_value(&Value::Date(date(2023, 1, 1)), t),
            Some(Value::from("2023-01-01"))
        );
        assert_eq!(coerce_value(&Value::from(""), t), Some(Value::from("")));
    }

    #[test]
    fn test_lenient_coercer_nulls_mismatches() {
        let coercer = ValueCoercer::default();
        let column = ColumnDef::new("amount", ColumnType::Float);
        let value = coercer.coerce(1, &column, &Value::from("x")).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_strict_coercer_rejects_mismatches() {
        let coercer = ValueCoercer::new(false, true);
        let column = ColumnDef::new("amount", ColumnType::Float);
        let err = coercer.coerce(1, &column, &Value::from("x")).unwrap_err();
        match err {
            SchemaError::ValueCoercion {
                row,
                column,
                value_kind,
                target,
                ..
            } => {
                assert_eq!(row, 1);
                assert_eq!(column, "amount");
                assert_eq!(value_kind, "text");
                assert_eq!(target, ColumnType::Float);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Missing values are never a strict-mode failure.
        assert_eq!(coercer.coerce(0, &column, &Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_fill_text_nulls() {
        let coercer = ValueCoercer::new(true, false);
        let city = ColumnDef::new("city", ColumnType::Text);
        let id = ColumnDef::new("id", ColumnType::Integer);
        assert_eq!(coercer.coerce(0, &city, &Value::Null).unwrap(), Value::from(""));
        assert_eq!(coercer.coerce(0, &id, &Value::Null).unwrap(), Value::Null);
    }
}

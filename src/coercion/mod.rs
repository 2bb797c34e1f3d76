//! Read-time coercion of document values into declared column kinds
//!
//! [`coerce`] is total: every input/target combination yields a value, and
//! conversions it does not know about hand the input back unchanged so the
//! sink's own typed setter can make the final call.

use crate::models::{ColumnKind, Value};
use tracing::trace;

/// Convert `value` into the representation expected by a column of `kind`.
pub fn coerce(kind: &ColumnKind, value: Value) -> Value {
    match value {
        Value::Null => return Value::Null,
        Value::ObjectId(id) => return Value::String(id.to_string()),
        _ => {}
    }

    match kind {
        ColumnKind::String => match value {
            Value::String(_) => value,
            other => Value::String(other.to_string()),
        },
        ColumnKind::Float64 => match value {
            Value::Int32(i) => Value::Float64(f64::from(i)),
            Value::Float32(f) => Value::Float64(f64::from(f)),
            other => other,
        },
        ColumnKind::Float32 => match value {
            Value::Int32(i) => Value::Float32(i as f32),
            Value::Float64(f) => Value::Float32(f as f32),
            other => other,
        },
        ColumnKind::Int32 => match value {
            Value::Float32(f) => Value::Int32(f as i32),
            Value::Float64(f) => Value::Int32(f as i32),
            other => other,
        },
        ColumnKind::Timestamp => match value {
            Value::Timestamp(ts) => ts.to_datetime().map_or(value, Value::DateTime),
            other => other,
        },
        ColumnKind::Int64 => to_int64(value),
        _ => value,
    }
}

fn to_int64(value: Value) -> Value {
    let parsed = match &value {
        Value::Int32(i) => Some(i64::from(*i)),
        Value::Int64(i) => Some(*i),
        Value::String(s) | Value::Decimal(s) => integral_part(s),
        Value::Float32(_) | Value::Float64(_) => integral_part(&value.to_string()),
        _ => None,
    };
    match parsed {
        Some(i) => Value::Int64(i),
        None => {
            trace!(
                "Leaving {} value unconverted for int64 column",
                value.type_name()
            );
            value
        }
    }
}

/// Integral part of decimal text such as `-12.75`, `1.5E+3` or `0042`.
///
/// Returns `None` for text that is not a finite decimal or whose integral
/// part does not fit in an `i64`.
fn integral_part(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], unsigned[pos + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let digits: String = whole.chars().chain(fraction.chars()).collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(0);
    }
    let leading_zeros = (digits.len() - significant.len()) as i64;
    let point = (whole.len() as i64 - leading_zeros).checked_add(exponent)?;
    if point <= 0 {
        return Some(0);
    }
    if point > 19 {
        return None;
    }

    let point = point as usize;
    let mut integral: String = significant.chars().take(point).collect();
    while integral.len() < point {
        integral.push('0');
    }

    let magnitude: i128 = integral.parse().ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, ObjectId, Timestamp};

    #[test]
    fn test_int64_from_decimal_text() {
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::from("123456789012")),
            Value::Int64(123_456_789_012)
        );
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::Decimal("-42.9".to_string())),
            Value::Int64(-42)
        );
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::Decimal("1.5E+3".to_string())),
            Value::Int64(1500)
        );
        assert_eq!(coerce(&ColumnKind::Int64, Value::Int32(7)), Value::Int64(7));
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::Float64(9.99)),
            Value::Int64(9)
        );
    }

    #[test]
    fn test_int64_leaves_unparseable_values() {
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::from("twelve")),
            Value::from("twelve")
        );
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::from("99999999999999999999")),
            Value::from("99999999999999999999")
        );
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::Bool(true)),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_string_target() {
        assert_eq!(
            coerce(&ColumnKind::String, Value::Int32(42)),
            Value::from("42")
        );
        assert_eq!(
            coerce(&ColumnKind::String, Value::from("x")),
            Value::from("x")
        );
        assert_eq!(
            coerce(&ColumnKind::String, Value::Bool(false)),
            Value::from("false")
        );
    }

    #[test]
    fn test_float_targets() {
        assert_eq!(
            coerce(&ColumnKind::Float32, Value::Int32(42)),
            Value::Float32(42.0)
        );
        assert_eq!(
            coerce(&ColumnKind::Float32, Value::Float64(0.5)),
            Value::Float32(0.5)
        );
        assert_eq!(
            coerce(&ColumnKind::Float64, Value::Float32(0.25)),
            Value::Float64(0.25)
        );
        assert_eq!(
            coerce(&ColumnKind::Float64, Value::Int32(3)),
            Value::Float64(3.0)
        );
        assert_eq!(
            coerce(&ColumnKind::Float64, Value::Int64(3)),
            Value::Int64(3)
        );
    }

    #[test]
    fn test_int32_truncates_toward_zero() {
        assert_eq!(
            coerce(&ColumnKind::Int32, Value::Float64(2.9)),
            Value::Int32(2)
        );
        assert_eq!(
            coerce(&ColumnKind::Int32, Value::Float32(-2.9)),
            Value::Int32(-2)
        );
        assert_eq!(
            coerce(&ColumnKind::Int32, Value::from("2")),
            Value::from("2")
        );
    }

    #[test]
    fn test_timestamp_to_millisecond_instant() {
        let coerced = coerce(
            &ColumnKind::Timestamp,
            Value::Timestamp(Timestamp::new(1_600_000_000, 3)),
        );
        match coerced {
            Value::DateTime(dt) => assert_eq!(dt.timestamp_millis(), 1_600_000_000_000),
            other => panic!("expected a date, got {:?}", other),
        }
    }

    #[test]
    fn test_object_id_and_null() {
        let id = ObjectId::from_bytes([0xab; 12]);
        assert_eq!(
            coerce(&ColumnKind::Int64, Value::ObjectId(id)),
            Value::from("abababababababababababab")
        );
        assert_eq!(coerce(&ColumnKind::String, Value::Null), Value::Null);
    }

    #[test]
    fn test_complex_targets_pass_through() {
        let nested = Value::Document(Document::new().with("a", 1));
        assert_eq!(
            coerce(&ColumnKind::struct_of(Vec::new()), nested.clone()),
            nested
        );
        assert_eq!(
            coerce(&ColumnKind::Boolean, Value::from("yes")),
            Value::from("yes")
        );
    }

    #[test]
    fn test_integral_part_edge_cases() {
        assert_eq!(integral_part("0.0001"), Some(0));
        assert_eq!(integral_part("-0.5"), Some(0));
        assert_eq!(integral_part("12e-1"), Some(1));
        assert_eq!(integral_part("9223372036854775807"), Some(i64::MAX));
        assert_eq!(integral_part("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(integral_part("9223372036854775808"), None);
        assert_eq!(integral_part("."), None);
        assert_eq!(integral_part(""), None);
        assert_eq!(integral_part("NaN"), None);
    }
}

//! Value Conversion Module
//! Normalizes suffixed magnitude strings ("1.2M") and raw cell values to f64.

use polars::prelude::AnyValue;

/// Parse a string carrying an optional magnitude suffix into a float.
///
/// The last character may be one of `k`, `M`, `B` (case-sensitive), scaling
/// the numeric prefix by 1e3/1e6/1e9. Anything unparseable yields NaN:
/// callers treat NaN as "missing", never as an error.
pub fn parse_suffixed_number(value: &str) -> f64 {
    let factor = match value.as_bytes().last() {
        Some(b'k') => Some(1e3),
        Some(b'M') => Some(1e6),
        Some(b'B') => Some(1e9),
        _ => None,
    };

    if let Some(factor) = factor {
        return value[..value.len() - 1]
            .parse::<f64>()
            .map(|n| n * factor)
            .unwrap_or(f64::NAN);
    }

    value.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a value with a `k`/`M`/`B` suffix for display.
///
/// Thresholds are strict-greater: exactly 1000 stays unsuffixed.
pub fn format_magnitude(val: f64) -> String {
    for (threshold, suffix) in [(1e9, "B"), (1e6, "M"), (1e3, "k")] {
        if val > threshold {
            return format!("{:.2}{}", val / threshold, suffix);
        }
    }
    val.to_string()
}

/// Normalize a raw cell to f64. Strings go through the suffix parser,
/// numerics are widened, nulls and anything else become NaN.
pub fn any_value_to_f64(value: &AnyValue) -> f64 {
    match value {
        AnyValue::Null => f64::NAN,
        AnyValue::String(s) => parse_suffixed_number(s),
        AnyValue::StringOwned(s) => parse_suffixed_number(s.as_str()),
        AnyValue::Float64(v) => *v,
        AnyValue::Float32(v) => *v as f64,
        AnyValue::Int64(v) => *v as f64,
        AnyValue::Int32(v) => *v as f64,
        AnyValue::Int16(v) => *v as f64,
        AnyValue::Int8(v) => *v as f64,
        AnyValue::UInt64(v) => *v as f64,
        AnyValue::UInt32(v) => *v as f64,
        AnyValue::UInt16(v) => *v as f64,
        AnyValue::UInt8(v) => *v as f64,
        _ => f64::NAN,
    }
}

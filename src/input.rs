//! Conversion of user text into process values for writing.

use crate::error::ClientError;
use serde_json::{Number, Value};

/// Parses `text` as a value of the same type as `current`.
///
/// Numbers, strings and booleans are supported; writing other types from
/// text is refused.
pub fn parse_value_for(current: &Value, text: &str) -> Result<Value, ClientError> {
    match current {
        Value::Number(current) => {
            let n = parse_number(text)
                .ok_or_else(|| ClientError::InvalidValue(format!("not a number: {}", text)))?;
            if current.is_f64() {
                return Number::from_f64(n).map(Value::Number).ok_or_else(|| {
                    ClientError::InvalidValue(format!("not a finite number: {}", text))
                });
            }
            Ok(integral_number(n))
        }
        Value::String(_) => Ok(Value::String(text.to_string())),
        Value::Bool(_) => parse_bool(text)
            .map(Value::Bool)
            .ok_or_else(|| ClientError::InvalidValue(format!("not a boolean: {}", text))),
        other => Err(ClientError::InvalidValue(format!(
            "writing values of type {} is not supported",
            type_name(other)
        ))),
    }
}

/// Integer targets keep integer notation for whole numbers.
fn integral_number(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else if n.fract() == 0.0 && n >= 0.0 && n < u64::MAX as f64 {
        Value::from(n as u64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts plain notation (`-12.5`, `1e3`) and German notation with `.`
/// grouping and `,` decimals (`1.234,5`).
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(n) = parse_german_number(text) {
        return Some(n);
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_german_number(text: &str) -> Option<f64> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once(',') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let groups: Vec<&str> = int_part.split('.').collect();
    let valid_int = if groups.len() == 1 {
        all_digits(groups[0])
    } else {
        (1..=3).contains(&groups[0].len())
            && all_digits(groups[0])
            && groups[1..].iter().all(|g| g.len() == 3 && all_digits(g))
    };
    // plain "12.5" is left to the plain parser
    if !valid_int || (frac_part.is_none() && groups.len() == 1) {
        return None;
    }

    let mut normalized = groups.concat();
    if let Some(frac) = frac_part {
        normalized.push('.');
        normalized.push_str(frac);
    }
    let n: f64 = normalized.parse().ok()?;
    Some(if text.starts_with('-') { -n } else { n })
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

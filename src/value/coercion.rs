//! Primitive conversions between scripting values and host values.
use crate::{
    error::BridgeError,
    types::ValueKind,
    value::{Hint, HostValue, ScriptObjectOps, ScriptValue},
};

pub fn to_boolean(value: &ScriptValue) -> bool {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => false,
        ScriptValue::Bool(b) => *b,
        ScriptValue::Int(i) => *i != 0,
        ScriptValue::Float(f) => !(f.is_nan() || *f == 0.0),
        ScriptValue::Str(s) => !s.is_empty(),
        ScriptValue::Array(_) | ScriptValue::Object(_) => true,
    }
}

pub fn to_number(value: &ScriptValue) -> f64 {
    match value {
        ScriptValue::Undefined => f64::NAN,
        ScriptValue::Null => 0.0,
        ScriptValue::Bool(b) => f64::from(u8::from(*b)),
        ScriptValue::Int(i) => *i as f64,
        ScriptValue::Float(f) => *f,
        ScriptValue::Str(s) => parse_number(s),
        ScriptValue::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        ScriptValue::Object(o) => match o.default_value(Hint::Number) {
            ScriptValue::Object(_) => f64::NAN,
            primitive => to_number(&primitive),
        },
    }
}

/// Parses numeric text the way the scripting runtime does: surrounding
/// whitespace is ignored, empty text is zero, garbage is NaN.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    // Rust accepts "inf" and "nan" spellings the runtime does not.
    if text.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn number_to_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub fn to_text(value: &ScriptValue) -> String {
    match value {
        ScriptValue::Undefined => "undefined".to_string(),
        ScriptValue::Null => "null".to_string(),
        ScriptValue::Bool(b) => b.to_string(),
        ScriptValue::Int(i) => i.to_string(),
        ScriptValue::Float(f) => number_to_text(*f),
        ScriptValue::Str(s) => s.clone(),
        ScriptValue::Array(items) => items
            .iter()
            .map(|item| if item.is_nullish() { String::new() } else { to_text(item) })
            .collect::<Vec<_>>()
            .join(","),
        ScriptValue::Object(o) => match o.default_value(Hint::String) {
            ScriptValue::Object(_) => format!("[object {}]", o.class_name()),
            primitive => to_text(&primitive),
        },
    }
}

/// ECMAScript `ToInt32`: truncate, then wrap modulo 2^32.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    wrapped as u32 as i32
}

/// `ToInt64` counterpart of [`to_int32`], saturating at the i64 range.
pub fn to_int64(n: f64) -> i64 {
    if n.is_finite() {
        n.trunc() as i64
    } else {
        0
    }
}

fn coercion_error(value: &ScriptValue, kind: &ValueKind) -> BridgeError {
    BridgeError::Coercion {
        from: value.type_name().to_string(),
        to: kind.to_string(),
    }
}

/// Converts a scripting value that is not an instance adapter into the
/// host value a parameter of kind `kind` expects.
pub fn native_to_host(value: &ScriptValue, kind: &ValueKind) -> Result<HostValue, BridgeError> {
    let converted = match kind {
        ValueKind::Script => HostValue::Script(value.clone()),
        ValueKind::Void | ValueKind::Null => HostValue::Null,
        ValueKind::Bool => HostValue::Bool(to_boolean(value)),
        ValueKind::Int => HostValue::Int(to_int32(to_number(value))),
        ValueKind::Long => match value {
            ScriptValue::Int(i) => HostValue::Long(*i),
            other => HostValue::Long(to_int64(to_number(other))),
        },
        ValueKind::Double => HostValue::Double(to_number(value)),
        ValueKind::Char => {
            let text = to_text(value);
            let first = text.chars().next().ok_or_else(|| coercion_error(value, kind))?;
            HostValue::Char(first)
        }
        ValueKind::String => match value {
            ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
            other => HostValue::Str(to_text(other)),
        },
        ValueKind::Array => match value {
            ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
            ScriptValue::Array(items) => HostValue::Array(
                items
                    .iter()
                    .map(|item| native_to_host(item, &ValueKind::Any))
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(coercion_error(value, kind)),
        },
        ValueKind::Object(_) => match value {
            ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
            _ => return Err(coercion_error(value, kind)),
        },
        ValueKind::Any => match value {
            ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
            ScriptValue::Bool(b) => HostValue::Bool(*b),
            ScriptValue::Int(i) => match i32::try_from(*i) {
                Ok(small) => HostValue::Int(small),
                Err(_) => HostValue::Long(*i),
            },
            ScriptValue::Float(f) => HostValue::Double(*f),
            ScriptValue::Str(s) => HostValue::Str(s.clone()),
            ScriptValue::Array(items) => HostValue::Array(
                items
                    .iter()
                    .map(|item| native_to_host(item, &ValueKind::Any))
                    .collect::<Result<_, _>>()?,
            ),
            ScriptValue::Object(_) => HostValue::Script(value.clone()),
        },
    };
    Ok(converted)
}

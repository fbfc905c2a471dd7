//! The dynamic [`Value`] union carried inside every [`crate::Record`].
//!
//! Values are cheap to clone: numeric variants are `Copy`, and the string/map/sequence variants
//! are reference-counted-free but kept small by construction (Records, not Values, are expected
//! to own the larger payloads).

use std::fmt;

/// An ordered string→string mapping, as produced by `SPLIT` results, config coercion, and
/// Modbus/MQTT property rendering.
pub type OrderedMap = Vec<(String, String)>;

/// An ordered sequence of strings.
pub type OrderedSeq = Vec<String>;

/// Tagged union of every value shape that can cross a Record's `get`/`set` boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 64-bit IEEE-754 float.
    Double(f64),
    /// A string, which may carry arbitrary (non-UTF-8) bytes, e.g. a raw MQTT payload.
    Str(Vec<u8>),
    /// An ordered string→string mapping.
    Map(OrderedMap),
    /// An ordered sequence of strings.
    Seq(OrderedSeq),
}

impl Value {
    /// Construct a UTF-8 string value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into().into_bytes())
    }

    /// Construct a binary string value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Str(b.into())
    }

    /// Coerce to `i32`, falling back to `default` if the value cannot be narrowed or parsed.
    pub fn to_int(&self, default: i32) -> i32 {
        match self {
            Value::Int32(v) => *v,
            Value::UInt32(v) => i32::try_from(*v).unwrap_or(default),
            Value::Int64(v) => i32::try_from(*v).unwrap_or(default),
            Value::UInt64(v) => i32::try_from(*v).unwrap_or(default),
            Value::Double(v) => {
                if v.is_finite() && *v >= i32::MIN as f64 && *v <= i32::MAX as f64 {
                    *v as i32
                } else {
                    default
                }
            }
            Value::Str(_) => parse_number_str(&self.to_string())
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or(default),
            Value::Map(_) | Value::Seq(_) => default,
        }
    }

    /// Coerce to `u32`, falling back to `default`.
    pub fn to_uint(&self, default: u32) -> u32 {
        match self {
            Value::UInt32(v) => *v,
            Value::Int32(v) => u32::try_from(*v).unwrap_or(default),
            Value::Int64(v) => u32::try_from(*v).unwrap_or(default),
            Value::UInt64(v) => u32::try_from(*v).unwrap_or(default),
            Value::Double(v) => {
                if v.is_finite() && *v >= 0.0 && *v <= u32::MAX as f64 {
                    *v as u32
                } else {
                    default
                }
            }
            Value::Str(_) => parse_number_str(&self.to_string())
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(default),
            Value::Map(_) | Value::Seq(_) => default,
        }
    }

    /// Coerce to `i64`, falling back to `default`.
    pub fn to_i64(&self, default: i64) -> i64 {
        match self {
            Value::Int32(v) => *v as i64,
            Value::UInt32(v) => *v as i64,
            Value::Int64(v) => *v,
            Value::UInt64(v) => i64::try_from(*v).unwrap_or(default),
            Value::Double(v) => {
                if v.is_finite() && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    *v as i64
                } else {
                    default
                }
            }
            Value::Str(_) => parse_number_str(&self.to_string()).unwrap_or(default),
            Value::Map(_) | Value::Seq(_) => default,
        }
    }

    /// Coerce to `u64`, falling back to `default`.
    pub fn to_u64(&self, default: u64) -> u64 {
        match self {
            Value::Int32(v) => u64::try_from(*v).unwrap_or(default),
            Value::UInt32(v) => *v as u64,
            Value::Int64(v) => u64::try_from(*v).unwrap_or(default),
            Value::UInt64(v) => *v,
            Value::Double(v) => {
                if v.is_finite() && *v >= 0.0 && *v <= u64::MAX as f64 {
                    *v as u64
                } else {
                    default
                }
            }
            Value::Str(_) => parse_number_str(&self.to_string())
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(default),
            Value::Map(_) | Value::Seq(_) => default,
        }
    }

    /// Coerce to `f64`, falling back to `default`.
    pub fn to_double(&self, default: f64) -> f64 {
        match self {
            Value::Int32(v) => *v as f64,
            Value::UInt32(v) => *v as f64,
            Value::Int64(v) => *v as f64,
            Value::UInt64(v) => *v as f64,
            Value::Double(v) => *v,
            Value::Str(_) => self.to_string().parse().unwrap_or(default),
            Value::Map(_) | Value::Seq(_) => default,
        }
    }

    /// Coerce to an ordered map; scalars and sequences yield an empty map.
    pub fn to_map(&self) -> OrderedMap {
        match self {
            Value::Map(m) => m.clone(),
            Value::Str(_) => parse_map_literal(&self.to_string()).unwrap_or_default(),
            _ => OrderedMap::new(),
        }
    }

    /// Coerce to an ordered sequence; scalars and maps yield an empty sequence.
    pub fn to_vec(&self) -> OrderedSeq {
        match self {
            Value::Seq(s) => s.clone(),
            Value::Str(_) => parse_seq_literal(&self.to_string()).unwrap_or_default(),
            _ => OrderedSeq::new(),
        }
    }

    /// Raw bytes backing a `Str` value; empty for every other variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Str(b) => b,
            _ => &[],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Map(m) => write!(f, "{}", render_map(m)),
            Value::Seq(s) => write!(f, "{}", render_seq(s)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into_bytes())
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer, with an optional leading `-`.
fn parse_number_str(s: &str) -> Option<i64> {
    let s = s.trim();
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Render an ordered map as a JSON-like literal: `{"k":"v","k2":"v2"}`.
pub fn render_map(map: &OrderedMap) -> String {
    let mut out = String::from("{");
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(k);
        out.push_str("\":\"");
        out.push_str(v);
        out.push('"');
    }
    out.push('}');
    out
}

/// Render an ordered sequence as a JSON-like literal: `["a","b"]`.
pub fn render_seq(seq: &OrderedSeq) -> String {
    let mut out = String::from("[");
    for (i, v) in seq.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(v);
        out.push('"');
    }
    out.push(']');
    out
}

/// Parse a `{"k":"v",...}` literal back into an ordered map. Values/keys may not contain `"` or
/// `,`, matching the round-trip guarantee in the spec.
pub fn parse_map_literal(s: &str) -> Option<OrderedMap> {
    let s = s.trim();
    if !(s.starts_with('{') && s.ends_with('}')) {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    if inner.is_empty() {
        return Some(OrderedMap::new());
    }
    let mut out = OrderedMap::new();
    for entry in inner.split(',') {
        let mut parts = entry.splitn(2, ':');
        let k = unquote(parts.next()?)?;
        let v = unquote(parts.next()?)?;
        out.push((k, v));
    }
    Some(out)
}

/// Parse a `["a","b",...]` literal back into an ordered sequence.
pub fn parse_seq_literal(s: &str) -> Option<OrderedSeq> {
    let s = s.trim();
    if !(s.starts_with('[') && s.ends_with(']')) {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    if inner.is_empty() {
        return Some(OrderedSeq::new());
    }
    inner.split(',').map(unquote).collect()
}

fn unquote(s: &str) -> Option<String> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        Some(s[1..s.len() - 1].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercions_narrow_or_fall_back() {
        assert_eq!(Value::Int64(42).to_int(-1), 42);
        assert_eq!(Value::Int64(i64::MAX).to_int(-1), -1);
        assert_eq!(Value::UInt32(7).to_u64(0), 7);
    }

    #[test]
    fn string_to_number_radix() {
        assert_eq!(Value::str("0x2A").to_int(0), 42);
        assert_eq!(Value::str("-3").to_int(0), -3);
        assert_eq!(Value::str("012").to_int(0), 12);
    }

    #[test]
    fn map_and_vec_round_trip() {
        let map = vec![("k".to_string(), "v".to_string())];
        let rendered = render_map(&map);
        assert_eq!(rendered, "{\"k\":\"v\"}");
        assert_eq!(parse_map_literal(&rendered).unwrap(), map);

        let seq = vec!["a".to_string(), "b".to_string()];
        let rendered = render_seq(&seq);
        assert_eq!(rendered, "[\"a\",\"b\"]");
        assert_eq!(parse_seq_literal(&rendered).unwrap(), seq);
    }

    #[test]
    fn value_to_map_and_vec_via_string() {
        let v = Value::str("{\"a\":\"1\"}");
        assert_eq!(v.to_map(), vec![("a".to_string(), "1".to_string())]);

        let v = Value::str("[\"x\",\"y\"]");
        assert_eq!(v.to_vec(), vec!["x".to_string(), "y".to_string()]);
    }
}

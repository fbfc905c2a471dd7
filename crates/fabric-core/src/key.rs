//! The key protocol: a small expression language Translators use to pull [`Value`]s out of a
//! [`crate::Record`] (§3.3).

use thiserror::Error;

use crate::Value;

/// A parsed key expression.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyExpr {
    /// A quoted string literal, e.g. `"topic"`.
    Literal(String),
    /// A bare numeric literal, e.g. `0`, `-3`, `0x2A`.
    Number(String),
    /// The Record's `own_id`.
    Uuid,
    /// The Record's `source_record_id`.
    SourceDatagramId,
    /// The Record's `source_name`.
    SourcePlag,
    /// `SPLIT(inner, sep)`, optionally indexed with `.N` (1-based).
    Split {
        inner: Box<KeyExpr>,
        sep: String,
        index: Option<usize>,
    },
    /// Any other bare identifier: a variant-specific field name.
    Field(String),
}

/// Errors raised while parsing or evaluating a key expression.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    /// `SPLIT(...)` had no matching closing bracket.
    #[error("unmatched bracket in key expression {0:?}")]
    UnmatchedBracket(String),
    /// `SPLIT(...)` had no top-level comma separating its two arguments.
    #[error("missing comma in SPLIT expression {0:?}")]
    MissingComma(String),
    /// `SPLIT(...).N` named an index outside the split's bounds.
    #[error("split index {index} out of range (have {len} elements)")]
    IndexOutOfRange {
        /// The 1-based index that was requested.
        index: usize,
        /// The number of elements the split produced.
        len: usize,
    },
    /// The named field does not exist on this Record variant.
    #[error("unknown key {0:?}")]
    UnknownField(String),
}

/// Parse a key expression string into a [`KeyExpr`].
///
/// Mirrors the bracket/quote/escape-aware scanner used by the original implementation's
/// `getData`: a single top-level bracket match, nested parens allowed inside `inner`, and a
/// top-level comma (outside of any quoted literal) separating `inner` from `sep`.
pub fn parse(key: &str) -> Result<KeyExpr, KeyError> {
    let trimmed = key.trim();

    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return Ok(KeyExpr::Literal(trimmed[1..trimmed.len() - 1].to_string()));
    }

    if trimmed
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-')
        .unwrap_or(false)
    {
        return Ok(KeyExpr::Number(trimmed.to_string()));
    }

    if let Some(rest) = trimmed.strip_prefix("SPLIT(") {
        return parse_split(rest, trimmed);
    }

    match trimmed {
        "uuid" => Ok(KeyExpr::Uuid),
        "sourceDatagramId" => Ok(KeyExpr::SourceDatagramId),
        "sourcePlag" => Ok(KeyExpr::SourcePlag),
        other => Ok(KeyExpr::Field(other.to_string())),
    }
}

fn parse_split(rest: &str, whole: &str) -> Result<KeyExpr, KeyError> {
    let mut depth: i32 = 0;
    let mut in_literal = false;
    let mut escaping = false;
    let mut comma_pos: Option<usize> = None;
    let mut close_pos: Option<usize> = None;

    for (i, c) in rest.char_indices() {
        if escaping {
            escaping = false;
            continue;
        }
        match c {
            '"' => in_literal = !in_literal,
            '\\' if in_literal => escaping = true,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal && depth > 0 => depth -= 1,
            ')' if !in_literal => {
                close_pos = Some(i);
                break;
            }
            ',' if !in_literal && depth == 0 && comma_pos.is_none() => comma_pos = Some(i),
            _ => {}
        }
    }

    let close_pos = close_pos.ok_or_else(|| KeyError::UnmatchedBracket(whole.to_string()))?;
    let comma_pos = comma_pos.ok_or_else(|| KeyError::MissingComma(whole.to_string()))?;

    let inner_str = &rest[..comma_pos];
    let sep_str = rest[comma_pos + 1..close_pos].trim();
    let sep = unquote(sep_str);

    let inner = parse(inner_str)?;

    let after = &rest[close_pos + 1..];
    let index = after
        .strip_prefix('.')
        .and_then(|n| n.parse::<usize>().ok());

    Ok(KeyExpr::Split {
        inner: Box::new(inner),
        sep,
        index,
    })
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Evaluate a parsed [`KeyExpr`] against a set of accessor callbacks, matching the semantics a
/// `Record::get` implementation must provide for the base keys; variant-specific `Field` lookups
/// are delegated to `field`.
pub fn eval(
    expr: &KeyExpr,
    uuid: &str,
    source_record_id: u64,
    source_name: &str,
    field: &mut dyn FnMut(&str) -> Result<Value, KeyError>,
) -> Result<Value, KeyError> {
    match expr {
        KeyExpr::Literal(s) => Ok(Value::str(s.clone())),
        KeyExpr::Number(s) => Ok(Value::str(s.clone())),
        KeyExpr::Uuid => Ok(Value::str(uuid.to_string())),
        KeyExpr::SourceDatagramId => Ok(Value::UInt64(source_record_id)),
        KeyExpr::SourcePlag => Ok(Value::str(source_name.to_string())),
        KeyExpr::Field(name) => field(name),
        KeyExpr::Split { inner, sep, index } => {
            let value = eval(inner, uuid, source_record_id, source_name, field)?;
            let parts: Vec<String> = value
                .to_string()
                .split(sep.as_str())
                .map(|s| s.to_string())
                .collect();
            match index {
                Some(n) if *n >= 1 && *n <= parts.len() => Ok(Value::str(parts[*n - 1].clone())),
                Some(n) => Err(KeyError::IndexOutOfRange {
                    index: *n,
                    len: parts.len(),
                }),
                None => Ok(Value::Seq(parts)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fields(name: &str) -> Result<Value, KeyError> {
        Err(KeyError::UnknownField(name.to_string()))
    }

    #[test]
    fn parses_base_keys() {
        assert_eq!(parse("uuid").unwrap(), KeyExpr::Uuid);
        assert_eq!(parse("sourceDatagramId").unwrap(), KeyExpr::SourceDatagramId);
        assert_eq!(parse("sourcePlag").unwrap(), KeyExpr::SourcePlag);
        assert_eq!(parse("topic").unwrap(), KeyExpr::Field("topic".to_string()));
        assert_eq!(
            parse("\"literal\"").unwrap(),
            KeyExpr::Literal("literal".to_string())
        );
    }

    #[test]
    fn split_without_index_returns_vector() {
        let expr = parse("SPLIT(topic,\"/\")").unwrap();
        let mut field = |name: &str| -> Result<Value, KeyError> {
            assert_eq!(name, "topic");
            Ok(Value::str("a/b/c"))
        };
        let v = eval(&expr, "u", 0, "src", &mut field).unwrap();
        assert_eq!(
            v,
            Value::Seq(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn split_with_index_returns_element() {
        let expr = parse("SPLIT(topic,\"/\").2").unwrap();
        let mut field = |_: &str| -> Result<Value, KeyError> { Ok(Value::str("a/b/c")) };
        let v = eval(&expr, "u", 0, "src", &mut field).unwrap();
        assert_eq!(v, Value::str("b"));
    }

    #[test]
    fn split_index_out_of_range_is_key_error() {
        let expr = parse("SPLIT(topic,\"/\").9").unwrap();
        let mut field = |_: &str| -> Result<Value, KeyError> { Ok(Value::str("a/b")) };
        let err = eval(&expr, "u", 0, "src", &mut field).unwrap_err();
        assert_eq!(
            err,
            KeyError::IndexOutOfRange {
                index: 9,
                len: 2
            }
        );
    }

    #[test]
    fn nested_parens_allowed_in_inner() {
        let expr = parse("SPLIT(SPLIT(topic,\"/\").1,\",\")").unwrap();
        match expr {
            KeyExpr::Split { inner, sep, index } => {
                assert_eq!(sep, ",");
                assert_eq!(index, None);
                assert!(matches!(*inner, KeyExpr::Split { .. }));
            }
            _ => panic!("expected nested split"),
        }
    }

    #[test]
    fn missing_comma_is_key_error() {
        let err = parse("SPLIT(topic)").unwrap_err();
        assert!(matches!(err, KeyError::MissingComma(_)));
    }

    #[test]
    fn missing_close_is_key_error() {
        let err = parse("SPLIT(topic,\"/\"").unwrap_err();
        assert!(matches!(err, KeyError::UnmatchedBracket(_)));
    }

    #[test]
    fn unknown_field_propagates() {
        let expr = parse("bogus").unwrap();
        let mut field = no_fields;
        let err = eval(&expr, "u", 0, "src", &mut field).unwrap_err();
        assert_eq!(err, KeyError::UnknownField("bogus".to_string()));
    }
}

//! Typed coercion helpers layered on top of the raw `(section, key) -> &str` lookup, so nothing
//! outside this crate ever sees the underlying file format (§9 design note).

use crate::errors::ConfigError;
use crate::Config;

fn parse_i64(raw: &str) -> Option<i64> {
    let (neg, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

/// Typed lookups built on [`Config::get`]. Blanket-implemented for every `Config`, so callers
/// reach for these instead of parsing `get`'s raw string themselves.
pub trait ConfigExt: Config {
    fn require(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.get(section, key).ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    fn get_str<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key).unwrap_or(default)
    }

    fn get_i64(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.get(section, key) {
            None => Ok(default),
            Some(raw) => parse_i64(raw).ok_or_else(|| ConfigError::Uncoercible {
                section: section.to_string(),
                key: key.to_string(),
                raw: raw.to_string(),
                reason: "not an integer".to_string(),
            }),
        }
    }

    fn require_i64(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        let raw = self.require(section, key)?;
        parse_i64(raw).ok_or_else(|| ConfigError::Uncoercible {
            section: section.to_string(),
            key: key.to_string(),
            raw: raw.to_string(),
            reason: "not an integer".to_string(),
        })
    }

    fn get_u16(&self, section: &str, key: &str, default: u16) -> Result<u16, ConfigError> {
        match self.get(section, key) {
            None => Ok(default),
            Some(raw) => {
                let v = parse_i64(raw).ok_or_else(|| ConfigError::Uncoercible {
                    section: section.to_string(),
                    key: key.to_string(),
                    raw: raw.to_string(),
                    reason: "not an integer".to_string(),
                })?;
                u16::try_from(v).map_err(|_| ConfigError::Uncoercible {
                    section: section.to_string(),
                    key: key.to_string(),
                    raw: raw.to_string(),
                    reason: "out of range for u16".to_string(),
                })
            }
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(section, key) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Uncoercible {
                    section: section.to_string(),
                    key: key.to_string(),
                    raw: raw.to_string(),
                    reason: "not a boolean".to_string(),
                }),
            },
        }
    }
}

impl<T: Config + ?Sized> ConfigExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IniConfig;

    #[test]
    fn hex_and_decimal_and_negative() {
        let cfg = IniConfig::parse("[a]\nh = 0x2A\nd = 42\nn = -7\n").unwrap();
        assert_eq!(cfg.get_i64("a", "h", 0).unwrap(), 42);
        assert_eq!(cfg.get_i64("a", "d", 0).unwrap(), 42);
        assert_eq!(cfg.get_i64("a", "n", 0).unwrap(), -7);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let cfg = IniConfig::parse("[a]\n").unwrap();
        assert!(cfg.require("a", "nope").is_err());
    }

    #[test]
    fn u16_out_of_range_is_uncoercible() {
        let cfg = IniConfig::parse("[a]\nport = 99999\n").unwrap();
        assert!(cfg.get_u16("a", "port", 0).is_err());
    }

    #[test]
    fn bool_variants() {
        let cfg = IniConfig::parse("[a]\nx = Yes\ny = 0\n").unwrap();
        assert!(cfg.get_bool("a", "x", false).unwrap());
        assert!(!cfg.get_bool("a", "y", true).unwrap());
    }
}

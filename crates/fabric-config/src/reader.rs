//! The INI-like reader itself (§6.1). Kept deliberately dumb: bracket sections, `key = value`
//! pairs, `#`/`;` comments, nothing else. Dotted keys (`endpoint[1].method`) are just strings as
//! far as this reader is concerned — the dots carry meaning to callers, not to us.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

const UNSECTIONED: &str = "";

/// A parsed config file: `(section, key) -> value`. Sections and keys keep first-write order
/// within a `BTreeMap` only incidentally (alphabetic); nothing here depends on iteration order.
#[derive(Debug, Default, Clone)]
pub struct IniConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniConfig {
    /// Parse `text` into a config. Unsectioned keys (before the first `[...]` header) land in an
    /// implicit `""` section.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current = UNSECTIONED.to_string();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ConfigError::Malformed {
                    line: line_no,
                    message: "unterminated section header".into(),
                })?;
                current = name.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Malformed {
                line: line_no,
                message: "expected `key = value`".into(),
            })?;
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(IniConfig { sections })
    }

    /// Read and parse a config file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Malformed {
            line: 0,
            message: format!("reading {}: {e}", path.display()),
        })?;
        Self::parse(&text)
    }

    /// Raw string lookup; `None` when the section or key is absent.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Names of every section that appeared in the file (the implicit `""` section included only
    /// if it received at least one key).
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Sections whose name starts with `prefix` — how multiple instances of the same adapter kind
    /// (`mqtt.broker1`, `mqtt.broker2`, ...) are discovered.
    pub fn sections_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.sections
            .keys()
            .map(String::as_str)
            .filter(move |name| name.starts_with(prefix))
    }

    /// Every key defined in `section`, in no particular order beyond the `BTreeMap`'s own. Lets a
    /// caller pick out keys matching a dynamic prefix (e.g. `rewrite.*` in a `[translator.*]`
    /// section) without knowing them ahead of time.
    pub fn keys_in<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a str> {
        self.sections.get(section).into_iter().flat_map(|m| m.keys().map(String::as_str))
    }
}

fn strip_comment(line: &str) -> &str {
    for (i, c) in line.char_indices() {
        if c == '#' || c == ';' {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let cfg = IniConfig::parse(
            "[mqtt]\nversion = 4\nendpoint[1].method = publish\n\n[modbus]\ntype = tcpClient\n",
        )
        .unwrap();
        assert_eq!(cfg.get("mqtt", "version"), Some("4"));
        assert_eq!(cfg.get("mqtt", "endpoint[1].method"), Some("publish"));
        assert_eq!(cfg.get("modbus", "type"), Some("tcpClient"));
        assert_eq!(cfg.get("modbus", "missing"), None);
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let cfg = IniConfig::parse("[a]\n# a comment\nkey = value ; trailing\n").unwrap();
        assert_eq!(cfg.get("a", "key"), Some("value"));
    }

    #[test]
    fn unsectioned_keys_land_in_empty_section() {
        let cfg = IniConfig::parse("key = value\n[a]\nother = 1\n").unwrap();
        assert_eq!(cfg.get("", "key"), Some("value"));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let err = IniConfig::parse("[a]\nnotkeyvalue\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 2, .. }));
    }

    #[test]
    fn sections_with_prefix_finds_instances() {
        let cfg = IniConfig::parse("[mqtt.broker1]\nhost=a\n[mqtt.broker2]\nhost=b\n[modbus]\n").unwrap();
        let mut names: Vec<_> = cfg.sections_with_prefix("mqtt.").collect();
        names.sort();
        assert_eq!(names, vec!["mqtt.broker1", "mqtt.broker2"]);
    }
}

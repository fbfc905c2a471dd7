//! [`MapRecord`]: a plain string→string bag, used by Translators with no native protocol and as
//! the fallback target variant for adapters that don't need a richer shape (§3.2).

use fabric_core::{get_base_field, BaseRecord, KeyError, Record, RecordKind, Value};

#[derive(Debug, Clone)]
pub struct MapRecord {
    base: BaseRecord,
    fields: Vec<(String, String)>,
}

impl MapRecord {
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        MapRecord {
            base: BaseRecord::new(source_name, source_record_id),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl Record for MapRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Map
    }

    fn base(&self) -> &BaseRecord {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRecord {
        &mut self.base
    }

    fn get_field(&self, key: &str) -> Result<Value, KeyError> {
        if let Some(v) = get_base_field(&self.base, key) {
            return Ok(v);
        }
        self.field(key)
            .map(|v| Value::str(v.to_string()))
            .ok_or_else(|| KeyError::UnknownField(key.to_string()))
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError> {
        if key == "sourceDatagramId" {
            self.base.set_source_record_id(value.to_u64(0));
            return Ok(());
        }
        let rendered = value.to_string();
        if let Some(entry) = self.fields.iter_mut().find(|(k, _)| k == key) {
            entry.1 = rendered;
        } else {
            self.fields.push((key.to_string(), rendered));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut r = MapRecord::new("adapter-a", 0);
        r.set_field("greeting", Value::str("hello")).unwrap();
        assert_eq!(r.get_field("greeting").unwrap(), Value::str("hello"));
    }

    #[test]
    fn unknown_field_is_key_error() {
        let r = MapRecord::new("adapter-a", 0);
        assert!(r.get_field("nope").is_err());
    }

    #[test]
    fn base_fields_resolve_before_custom_fields() {
        let r = MapRecord::new("adapter-a", 0);
        assert_eq!(r.get_field("sourcePlag").unwrap(), Value::str("adapter-a"));
    }
}

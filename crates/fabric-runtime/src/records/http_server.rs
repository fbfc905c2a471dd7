//! [`HttpServerRecord`]: the `(endpoint, method)` request/response shape the HTTP-server adapter
//! contract names (§6.5). The adapter itself is a stub (embedded scripting is out of scope); this
//! Record exists so the fabric can route through it like any other protocol.

use fabric_core::{get_base_field, BaseRecord, KeyError, OrderedMap, Record, RecordKind, Value};

#[derive(Debug, Clone, Default)]
pub struct HttpServerFields {
    pub endpoint: String,
    pub method: String,
    pub headers: OrderedMap,
    pub params: OrderedMap,
    pub content: Vec<u8>,
    pub http_version: String,
    pub status: u32,
}

#[derive(Debug, Clone)]
pub struct HttpServerRecord {
    base: BaseRecord,
    pub fields: HttpServerFields,
}

impl HttpServerRecord {
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        HttpServerRecord {
            base: BaseRecord::new(source_name, source_record_id),
            fields: HttpServerFields::default(),
        }
    }
}

impl Record for HttpServerRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::HttpServer
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
        match key {
            "endpoint" => Ok(Value::str(self.fields.endpoint.clone())),
            "method" => Ok(Value::str(self.fields.method.clone())),
            "headers" => Ok(Value::Map(self.fields.headers.clone())),
            "params" => Ok(Value::Map(self.fields.params.clone())),
            "content" => Ok(Value::bytes(self.fields.content.clone())),
            "http_version" => Ok(Value::str(self.fields.http_version.clone())),
            "status" => Ok(Value::UInt32(self.fields.status)),
            other => Err(KeyError::UnknownField(other.to_string())),
        }
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError> {
        match key {
            "sourceDatagramId" => self.base.set_source_record_id(value.to_u64(0)),
            "endpoint" => self.fields.endpoint = value.to_string(),
            "method" => self.fields.method = value.to_string(),
            "headers" => self.fields.headers = value.to_map(),
            "params" => self.fields.params = value.to_map(),
            "content" => self.fields.content = value.as_bytes().to_vec(),
            "http_version" => self.fields.http_version = value.to_string(),
            "status" => self.fields.status = value.to_uint(0),
            other => return Err(KeyError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_and_method_round_trip() {
        let mut r = HttpServerRecord::new("http-1", 0);
        r.set_field("endpoint", Value::str("/status")).unwrap();
        r.set_field("method", Value::str("GET")).unwrap();
        assert_eq!(r.get_field("endpoint").unwrap(), Value::str("/status"));
        assert_eq!(r.get_field("method").unwrap(), Value::str("GET"));
    }
}

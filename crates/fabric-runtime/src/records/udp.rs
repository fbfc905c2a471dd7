//! [`UdpRecord`]: a raw datagram payload. The UDP adapter's socket plumbing is out of scope
//! (§1 Non-goals); this Record is what a stub adapter exchanges with the rest of the fabric.

use fabric_core::{get_base_field, BaseRecord, KeyError, Record, RecordKind, Value};

#[derive(Debug, Clone, Default)]
pub struct UdpFields {
    pub peer_addr: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UdpRecord {
    base: BaseRecord,
    pub fields: UdpFields,
}

impl UdpRecord {
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        UdpRecord {
            base: BaseRecord::new(source_name, source_record_id),
            fields: UdpFields::default(),
        }
    }
}

impl Record for UdpRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Udp
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
            "peer_addr" => Ok(Value::str(self.fields.peer_addr.clone())),
            "payload" => Ok(Value::bytes(self.fields.payload.clone())),
            other => Err(KeyError::UnknownField(other.to_string())),
        }
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError> {
        match key {
            "sourceDatagramId" => self.base.set_source_record_id(value.to_u64(0)),
            "peer_addr" => self.fields.peer_addr = value.to_string(),
            "payload" => self.fields.payload = value.as_bytes().to_vec(),
            other => return Err(KeyError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips() {
        let mut r = UdpRecord::new("udp-1", 0);
        r.set_field("payload", Value::bytes(b"ping".to_vec())).unwrap();
        assert_eq!(r.get_field("payload").unwrap(), Value::bytes(b"ping".to_vec()));
    }
}

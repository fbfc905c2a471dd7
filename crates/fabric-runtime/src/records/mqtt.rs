//! [`MqttRecord`]: the PUBLISH/SUBSCRIBE/UNSUBSCRIBE payload shape an MQTT Adapter exchanges with
//! the rest of the fabric (§4.1 "PUBLISH ingress" / "Outgoing Record → MQTT").

use fabric_core::{get_base_field, BaseRecord, KeyError, Record, RecordKind, Value};

#[derive(Debug, Clone, Default)]
pub struct MqttFields {
    pub action: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
    pub dup: bool,
}

#[derive(Debug, Clone)]
pub struct MqttRecord {
    base: BaseRecord,
    pub fields: MqttFields,
}

impl MqttRecord {
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        MqttRecord {
            base: BaseRecord::new(source_name, source_record_id),
            fields: MqttFields::default(),
        }
    }

    pub fn publish(source_name: impl Into<String>, topic: impl Into<String>, payload: Vec<u8>, qos: u8, retain: bool) -> Self {
        let mut rec = MqttRecord::new(source_name, 0);
        rec.fields.action = "publish".to_string();
        rec.fields.topic = topic.into();
        rec.fields.payload = payload;
        rec.fields.qos = qos;
        rec.fields.retain = retain;
        rec
    }
}

impl Record for MqttRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Mqtt
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
            "action" => Ok(Value::str(self.fields.action.clone())),
            "topic" => Ok(Value::str(self.fields.topic.clone())),
            "payload" => Ok(Value::bytes(self.fields.payload.clone())),
            "qos" => Ok(Value::UInt32(self.fields.qos as u32)),
            "retain" => Ok(Value::UInt32(self.fields.retain as u32)),
            "dup" => Ok(Value::UInt32(self.fields.dup as u32)),
            other => Err(KeyError::UnknownField(other.to_string())),
        }
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError> {
        match key {
            "sourceDatagramId" => self.base.set_source_record_id(value.to_u64(0)),
            "action" => self.fields.action = value.to_string(),
            "topic" => self.fields.topic = value.to_string(),
            "payload" => self.fields.payload = value.as_bytes().to_vec(),
            "qos" => self.fields.qos = value.to_uint(0) as u8,
            "retain" => self.fields.retain = value.to_uint(0) != 0,
            "dup" => self.fields.dup = value.to_uint(0) != 0,
            other => return Err(KeyError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_fields_round_trip() {
        let rec = MqttRecord::publish("mqtt-1", "sensors/temp", b"21.5".to_vec(), 1, false);
        assert_eq!(rec.get_field("action").unwrap(), Value::str("publish"));
        assert_eq!(rec.get_field("topic").unwrap(), Value::str("sensors/temp"));
        assert_eq!(rec.get_field("qos").unwrap(), Value::UInt32(1));
    }

    #[test]
    fn unknown_field_errors() {
        let rec = MqttRecord::new("mqtt-1", 0);
        assert!(rec.get_field("register").is_err());
    }
}

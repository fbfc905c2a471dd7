//! [`ModbusRecord`]: one register (or coil) observation/write, per the emit policy in §4.2 ("For
//! each register in a multi-register read, emit one Record `{function_code, register_address,
//! value}`").

use fabric_core::{get_base_field, BaseRecord, KeyError, Record, RecordKind, Value};

#[derive(Debug, Clone, Default)]
pub struct ModbusFields {
    pub function_code: u8,
    pub register_address: u16,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct ModbusRecord {
    base: BaseRecord,
    pub fields: ModbusFields,
}

impl ModbusRecord {
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        ModbusRecord {
            base: BaseRecord::new(source_name, source_record_id),
            fields: ModbusFields::default(),
        }
    }

    pub fn reading(source_name: impl Into<String>, function_code: u8, register_address: u16, value: f64) -> Self {
        let mut rec = ModbusRecord::new(source_name, 0);
        rec.fields = ModbusFields {
            function_code,
            register_address,
            value,
        };
        rec
    }
}

impl Record for ModbusRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Modbus
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
            "function_code" => Ok(Value::UInt32(self.fields.function_code as u32)),
            "register" | "register_address" => Ok(Value::UInt32(self.fields.register_address as u32)),
            "value" => Ok(Value::Double(self.fields.value)),
            other => Err(KeyError::UnknownField(other.to_string())),
        }
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError> {
        match key {
            "sourceDatagramId" => self.base.set_source_record_id(value.to_u64(0)),
            "function_code" => self.fields.function_code = value.to_uint(0) as u8,
            "register" | "register_address" => self.fields.register_address = value.to_uint(0) as u16,
            "value" => self.fields.value = value.to_double(0.0),
            other => return Err(KeyError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_round_trips() {
        let rec = ModbusRecord::reading("modbus-1", 0x03, 100, 42.0);
        assert_eq!(rec.get_field("function_code").unwrap(), Value::UInt32(0x03));
        assert_eq!(rec.get_field("register").unwrap(), Value::UInt32(100));
        assert_eq!(rec.get_field("value").unwrap(), Value::Double(42.0));
    }
}

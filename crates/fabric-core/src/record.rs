//! The polymorphic [`Record`] entity (§3.2) and its immutable identity fields.

use std::time::Instant;

use chrono::Utc;
use md5::{Digest, Md5};

use crate::key::KeyError;
use crate::Value;

/// The protocol tag a concrete Record variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A plain string→string bag, used by translators with no native protocol.
    Map,
    /// MQTT PUBLISH/SUBSCRIBE/UNSUBSCRIBE payload.
    Mqtt,
    /// Modbus register read/write payload.
    Modbus,
    /// HTTP-server request/response payload.
    HttpServer,
    /// UDP datagram payload.
    Udp,
}

/// Fields every Record carries regardless of protocol variant.
#[derive(Debug, Clone)]
pub struct BaseRecord {
    source_name: String,
    own_id: String,
    source_record_id: u64,
    created_at: Instant,
}

impl BaseRecord {
    /// Construct a new Record's base fields, computing `own_id` as the MD5 of
    /// `source_name ∥ source_record_id ∥ iso_time ∥ microsecond_remainder`, per §3.2.
    pub fn new(source_name: impl Into<String>, source_record_id: u64) -> Self {
        let source_name = source_name.into();
        let now = Utc::now();
        let iso = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let micros_remainder = now.timestamp_subsec_micros() % 1_000_000;

        let mut feed = String::with_capacity(source_name.len() + 48);
        feed.push_str(&source_name);
        feed.push_str(&source_record_id.to_string());
        feed.push_str(&iso);
        feed.push_str(&micros_remainder.to_string());

        let digest = Md5::digest(feed.as_bytes());
        let own_id = digest.iter().map(|b| format!("{b:02x}")).collect();

        BaseRecord {
            source_name,
            own_id,
            source_record_id,
            created_at: Instant::now(),
        }
    }

    /// The originating Adapter's name.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The 32-character hex MD5 digest identifying this Record.
    pub fn own_id(&self) -> &str {
        &self.own_id
    }

    /// The `own_id` of the Record this one was translated from, or 0 if newly created.
    pub fn source_record_id(&self) -> u64 {
        self.source_record_id
    }

    /// Overwrite `source_record_id`; the only mutable base field (`set("sourceDatagramId", ...)`).
    pub fn set_source_record_id(&mut self, id: u64) {
        self.source_record_id = id;
    }

    /// When this Record was constructed, as a monotonic instant.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// Uniform interface every Record variant implements: the key protocol's get/set dispatch plus
/// the immutable identity accessors.
pub trait Record {
    /// The protocol variant this Record carries.
    fn kind(&self) -> RecordKind;

    /// Shared identity fields.
    fn base(&self) -> &BaseRecord;

    /// Mutable access to the shared identity fields (for `set("sourceDatagramId", ...)`).
    fn base_mut(&mut self) -> &mut BaseRecord;

    /// Resolve a single key-protocol field name to a [`Value`] (§3.3). Implementations should
    /// check their own variant-specific fields first, then fall back to [`get_base_field`].
    fn get_field(&self, key: &str) -> Result<Value, KeyError>;

    /// Write a single variant-specific field. Implementations should check
    /// `"sourceDatagramId"` first via [`BaseRecord::set_source_record_id`], then their own
    /// fields.
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), KeyError>;
}

/// Derive the `source_record_id` a translated Record should carry from its parent's `own_id`
/// (a 32-hex-char MD5 digest): the first 8 bytes, read as a big-endian `u64`. Lossy, but the
/// lineage link only needs to be traceable back through the log, not reversible.
pub fn own_id_to_source_record_id(own_id: &str) -> u64 {
    u64::from_str_radix(&own_id[..16.min(own_id.len())], 16).unwrap_or(0)
}

/// The base-field portion of `get`, shared by every Record variant's `get_field` fallback.
pub fn get_base_field(base: &BaseRecord, key: &str) -> Option<Value> {
    match key {
        "uuid" => Some(Value::str(base.own_id().to_string())),
        "sourceDatagramId" => Some(Value::UInt64(base.source_record_id())),
        "sourcePlag" => Some(Value::str(base.source_name().to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_id_is_32_hex_chars() {
        let base = BaseRecord::new("adapter-a", 0);
        assert_eq!(base.own_id().len(), 32);
        assert!(base.own_id().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn two_records_get_distinct_ids() {
        let a = BaseRecord::new("adapter-a", 0);
        let b = BaseRecord::new("adapter-a", 0);
        assert_ne!(a.own_id(), b.own_id());
    }

    #[test]
    fn own_id_to_source_record_id_is_deterministic() {
        let base = BaseRecord::new("adapter-a", 0);
        let a = own_id_to_source_record_id(base.own_id());
        let b = own_id_to_source_record_id(base.own_id());
        assert_eq!(a, b);
    }

    #[test]
    fn source_record_id_mutable() {
        let mut base = BaseRecord::new("adapter-a", 0);
        assert_eq!(base.source_record_id(), 0);
        base.set_source_record_id(42);
        assert_eq!(base.source_record_id(), 42);
    }
}

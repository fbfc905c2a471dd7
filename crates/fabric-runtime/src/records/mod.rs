//! Concrete [`fabric_core::Record`] variants, one per protocol tag in [`fabric_core::RecordKind`].

mod http_server;
mod map;
mod modbus;
mod mqtt;
mod udp;

pub use http_server::{HttpServerFields, HttpServerRecord};
pub use map::MapRecord;
pub use modbus::{ModbusFields, ModbusRecord};
pub use mqtt::{MqttFields, MqttRecord};
pub use udp::{UdpFields, UdpRecord};

//! Concrete `Adapter` implementations, one per protocol (§4.3).

mod http_server;
mod modbus;
mod mqtt;
mod udp;

pub use http_server::HttpServerAdapter;
pub use modbus::{ModbusAdapter, ModbusAdapterConfig, PollRequest};
pub use mqtt::{MqttAdapter, MqttAdapterConfig};
pub use udp::UdpAdapter;

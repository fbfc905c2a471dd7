//! The MQTT protocol works by exchanging a series of MQTT Control Packets in a defined way.
//!
//! This crate describes the format of these packets, a framer that pulls complete packets out of
//! a byte stream, and the blocking client state machine (§4.1) that drives a [`fabric_transport`]
//! connection through `Disconnected → TcpConnecting → MqttConnecting → Connected`.
#![warn(missing_docs)]

#[macro_use]
extern crate bitflags;

mod client;
mod decode;
mod encode;
mod errors;
mod packet;
mod retry;

pub use crate::client::{Client, Event, Options, State};
pub use crate::decode::parse;
pub use crate::encode::WriteTo;
pub use crate::errors::MqttError;
pub use crate::packet::*;
pub use crate::retry::RetryTable;

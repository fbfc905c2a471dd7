//! Parse and protocol errors the client state machine can raise (§7, "Protocol parse error").

use thiserror::Error;

use fabric_transport::TransportError;

/// Everything that can go wrong while framing, decoding, or driving an MQTT connection.
#[derive(Debug, Error)]
pub enum MqttError {
    /// The transport underneath the client failed or timed out.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A complete frame was decoded but its bytes are not a valid MQTT packet.
    #[error("malformed MQTT packet: {0}")]
    Malformed(String),

    /// The CONNACK reason code was non-zero; the connection was refused.
    #[error("connection refused: reason 0x{0:02x}")]
    ConnectRefused(u8),

    /// A packet arrived that is not legal in the client's current state (e.g. PUBLISH before
    /// CONNACK).
    #[error("unexpected packet type in state {state}")]
    UnexpectedPacket {
        /// The state the client was in when the packet arrived.
        state: &'static str,
    },

    /// No reply to CONNECT, or no traffic at all, within `2 * keep_alive` seconds.
    #[error("keep-alive timeout: no data received in {0}s")]
    KeepAliveTimeout(u64),
}

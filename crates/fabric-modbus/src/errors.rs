//! Errors the Modbus codec can raise while framing or dispatching a PDU.

use thiserror::Error;

/// Everything that can go wrong decoding a Modbus frame.
#[derive(Debug, Error, PartialEq)]
pub enum ModbusError {
    /// The frame named a function code this codec does not recognise, and the exception bit was
    /// not set. Fatal for the connection per §7 ("unknown in a position where a known is
    /// required").
    #[error("unknown function code 0x{0:02x}")]
    UnknownFunctionCode(u8),

    /// Fewer bytes were available than the function code's PDU table entry requires.
    #[error("PDU too short: need at least {need} bytes, got {got}")]
    PduTooShort {
        /// Minimum bytes the function code requires.
        need: usize,
        /// Bytes actually present.
        got: usize,
    },

    /// A serial frame's CRC did not match its payload.
    #[error("CRC mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    CrcMismatch {
        /// CRC carried on the wire.
        expected: u16,
        /// CRC computed over the received bytes.
        computed: u16,
    },

    /// A serial frame's slave id did not match the adapter's configured id; the frame is not an
    /// error, merely not addressed to us.
    #[error("frame addressed to slave {0}, not ours")]
    NotOurSlave(u8),

    /// The peer replied with a Modbus exception.
    #[error("exception 0x{code:02x} for function 0x{function:02x}")]
    Exception {
        /// The function code the exception responds to (exception bit stripped).
        function: u8,
        /// The Modbus exception code.
        code: u8,
    },
}

//! Modbus Application Protocol codec: PDU framing, function-code dispatch, pending-request
//! tracking, and the word/byte-swap scalar decoding a polling adapter needs (§4.2).

mod errors;
mod frame;
mod function;
mod pending;
mod value;

pub use errors::ModbusError;
pub use frame::{crc16, decode_response_pdu, encode_request, DecodedPdu, RequestPayload, SerialFrame};
pub use function::{FunctionCode, EXCEPTION_BIT};
pub use pending::{PendingQueue, PendingRequest, UNKNOWN_BASE};
pub use value::{coil_bit, decode_scalar, DataType, ScalarError, SwapPolicy};

//! Multi-register scalar decoding with the configurable word/byte-swap policy (§4.2).

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// A Modbus data-point type. `Float16` is declared per the type table but not decoded; reading
/// one yields [`ScalarError::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Single coil/discrete-input bit.
    Bool,
    /// Signed 16-bit, one register.
    Int16,
    /// Unsigned 16-bit, one register.
    UInt16,
    /// Signed 32-bit, two registers.
    Int32,
    /// Unsigned 32-bit, two registers.
    UInt32,
    /// IEEE-754 half precision, two registers. Declared, not decoded.
    Float16,
    /// IEEE-754 single precision, two registers.
    Float32,
    /// IEEE-754 double precision, four registers.
    Float64,
}

impl DataType {
    /// How many 16-bit registers this type occupies on the wire.
    pub fn register_count(self) -> usize {
        match self {
            DataType::Bool | DataType::Int16 | DataType::UInt16 => 1,
            DataType::Int32 | DataType::UInt32 | DataType::Float16 | DataType::Float32 => 2,
            DataType::Float64 => 4,
        }
    }
}

/// The word/byte ordering applied to multi-register scalars (§4.2 "Word/byte-swap policy").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapPolicy {
    /// Reverse the order of the 16-bit words before interpreting bytes.
    pub words_swapped: bool,
    /// Within each word, swap the two bytes.
    pub bytes_swapped: bool,
}

impl SwapPolicy {
    /// Apply the configured swaps to `regs` (already in wire/big-endian order), word-swap first,
    /// then byte-swap, returning the resulting byte stream in the order it should be interpreted.
    pub fn apply(self, regs: &[u16]) -> Vec<u8> {
        let mut words: Vec<u16> = regs.to_vec();
        if self.words_swapped {
            words.reverse();
        }

        let mut bytes = Vec::with_capacity(words.len() * 2);
        for w in words {
            let mut buf = [0u8; 2];
            BigEndian::write_u16(&mut buf, w);
            if self.bytes_swapped {
                buf.swap(0, 1);
            }
            bytes.extend_from_slice(&buf);
        }
        bytes
    }
}

/// Errors decoding a scalar out of a register block.
#[derive(Debug, Error, PartialEq)]
pub enum ScalarError {
    /// Fewer registers were supplied than `data_type` requires.
    #[error("need {need} registers for {data_type:?}, got {got}")]
    NotEnoughRegisters {
        /// Registers the type requires.
        need: usize,
        /// Registers actually supplied.
        got: usize,
        /// The type being decoded.
        data_type: DataType,
    },
    /// `Float16` was requested; its decoding is not implemented.
    #[error("Float16 decoding is not implemented")]
    Unsupported,
}

/// Decode `regs` (raw wire-order 16-bit registers) as `data_type` under `swap`.
pub fn decode_scalar(data_type: DataType, regs: &[u16], swap: SwapPolicy) -> Result<f64, ScalarError> {
    let need = data_type.register_count();
    if regs.len() < need {
        return Err(ScalarError::NotEnoughRegisters {
            need,
            got: regs.len(),
            data_type,
        });
    }

    let bytes = swap.apply(&regs[..need]);

    Ok(match data_type {
        DataType::Bool => (regs[0] != 0) as u8 as f64,
        DataType::Int16 => BigEndian::read_i16(&bytes) as f64,
        DataType::UInt16 => BigEndian::read_u16(&bytes) as f64,
        DataType::Int32 => BigEndian::read_i32(&bytes) as f64,
        DataType::UInt32 => BigEndian::read_u32(&bytes) as f64,
        DataType::Float16 => return Err(ScalarError::Unsupported),
        DataType::Float32 => BigEndian::read_f32(&bytes) as f64,
        DataType::Float64 => BigEndian::read_f64(&bytes),
    })
}

/// Extract coil bit `n` from a coil-block PDU, per the spec-correct (not the original source's
/// 16-bit-word) convention: byte `5 + n/8`, bit `n mod 8` within that byte, `1 << bit_pos`.
pub fn coil_bit(pdu: &[u8], n: usize) -> Option<bool> {
    let byte_index = 5 + n / 8;
    let bit_pos = n % 8;
    pdu.get(byte_index).map(|b| (b & (1 << bit_pos)) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint16_no_swap() {
        let regs = [0x1234];
        assert_eq!(
            decode_scalar(DataType::UInt16, &regs, SwapPolicy::default()).unwrap(),
            0x1234 as f64
        );
    }

    #[test]
    fn int32_word_swap_matches_manual_recombination() {
        // Wire order: high word 0x0001, low word 0x0000 -> value 1 once words are swapped back.
        let regs = [0x0001, 0x0000];
        let swap = SwapPolicy {
            words_swapped: true,
            bytes_swapped: false,
        };
        assert_eq!(decode_scalar(DataType::Int32, &regs, swap).unwrap(), 1.0);
    }

    #[test]
    fn byte_swap_within_word() {
        let regs = [0x3412];
        let swap = SwapPolicy {
            words_swapped: false,
            bytes_swapped: true,
        };
        assert_eq!(
            decode_scalar(DataType::UInt16, &regs, swap).unwrap(),
            0x1234 as f64
        );
    }

    #[test]
    fn float32_round_trip() {
        let mut regs = [0u16; 2];
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, 3.5);
        regs[0] = BigEndian::read_u16(&buf[0..2]);
        regs[1] = BigEndian::read_u16(&buf[2..4]);
        assert_eq!(
            decode_scalar(DataType::Float32, &regs, SwapPolicy::default()).unwrap(),
            3.5
        );
    }

    #[test]
    fn not_enough_registers_is_an_error() {
        let regs = [0x0001];
        let err = decode_scalar(DataType::Int32, &regs, SwapPolicy::default()).unwrap_err();
        assert!(matches!(err, ScalarError::NotEnoughRegisters { need: 2, got: 1, .. }));
    }

    #[test]
    fn coil_bit_uses_1_shl_bitpos_not_source_convention() {
        // byte 5 = 0b0000_0010 -> bit 1 set, matching coil index 1.
        let mut pdu = vec![0u8; 6];
        pdu[5] = 0b0000_0010;
        assert_eq!(coil_bit(&pdu, 0), Some(false));
        assert_eq!(coil_bit(&pdu, 1), Some(true));
    }
}

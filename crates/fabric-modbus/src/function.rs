//! Function-code dispatch table (§4.2 "Function codes").

/// Bit OR'd into a function code to mark an exception reply.
pub const EXCEPTION_BIT: u8 = 0x80;

/// A recognised Modbus function code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read Coils
    ReadCoil = 0x01,
    /// Read Discrete Inputs
    ReadInput = 0x02,
    /// Read Holding Registers
    ReadHoldingRegister = 0x03,
    /// Read Input Registers
    ReadInputRegister = 0x04,
    /// Write Single Coil
    WriteSingleCoil = 0x05,
    /// Write Single Register
    WriteSingleRegister = 0x06,
    /// Read Exception Status
    ReadException = 0x07,
    /// Diagnostics
    Diagnostics = 0x08,
    /// Get Com Event Counter
    GetComCounter = 0x0B,
    /// Get Com Event Log
    GetComLog = 0x0C,
    /// Write Multiple Coils
    WriteCoils = 0x0F,
    /// Write Multiple Registers
    WriteRegisters = 0x10,
    /// Report Server ID
    ReportServerId = 0x11,
    /// Read File Record
    ReadFile = 0x14,
    /// Write File Record
    WriteFile = 0x15,
    /// Mask Write Register
    MaskWriteRegister = 0x16,
    /// Read/Write Multiple Registers
    ReadWriteRegisters = 0x17,
    /// Read FIFO Queue
    ReadFifo = 0x18,
    /// Encapsulated Interface Transport
    Encapsulated = 0x2B,
}

impl FunctionCode {
    /// Map a raw wire byte (exception bit already stripped) to a known function code.
    pub fn from_u8(b: u8) -> Option<Self> {
        use FunctionCode::*;
        Some(match b {
            0x01 => ReadCoil,
            0x02 => ReadInput,
            0x03 => ReadHoldingRegister,
            0x04 => ReadInputRegister,
            0x05 => WriteSingleCoil,
            0x06 => WriteSingleRegister,
            0x07 => ReadException,
            0x08 => Diagnostics,
            0x0B => GetComCounter,
            0x0C => GetComLog,
            0x0F => WriteCoils,
            0x10 => WriteRegisters,
            0x11 => ReportServerId,
            0x14 => ReadFile,
            0x15 => WriteFile,
            0x16 => MaskWriteRegister,
            0x17 => ReadWriteRegisters,
            0x18 => ReadFifo,
            0x2B => Encapsulated,
            _ => return None,
        })
    }

    /// Fixed request-PDU length in bytes (excluding the function-code byte itself), or `None`
    /// when the length depends on a count embedded in the PDU (`0x0F`/`0x10`/`0x14`/`0x15`).
    pub fn fixed_request_len(self) -> Option<usize> {
        use FunctionCode::*;
        match self {
            ReadCoil | ReadInput | ReadHoldingRegister | ReadInputRegister | WriteSingleCoil
            | WriteSingleRegister | GetComCounter => Some(4),
            ReadException | GetComLog | ReportServerId => Some(0),
            MaskWriteRegister => Some(6),
            ReadFifo => Some(2),
            WriteCoils | WriteRegisters | ReadFile | WriteFile | ReadWriteRegisters => None,
            Diagnostics | Encapsulated => None,
        }
    }

    /// Fixed response-PDU length in bytes (excluding the function-code byte), or `None` when it
    /// depends on a byte-count field inside the response.
    pub fn fixed_response_len(self) -> Option<usize> {
        use FunctionCode::*;
        match self {
            WriteSingleCoil | WriteSingleRegister | GetComCounter | MaskWriteRegister => Some(4),
            ReadException => Some(1),
            ReadCoil | ReadInput | ReadHoldingRegister | ReadInputRegister | GetComLog
            | ReportServerId | WriteCoils | WriteRegisters | ReadFile | WriteFile
            | ReadWriteRegisters | ReadFifo => None,
            Diagnostics | Encapsulated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_listed_code() {
        for code in [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0B, 0x0C, 0x0F, 0x10, 0x11, 0x14,
            0x15, 0x16, 0x17, 0x18, 0x2B,
        ] {
            assert!(FunctionCode::from_u8(code).is_some(), "fc {code:#04x}");
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(FunctionCode::from_u8(0x09).is_none());
    }
}

//! The Modbus Adapter: a TCP Modbus master. Polls a configured list of register ranges on a
//! fixed cycle, emits one [`ModbusRecord`] per register/coil in each response, and turns ingress
//! write Records into WRITE_SINGLE_*/WRITE_* requests (§4.2, §4.3).
//!
//! MBAP header handling lives here rather than in `fabric-modbus`: the codec's framing boundary
//! assumes a transport that already strips it (§4.2 "Framing"), but [`TcpTransport`] is a plain
//! byte pipe, so the adapter parses/builds the 7-byte MBAP header itself before handing the PDU
//! to the codec.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ByteOrder};

use fabric_core::{Record, RecordKind};
use fabric_modbus::{
    decode_response_pdu, encode_request, FunctionCode, ModbusError, PendingQueue, PendingRequest,
    RequestPayload,
};
use fabric_transport::{Transport, TcpTransport};

use crate::adapter::{Adapter, AdapterCore};
use crate::errors::AdapterError;
use crate::records::ModbusRecord;
use crate::translator::Translator;

/// One entry in the adapter's poll cycle: "read `quantity` registers/coils starting at `address`
/// with `function_code`".
#[derive(Debug, Clone, Copy)]
pub struct PollRequest {
    pub function_code: FunctionCode,
    pub address: u16,
    pub quantity: u16,
}

pub struct ModbusAdapterConfig {
    pub server_addr: String,
    pub unit_id: u8,
    pub poll_list: Vec<PollRequest>,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
}

struct ModbusState {
    transport: TcpTransport,
    inbuf: Vec<u8>,
    pending: PendingQueue,
    next_transaction_id: u16,
    poll_index: usize,
    last_poll: Instant,
}

pub struct ModbusAdapter {
    core: AdapterCore,
    state: Mutex<ModbusState>,
    unit_id: u8,
    poll_list: Vec<PollRequest>,
    poll_interval: Duration,
    connect_timeout: Duration,
}

fn mbap_frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 7 {
        return None;
    }
    let length = BigEndian::read_u16(&buf[4..6]) as usize;
    let total = 6 + length;
    if buf.len() < total {
        None
    } else {
        Some(total)
    }
}

fn build_mbap_request(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(7 + pdu.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes()); // protocol id: always 0 for Modbus
    frame.extend_from_slice(&((1 + pdu.len()) as u16).to_be_bytes());
    frame.push(unit_id);
    frame.extend_from_slice(pdu);
    frame
}

impl ModbusAdapter {
    pub fn new(name: impl Into<String>, plag_id: u64, cfg: ModbusAdapterConfig) -> Self {
        let transport = TcpTransport::new(cfg.server_addr, fabric_transport::DEFAULT_RECV_TIMEOUT);
        ModbusAdapter {
            core: AdapterCore::new(name, plag_id),
            state: Mutex::new(ModbusState {
                transport,
                inbuf: Vec::new(),
                pending: PendingQueue::tcp(),
                next_transaction_id: 1,
                poll_index: 0,
                last_poll: Instant::now() - cfg.poll_interval,
            }),
            unit_id: cfg.unit_id,
            poll_list: cfg.poll_list,
            poll_interval: cfg.poll_interval,
            connect_timeout: cfg.connect_timeout,
        }
    }

    fn send_request(&self, state: &mut ModbusState, function_code: FunctionCode, address: u16, payload: RequestPayload, count: u16) -> bool {
        let transaction_id = state.next_transaction_id;
        state.next_transaction_id = state.next_transaction_id.wrapping_add(1).max(1);

        let pdu = encode_request(function_code, address, payload);
        let frame = build_mbap_request(transaction_id, self.unit_id, &pdu);

        match state.transport.send(&frame) {
            Ok(()) => {
                state.pending.push(
                    transaction_id,
                    PendingRequest {
                        register_base: address,
                        register_count: count,
                        function_code,
                    },
                );
                true
            }
            Err(e) => {
                log::warn!("{}: send failed: {e}", self.core.name());
                state.transport.disconnect();
                false
            }
        }
    }

    fn poll_next(&self, state: &mut ModbusState) -> bool {
        if self.poll_list.is_empty() || state.last_poll.elapsed() < self.poll_interval {
            return false;
        }
        let req = self.poll_list[state.poll_index];
        state.poll_index = (state.poll_index + 1) % self.poll_list.len();
        state.last_poll = Instant::now();
        self.send_request(state, req.function_code, req.address, RequestPayload::ReadQuantity(req.quantity), req.quantity)
    }

    fn drain_one_ingress(&self, state: &mut ModbusState) -> bool {
        let Some(record) = self.core.ingress.pop() else {
            return false;
        };

        let address = record.get_field("register").map(|v| v.to_uint(0) as u16).unwrap_or(0);
        let value = record.get_field("value").map(|v| v.to_double(0.0)).unwrap_or(0.0);
        let fc = record.get_field("function_code").map(|v| v.to_uint(0) as u8).unwrap_or(FunctionCode::WriteSingleRegister as u8);

        let Some(function_code) = FunctionCode::from_u8(fc) else {
            log::warn!("{}: ingress record named unknown function code {fc:#04x}; dropping", self.core.name());
            return true;
        };

        let payload = match function_code {
            FunctionCode::WriteSingleCoil => RequestPayload::WriteSingleCoil(value != 0.0),
            _ => RequestPayload::WriteSingleRegister(value as i64 as u16),
        };
        self.send_request(state, function_code, address, payload, 1);
        true
    }

    fn process_inbound(&self, state: &mut ModbusState) -> bool {
        let available = state.transport.available_bytes();
        if available > 0 {
            match state.transport.peek_and_recv(available) {
                Ok(chunk) if !chunk.is_empty() => state.inbuf.extend_from_slice(&chunk),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("{}: recv failed: {e}", self.core.name());
                    state.transport.disconnect();
                    return false;
                }
            }
        }

        let mut progressed = false;
        while let Some(total) = mbap_frame_len(&state.inbuf) {
            let frame: Vec<u8> = state.inbuf.drain(..total).collect();
            let transaction_id = BigEndian::read_u16(&frame[0..2]);
            let pdu = &frame[7..];

            match decode_response_pdu(pdu) {
                Ok(decoded) => {
                    let pending = state.pending.take(transaction_id, decoded.function_code);
                    self.emit_records(&decoded, pending);
                    progressed = true;
                }
                Err(ModbusError::Exception { function, code }) => {
                    log::warn!("{}: exception 0x{code:02x} for function 0x{function:02x}", self.core.name());
                }
                Err(e) => {
                    log::error!("{}: fatal protocol error, reconnecting: {e}", self.core.name());
                    state.transport.disconnect();
                    state.inbuf.clear();
                    break;
                }
            }
        }
        progressed
    }

    fn emit_records(&self, decoded: &fabric_modbus::DecodedPdu, pending: PendingRequest) {
        let fc = decoded.function_code as u8;
        if !decoded.registers.is_empty() {
            for (i, reg) in decoded.registers.iter().enumerate() {
                let address = pending.register_base.wrapping_add(i as u16);
                let record = ModbusRecord::reading(self.core.name(), fc, address, *reg as f64);
                self.core.distributor.dispatch(&record);
            }
        }
        for (i, coil) in decoded.coils.iter().enumerate() {
            let address = pending.register_base.wrapping_add(i as u16);
            let record = ModbusRecord::reading(self.core.name(), fc, address, if *coil { 1.0 } else { 0.0 });
            self.core.distributor.dispatch(&record);
        }
    }
}

impl Adapter for ModbusAdapter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn plag_id(&self) -> u64 {
        self.core.plag_id()
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Modbus
    }

    fn init(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap();
        state.transport.connect(self.connect_timeout)?;
        Ok(())
    }

    fn step(&self) -> bool {
        let mut state = self.state.lock().unwrap();

        if !state.transport.is_connected() {
            return match state.transport.connect(self.connect_timeout) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("{}: reconnect failed: {e}", self.core.name());
                    false
                }
            };
        }

        let mut progressed = self.process_inbound(&mut state);
        progressed |= self.poll_next(&mut state);
        progressed |= self.drain_one_ingress(&mut state);
        progressed
    }

    fn stop(&self) {
        self.core.stop();
        self.state.lock().unwrap().transport.disconnect();
    }

    fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    fn enqueue(&self, record: Box<dyn Record + Send>) {
        self.core.ingress.push(record);
    }

    fn new_record(&self, source_record_id: u64) -> Box<dyn Record + Send> {
        Box::new(ModbusRecord::new(self.core.name(), source_record_id))
    }

    fn attach_translator(&self, translator: Translator) {
        self.core.distributor.attach(translator);
    }
}

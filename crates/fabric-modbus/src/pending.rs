//! Pending-request tracking so a response PDU can recover the register base it answers (§4.2
//! "Pending-request tracking", resolving an Open Question in §9).

use std::collections::{HashMap, VecDeque};

use crate::function::FunctionCode;

/// A register read/write issued but not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    /// First register address the request touched.
    pub register_base: u16,
    /// Number of registers/coils the request touched.
    pub register_count: u16,
    /// The function code the request was issued under.
    pub function_code: FunctionCode,
}

/// Register base used when a response arrives with no matching pending request.
pub const UNKNOWN_BASE: u16 = 0xFFFF;

/// Tracks in-flight requests: FIFO order for serial (one link, strictly ordered replies), keyed
/// by MBAP transaction id for TCP (replies may interleave transaction ids).
pub enum PendingQueue {
    /// Serial link: a single ordered queue.
    Serial(VecDeque<PendingRequest>),
    /// TCP: keyed by MBAP transaction identifier.
    Tcp(HashMap<u16, PendingRequest>),
}

impl PendingQueue {
    /// A fresh serial-mode queue.
    pub fn serial() -> Self {
        PendingQueue::Serial(VecDeque::new())
    }

    /// A fresh TCP-mode queue.
    pub fn tcp() -> Self {
        PendingQueue::Tcp(HashMap::new())
    }

    /// Record a request just sent. `transaction_id` is ignored in serial mode.
    pub fn push(&mut self, transaction_id: u16, request: PendingRequest) {
        match self {
            PendingQueue::Serial(queue) => queue.push_back(request),
            PendingQueue::Tcp(map) => {
                map.insert(transaction_id, request);
            }
        }
    }

    /// Pop/look up the request a response answers, falling back to [`UNKNOWN_BASE`]/the
    /// response's own function code when none is tracked (§4.2 emit policy).
    pub fn take(&mut self, transaction_id: u16, response_fc: FunctionCode) -> PendingRequest {
        let found = match self {
            PendingQueue::Serial(queue) => queue.pop_front(),
            PendingQueue::Tcp(map) => map.remove(&transaction_id),
        };

        found.unwrap_or(PendingRequest {
            register_base: UNKNOWN_BASE,
            register_count: 0,
            function_code: response_fc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_queue_is_fifo() {
        let mut q = PendingQueue::serial();
        q.push(
            0,
            PendingRequest {
                register_base: 10,
                register_count: 2,
                function_code: FunctionCode::ReadHoldingRegister,
            },
        );
        q.push(
            0,
            PendingRequest {
                register_base: 20,
                register_count: 4,
                function_code: FunctionCode::ReadHoldingRegister,
            },
        );

        let first = q.take(0, FunctionCode::ReadHoldingRegister);
        assert_eq!(first.register_base, 10);
        let second = q.take(0, FunctionCode::ReadHoldingRegister);
        assert_eq!(second.register_base, 20);
    }

    #[test]
    fn tcp_queue_keys_by_transaction_id() {
        let mut q = PendingQueue::tcp();
        q.push(
            7,
            PendingRequest {
                register_base: 100,
                register_count: 1,
                function_code: FunctionCode::ReadCoil,
            },
        );

        let req = q.take(7, FunctionCode::ReadCoil);
        assert_eq!(req.register_base, 100);
    }

    #[test]
    fn unmatched_response_falls_back_to_unknown_base() {
        let mut q = PendingQueue::tcp();
        let req = q.take(99, FunctionCode::ReadCoil);
        assert_eq!(req.register_base, UNKNOWN_BASE);
        assert_eq!(req.register_count, 0);
    }
}

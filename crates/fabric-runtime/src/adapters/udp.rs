//! A stub UDP Adapter: the datagram socket plumbing is out of scope (§1 Non-goals). Like
//! [`crate::adapters::http_server::HttpServerAdapter`], this is a pass-through `enqueue` ->
//! Distributor shape that satisfies the `Adapter` trait so the fabric can route through a UDP
//! endpoint in tests and topology wiring.

use fabric_core::{Record, RecordKind};

use crate::adapter::{Adapter, AdapterCore};
use crate::errors::AdapterError;
use crate::records::UdpRecord;
use crate::translator::Translator;

pub struct UdpAdapter {
    core: AdapterCore,
}

impl UdpAdapter {
    pub fn new(name: impl Into<String>, plag_id: u64) -> Self {
        UdpAdapter {
            core: AdapterCore::new(name, plag_id),
        }
    }
}

impl Adapter for UdpAdapter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn plag_id(&self) -> u64 {
        self.core.plag_id()
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Udp
    }

    fn init(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn step(&self) -> bool {
        let Some(record) = self.core.ingress.pop() else {
            return false;
        };
        self.core.distributor.dispatch(record.as_ref());
        true
    }

    fn stop(&self) {
        self.core.stop();
    }

    fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    fn enqueue(&self, record: Box<dyn Record + Send>) {
        self.core.ingress.push(record);
    }

    fn new_record(&self, source_record_id: u64) -> Box<dyn Record + Send> {
        Box::new(UdpRecord::new(self.core.name(), source_record_id))
    }

    fn attach_translator(&self, translator: Translator) {
        self.core.distributor.attach(translator);
    }
}

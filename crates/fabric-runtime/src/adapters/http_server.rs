//! A stub HTTP-server Adapter (§6.5): accepts pre-built [`HttpServerRecord`]s through `enqueue`
//! and fans them straight to the Distributor. The embedded scripting engine the real contract
//! describes is out of scope (§1 Non-goals); this is enough surface to exercise the fabric
//! end-to-end with an adapter that has no Transport of its own.

use fabric_core::{Record, RecordKind};

use crate::adapter::{Adapter, AdapterCore};
use crate::errors::AdapterError;
use crate::records::HttpServerRecord;
use crate::translator::Translator;

pub struct HttpServerAdapter {
    core: AdapterCore,
}

impl HttpServerAdapter {
    pub fn new(name: impl Into<String>, plag_id: u64) -> Self {
        HttpServerAdapter {
            core: AdapterCore::new(name, plag_id),
        }
    }
}

impl Adapter for HttpServerAdapter {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn plag_id(&self) -> u64 {
        self.core.plag_id()
    }

    fn kind(&self) -> RecordKind {
        RecordKind::HttpServer
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
        Box::new(HttpServerRecord::new(self.core.name(), source_record_id))
    }

    fn attach_translator(&self, translator: Translator) {
        self.core.distributor.attach(translator);
    }
}

//! The `Adapter` trait (§4.3): every protocol endpoint in the fabric — MQTT client, Modbus
//! client, the HTTP-server/UDP stubs — implements this to plug into the worker/Distributor
//! machinery uniformly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use fabric_core::{Record, RecordKind};

use crate::distributor::Distributor;
use crate::errors::AdapterError;
use crate::ingress::IngressQueue;
use crate::translator::Translator;

/// How long a worker sleeps between `step()` calls that made no progress (§4.3 "sleeps 1 ms
/// between steps when idle").
pub const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Uniform plumbing every Adapter needs regardless of protocol: a stable name, a numeric id, the
/// cooperative stop flag, the ingress queue, and the egress Distributor. Concrete adapters embed
/// this and implement the few protocol-specific methods [`Adapter`] requires.
pub struct AdapterCore {
    name: String,
    plag_id: u64,
    stop: AtomicBool,
    pub ingress: IngressQueue,
    pub distributor: Distributor,
}

impl AdapterCore {
    pub fn new(name: impl Into<String>, plag_id: u64) -> Self {
        AdapterCore {
            name: name.into(),
            plag_id,
            stop: AtomicBool::new(false),
            ingress: IngressQueue::new(),
            distributor: Distributor::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plag_id(&self) -> u64 {
        self.plag_id
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Every protocol adapter in the fabric (§4.3).
pub trait Adapter: Send + Sync {
    /// Unique, stable name — how Translators and the registry address this Adapter.
    fn name(&self) -> &str;

    fn plag_id(&self) -> u64;

    /// The native Record variant this Adapter produces and consumes.
    fn kind(&self) -> RecordKind;

    /// Idempotent: acquire Transport and codec state.
    fn init(&self) -> Result<(), AdapterError>;

    /// Do one chunk of work; return whether progress was made.
    fn step(&self) -> bool;

    /// Cooperative cancellation: future `run()` loops observe this and exit.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Thread-safe; the only cross-thread entry point for Records reaching this Adapter.
    fn enqueue(&self, record: Box<dyn Record + Send>);

    /// Construct a fresh, empty Record of this Adapter's native variant, carrying the given
    /// lineage id. Used by a Translator to build the record it will `set_field` into (§4.4 step 2).
    fn new_record(&self, source_record_id: u64) -> Box<dyn Record + Send>;

    /// Wire a Translator onto this Adapter's egress Distributor (§4.6, Orchestrator wiring). Each
    /// concrete Adapter forwards to its embedded `AdapterCore.distributor`; the trait can't do this
    /// generically because `AdapterCore` is a private field of the concrete struct, not the trait.
    fn attach_translator(&self, translator: Translator);

    /// The worker loop: invoke `step()` until stopped, sleeping [`IDLE_SLEEP`] when idle.
    fn run(&self) {
        while !self.is_stopped() {
            if !self.step() {
                thread::sleep(IDLE_SLEEP);
            }
        }
    }
}

/// A `Weak<dyn Adapter>` with no live strong reference, for a Translator that has not yet been
/// bound to a target (§4.4 "dangling state"). `Weak::new()` requires `T: Sized`, so the usual way
/// to get an always-empty weak trait object is to downgrade an `Arc` and let it drop immediately.
pub fn dangling_target() -> std::sync::Weak<dyn Adapter> {
    struct Null;
    impl Adapter for Null {
        fn name(&self) -> &str {
            "<dangling>"
        }
        fn plag_id(&self) -> u64 {
            0
        }
        fn kind(&self) -> RecordKind {
            RecordKind::Map
        }
        fn init(&self) -> Result<(), AdapterError> {
            Ok(())
        }
        fn step(&self) -> bool {
            false
        }
        fn stop(&self) {}
        fn is_stopped(&self) -> bool {
            true
        }
        fn enqueue(&self, _record: Box<dyn Record + Send>) {}
        fn new_record(&self, _source_record_id: u64) -> Box<dyn Record + Send> {
            unreachable!("dangling target is never enqueued into")
        }
        fn attach_translator(&self, _translator: Translator) {}
    }

    let arc: std::sync::Arc<dyn Adapter> = std::sync::Arc::new(Null);
    std::sync::Arc::downgrade(&arc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_target_never_upgrades() {
        assert!(dangling_target().upgrade().is_none());
    }

    #[test]
    fn core_tracks_stop_flag() {
        let core = AdapterCore::new("a", 1);
        assert!(!core.is_stopped());
        core.stop();
        assert!(core.is_stopped());
    }
}

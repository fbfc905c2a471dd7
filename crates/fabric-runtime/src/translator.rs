//! `Translator` (§4.4): rewrites a Record observed on one Adapter's egress into a fresh Record of
//! another Adapter's native variant, via the key protocol.

use std::sync::Weak;

use fabric_core::{own_id_to_source_record_id, parse_key, KeyError, KeyExpr, Record};

use crate::adapter::Adapter;

/// An ordered `target-key -> source-expression` rewrite table, parsed once at construction.
pub type RewriteTable = Vec<(String, KeyExpr)>;

/// Parse a raw `target-key -> source-expression-string` table into a [`RewriteTable`].
pub fn parse_rewrite_table(raw: &[(String, String)]) -> Result<RewriteTable, KeyError> {
    raw.iter()
        .map(|(key, expr)| Ok((key.clone(), parse_key(expr)?)))
        .collect()
}

/// Created with a source Adapter's name (for logging), a weak reference to the target Adapter,
/// and a parsed rewrite table. Holds no strong reference to either Adapter: lifetimes are
/// root-owned by the Orchestrator (§3.4).
pub struct Translator {
    source_name: String,
    target: Weak<dyn Adapter>,
    rewrite: RewriteTable,
}

impl Translator {
    pub fn new(source_name: impl Into<String>, target: Weak<dyn Adapter>, rewrite: RewriteTable) -> Self {
        Translator {
            source_name: source_name.into(),
            target,
            rewrite,
        }
    }

    /// Re-bind a dangling Translator to a newly constructed target, per §4.4's allowance for
    /// Translators that failed to resolve their target at construction time.
    pub fn assign_target(&mut self, target: Weak<dyn Adapter>) {
        self.target = target;
    }

    pub fn has_target(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Translate `source` and enqueue the result on the target, or drop + log on any failure
    /// (missing target, key error, or a rejected `set_field`) — §4.4 steps 1-4.
    pub fn translate(&self, source: &dyn Record) {
        let Some(target) = self.target.upgrade() else {
            log::warn!(
                "translator source={} has no live target; dropping record {}",
                self.source_name,
                source.base().own_id()
            );
            return;
        };

        let lineage = own_id_to_source_record_id(source.base().own_id());
        let mut out = target.new_record(lineage);

        for (target_key, expr) in &self.rewrite {
            let base = source.base();
            let mut field = |name: &str| source.get_field(name);
            let value = match fabric_core::eval_key(
                expr,
                base.own_id(),
                base.source_record_id(),
                base.source_name(),
                &mut field,
            ) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!(
                        "translator {}->{}: key eval for {target_key:?} failed: {e}; dropping record",
                        self.source_name,
                        target.name()
                    );
                    return;
                }
            };

            if let Err(e) = out.set_field(target_key, value) {
                log::warn!(
                    "translator {}->{}: set {target_key:?} failed: {e}; dropping record",
                    self.source_name,
                    target.name()
                );
                return;
            }
        }

        target.enqueue(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MapRecord;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct StubAdapter {
        name: String,
        stopped: AtomicBool,
        received: std::sync::Mutex<Vec<Box<dyn Record + Send>>>,
    }

    impl Adapter for StubAdapter {
        fn name(&self) -> &str {
            &self.name
        }
        fn plag_id(&self) -> u64 {
            0
        }
        fn kind(&self) -> fabric_core::RecordKind {
            fabric_core::RecordKind::Map
        }
        fn init(&self) -> Result<(), crate::errors::AdapterError> {
            Ok(())
        }
        fn step(&self) -> bool {
            false
        }
        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
        fn enqueue(&self, record: Box<dyn Record + Send>) {
            self.received.lock().unwrap().push(record);
        }
        fn new_record(&self, source_record_id: u64) -> Box<dyn Record + Send> {
            Box::new(MapRecord::new(self.name.clone(), source_record_id))
        }
        fn attach_translator(&self, _translator: Translator) {}
    }

    #[test]
    fn dangling_translator_drops_and_does_not_panic() {
        let target = crate::adapter::dangling_target();
        let rewrite = parse_rewrite_table(&[("greeting".to_string(), "\"hi\"".to_string())]).unwrap();
        let t = Translator::new("src", target, rewrite);
        let source = MapRecord::new("src", 0);
        t.translate(&source); // must not panic
        assert!(!t.has_target());
    }

    #[test]
    fn translates_literal_into_target_field() {
        let target = Arc::new(StubAdapter {
            name: "dst".to_string(),
            stopped: AtomicBool::new(false),
            received: std::sync::Mutex::new(Vec::new()),
        });
        let as_trait: Arc<dyn Adapter> = target.clone();
        let weak: Weak<dyn Adapter> = Arc::downgrade(&as_trait);
        let rewrite = parse_rewrite_table(&[("greeting".to_string(), "\"hi\"".to_string())]).unwrap();
        let t = Translator::new("src", weak, rewrite);

        let source = MapRecord::new("src", 0);
        t.translate(&source);

        let received = target.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].get_field("greeting").unwrap(), fabric_core::Value::str("hi"));
    }
}

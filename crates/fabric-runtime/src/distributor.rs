//! `Distributor` (§4.5): per-Adapter, an append-only list of Translators that fan a produced
//! Record out in insertion order.

use std::sync::Mutex;

use fabric_core::Record;

use crate::translator::Translator;

#[derive(Default)]
pub struct Distributor {
    translators: Mutex<Vec<Translator>>,
}

impl Distributor {
    pub fn new() -> Self {
        Distributor {
            translators: Mutex::new(Vec::new()),
        }
    }

    /// Wire a new Translator onto this Adapter's egress. Append-only: Translators are never
    /// removed, only left dangling if their target disappears (§4.4).
    pub fn attach(&self, translator: Translator) {
        self.translators.lock().unwrap().push(translator);
    }

    pub fn len(&self) -> usize {
        self.translators.lock().unwrap().len()
    }

    /// Invoke every attached Translator, in insertion order, with a Record the owning Adapter's
    /// codec just produced. No ordering guarantee across distinct source Adapters (§5).
    pub fn dispatch(&self, record: &dyn Record) {
        for translator in self.translators.lock().unwrap().iter() {
            translator.translate(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MapRecord;
    use crate::translator::parse_rewrite_table;

    #[test]
    fn dispatch_with_no_translators_is_a_no_op() {
        let d = Distributor::new();
        let record = MapRecord::new("a", 0);
        d.dispatch(&record); // must not panic
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn attach_increments_len() {
        let d = Distributor::new();
        let rewrite = parse_rewrite_table(&[]).unwrap();
        d.attach(Translator::new("a", crate::adapter::dangling_target(), rewrite));
        assert_eq!(d.len(), 1);
    }
}

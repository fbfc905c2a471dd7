//! The QoS 1/2 retry table and packet-identifier generator (§4.1 "QoS and the retry table").
//!
//! Grounded in the identifier-wraparound loop of the original `MqttInterface`'s
//! `m_currentIdentifier`: increment, skip zero, skip any value still in flight.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Packet identifiers in flight, keyed by their 16-bit id, each holding the raw encoded packet
/// (for resend) and the instant it was last transmitted.
#[derive(Default)]
pub struct RetryTable {
    entries: HashMap<u16, (Vec<u8>, Instant)>,
    next_id: u16,
}

impl RetryTable {
    /// An empty table with the identifier generator seeded to 0, so the first generated id is 1.
    pub fn new() -> Self {
        RetryTable {
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    /// Allocate the next identifier not currently in flight. Identifier 0 is never returned.
    pub fn next_id(&mut self) -> u16 {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id == 0 {
                continue;
            }
            if !self.entries.contains_key(&self.next_id) {
                return self.next_id;
            }
        }
    }

    /// Record a newly sent packet as in flight under `id`.
    pub fn track(&mut self, id: u16, raw: Vec<u8>) {
        self.entries.insert(id, (raw, Instant::now()));
    }

    /// Remove `id` from the table, e.g. on PUBACK for QoS 1 or PUBCOMP for QoS 2.
    pub fn remove(&mut self, id: u16) {
        self.entries.remove(&id);
    }

    /// Whether `id` is currently tracked.
    pub fn contains(&self, id: u16) -> bool {
        self.entries.contains_key(&id)
    }

    /// The number of packets currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no packets are in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry whose last send is at least `threshold` old, paired with its raw bytes. Each
    /// returned entry's timestamp is bumped to now, matching the "resend and update" policy.
    pub fn due_for_resend(&mut self, threshold: Duration) -> Vec<(u16, Vec<u8>)> {
        let now = Instant::now();
        let mut due = Vec::new();
        for (id, (raw, last_send)) in self.entries.iter_mut() {
            if now.duration_since(*last_send) >= threshold {
                due.push((*id, raw.clone()));
                *last_send = now;
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_is_one() {
        let mut table = RetryTable::new();
        assert_eq!(table.next_id(), 1);
    }

    #[test]
    fn skips_in_flight_ids() {
        let mut table = RetryTable::new();
        let a = table.next_id();
        table.track(a, vec![1]);
        let b = table.next_id();
        assert_ne!(a, b);
        assert!(!table.contains(b));
    }

    #[test]
    fn remove_frees_the_id_for_reuse() {
        let mut table = RetryTable::new();
        let a = table.next_id();
        table.track(a, vec![1]);
        table.remove(a);
        assert!(!table.contains(a));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn zero_is_never_generated() {
        let mut table = RetryTable::new();
        table.next_id = u16::MAX;
        let id = table.next_id();
        assert_ne!(id, 0);
        assert_eq!(id, 1);
    }

    #[test]
    fn due_for_resend_only_past_threshold() {
        let mut table = RetryTable::new();
        table.track(1, vec![9]);
        assert!(table.due_for_resend(Duration::from_secs(60)).is_empty());
        assert_eq!(
            table.due_for_resend(Duration::from_secs(0)),
            vec![(1, vec![9])]
        );
    }
}

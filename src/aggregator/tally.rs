use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

/// In-memory per-option vote counts awaiting a flush.
///
/// The lock is held for one increment, one snapshot or one settle; never
/// across store I/O.
#[derive(Debug, Default)]
pub struct Tally {
    counts: Mutex<HashMap<String, i64>>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `option`; returns its pending total.
    pub fn record(&self, option: &str) -> i64 {
        let mut counts = self.counts.lock();
        let count = counts.entry(option.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Copy of the pending counts, ordered by option name.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counts
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Remove the amounts in `flushed` after they were all written. Votes
    /// recorded since the snapshot was taken stay pending.
    pub fn settle(&self, flushed: &BTreeMap<String, i64>) {
        let mut counts = self.counts.lock();
        for (option, amount) in flushed {
            if let Some(count) = counts.get_mut(option) {
                *count -= amount;
                if *count <= 0 {
                    counts.remove(option);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, option: &str) -> i64 {
        self.counts.lock().get(option).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.counts.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.counts.lock().is_empty()
    }
}

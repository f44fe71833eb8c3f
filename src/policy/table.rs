//! Committed policy storage. One mutex guards an insertion-ordered entry
//! array and its hashed register index, so point lookups stay O(1) and a
//! full-table swap is the only mutation concurrent readers can race with.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;

use super::entry::Entry;
use super::error::{PolicyError, PolicyResult};

#[derive(Default)]
struct TableState {
    // Insertion order, for ordinal enumeration.
    entries: Vec<Entry>,
    // Register address -> slot in `entries`.
    index: AHashMap<u64, usize>,
}

/// The currently committed policy. Accessors hand out copies only; the
/// table keeps exclusive ownership of its entries across reloads.
pub struct PolicyTable {
    state: Mutex<TableState>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState::default()),
        }
    }

    /// Returns a copy of the entry for `register`, if the policy has one.
    pub fn lookup(&self, register: u64) -> Option<Entry> {
        let state = self.lock();
        state
            .index
            .get(&register)
            .map(|&slot| state.entries[slot])
    }

    /// Returns a copy of the entry at ordinal `index` in install order,
    /// or `None` past the end of the policy.
    pub fn entry_at(&self, index: usize) -> Option<Entry> {
        self.lock().entries.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Atomically replaces the committed policy with `batch`, returning
    /// the evicted entries so the caller can run advisory removal actions.
    ///
    /// The index is built from the caller-owned batch before the lock is
    /// taken; the critical section is the swap alone, so a concurrent
    /// lookup sees either the fully-old or fully-new policy. Building the
    /// index also rejects duplicate registers, leaving the committed
    /// policy untouched on failure.
    pub fn replace(&self, batch: Vec<Entry>) -> PolicyResult<Vec<Entry>> {
        let mut index = AHashMap::new();
        index
            .try_reserve(batch.len())
            .map_err(|_| PolicyError::AllocationFailure)?;
        for (slot, entry) in batch.iter().enumerate() {
            if index.insert(entry.register, slot).is_some() {
                return Err(PolicyError::DuplicateRegister {
                    register: entry.register,
                });
            }
        }

        let mut state = self.lock();
        state.index = index;
        Ok(mem::replace(&mut state.entries, batch))
    }

    /// Removes all entries, returning the evicted policy. Equivalent to
    /// replacing with an empty batch.
    pub fn clear(&self) -> Vec<Entry> {
        let mut state = self.lock();
        state.index = AHashMap::new();
        mem::take(&mut state.entries)
    }

    // The critical sections only ever swap fully-built values, so a
    // poisoned mutex cannot hide a mid-transition table; recover the
    // guard rather than surface a failure from the never-fails queries.
    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> Vec<Entry> {
        vec![
            Entry::new(0x10, 0x1, 0xFF),
            Entry::new(0x20, 0x2, 0xF0),
            Entry::new(0x30, 0x4, 0x0F),
        ]
    }

    #[test]
    fn lookup_finds_installed_registers() {
        let table = PolicyTable::new();
        table.replace(sample_batch()).expect("unique registers");

        let entry = table.lookup(0x20).expect("0x20 was installed");
        assert_eq!(entry.write_mask, 0x2);
        assert_eq!(entry.read_mask, 0xF0);
        assert!(table.lookup(0x40).is_none(), "absent register has no entry");
    }

    #[test]
    fn entry_at_walks_install_order() {
        let table = PolicyTable::new();
        table.replace(sample_batch()).expect("unique registers");

        assert_eq!(table.entry_at(0).unwrap().register, 0x10);
        assert_eq!(table.entry_at(2).unwrap().register, 0x30);
        assert!(table.entry_at(3).is_none(), "past the end means no data");
    }

    #[test]
    fn replace_returns_evicted_policy() {
        let table = PolicyTable::new();
        table.replace(sample_batch()).expect("first install");

        let evicted = table
            .replace(vec![Entry::new(0x99, 0, 0)])
            .expect("second install");
        assert_eq!(evicted.len(), 3);
        assert_eq!(evicted[0].register, 0x10);
        assert_eq!(table.len(), 1);
        assert!(table.lookup(0x10).is_none(), "old policy is gone");
    }

    #[test]
    fn duplicate_register_rejected_without_touching_table() {
        let table = PolicyTable::new();
        table.replace(sample_batch()).expect("first install");

        let dup = vec![Entry::new(0x99, 0, 0), Entry::new(0x99, 1, 1)];
        let err = table.replace(dup).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::DuplicateRegister { register: 0x99 }
        ));

        assert_eq!(table.len(), 3, "failed install must leave prior policy intact");
        assert_eq!(table.lookup(0x10).unwrap().read_mask, 0xFF);
        assert!(table.lookup(0x99).is_none());
    }

    #[test]
    fn clear_empties_table_and_returns_old_entries() {
        let table = PolicyTable::new();
        table.replace(sample_batch()).expect("install");

        let evicted = table.clear();
        assert_eq!(evicted.len(), 3);
        assert!(table.is_empty());
        assert!(table.entry_at(0).is_none());
    }
}

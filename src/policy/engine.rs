//! The policy engine: validates an untrusted allowlist submission in
//! caller-local staging, atomically installs it, and serves per-register
//! masks to the access-mediation layer.
//!
//! The engine is an explicit instance with no process-wide state; callers
//! hold the handle, or share it behind an `Arc` when the mediation layer
//! and the install path live on different threads.

use log::{debug, warn};

use super::entry::Entry;
use super::error::{PolicyError, PolicyResult};
use super::parser::parse_policy;
use super::table::PolicyTable;

/// Install buffers at or below this length clear the policy instead of
/// being parsed.
pub const CLEAR_THRESHOLD: usize = 2;

/// Upper bound on an install buffer. Larger submissions are rejected
/// before any parsing or staging allocation happens.
pub const MAX_POLICY_BYTES: usize = 128 * 1024;

/// Collaborator notified with the outgoing entry set whenever a committed
/// policy is replaced or cleared. Implementors decide what each entry's
/// removal flags mean for the physical register; the engine itself never
/// touches hardware and never invokes the hook for a rejected install.
pub trait RemovalHook: Send + Sync {
    fn entries_evicted(&self, evicted: &[Entry]);
}

/// Register access policy engine. Lifecycle: construct, install and query
/// as often as needed, then [`shutdown`](PolicyEngine::shutdown). A fresh
/// engine starts with an empty policy: every register denied.
pub struct PolicyEngine {
    table: PolicyTable,
    removal: Option<Box<dyn RemovalHook>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            table: PolicyTable::new(),
            removal: None,
        }
    }

    /// An engine whose policy replacements report evicted entries to `hook`.
    pub fn with_removal_hook(hook: Box<dyn RemovalHook>) -> Self {
        Self {
            table: PolicyTable::new(),
            removal: Some(hook),
        }
    }

    /// Validates `buf` as allowlist text and atomically installs it as
    /// the new policy, returning the number of bytes consumed.
    ///
    /// A buffer of [`CLEAR_THRESHOLD`] bytes or fewer is an explicit
    /// clear request. On any error the previously committed policy stays
    /// authoritative and queryable; concurrent lookups never observe a
    /// partial install.
    pub fn install(&self, buf: &[u8]) -> PolicyResult<usize> {
        if buf.len() <= CLEAR_THRESHOLD {
            self.notify_evicted(self.table.clear());
            debug!("policy cleared by {} byte submission", buf.len());
            return Ok(buf.len());
        }
        if buf.len() > MAX_POLICY_BYTES {
            warn!(
                "policy rejected: {} byte buffer exceeds {} byte limit",
                buf.len(),
                MAX_POLICY_BYTES
            );
            return Err(PolicyError::BufferTooLarge {
                size: buf.len(),
                limit: MAX_POLICY_BYTES,
            });
        }

        // Invalid UTF-8 decodes to replacement characters, which then
        // fail numeric parsing like any other malformed token.
        let text = String::from_utf8_lossy(buf);
        let staged = parse_policy(&text).map_err(|err| {
            warn!("policy rejected: {err}");
            err
        })?;
        let count = staged.len();
        let evicted = self.table.replace(staged).map_err(|err| {
            warn!("policy rejected: {err}");
            err
        })?;
        debug!("policy installed with {count} entries");
        self.notify_evicted(evicted);
        Ok(buf.len())
    }

    /// Bits of `register` a caller may observe, or 0 when the register is
    /// not in the policy. Absence of policy is absence of permission.
    pub fn read_mask(&self, register: u64) -> u64 {
        self.table
            .lookup(register)
            .map_or(0, |entry| entry.read_mask)
    }

    /// Bits of `register` a caller may modify, or 0 when the register is
    /// not in the policy.
    pub fn write_mask(&self, register: u64) -> u64 {
        self.table
            .lookup(register)
            .map_or(0, |entry| entry.write_mask)
    }

    /// Both masks for `register` in one table access, as
    /// `(read_mask, write_mask)`. The mediation layer consults both on
    /// every hardware operation; one lock acquisition serves them from a
    /// single entry snapshot.
    pub fn masks(&self, register: u64) -> (u64, u64) {
        self.table
            .lookup(register)
            .map_or((0, 0), |entry| (entry.read_mask, entry.write_mask))
    }

    /// A copy of the full entry for `register`, if the policy has one.
    pub fn lookup(&self, register: u64) -> Option<Entry> {
        self.table.lookup(register)
    }

    /// A copy of the entry at ordinal `index` in install order, or `None`
    /// once the policy is exhausted.
    pub fn entry_at(&self, index: usize) -> Option<Entry> {
        self.table.entry_at(index)
    }

    /// The entry at ordinal `index` as a formatted text record, or `None`
    /// once the policy is exhausted. Callers re-reading the whole policy
    /// iterate indices from 0 until no more data comes back.
    pub fn record_at(&self, index: usize) -> Option<String> {
        self.table.entry_at(index).map(|entry| {
            format!(
                "REG: {:08x} Write Mask: {:016x} Read Mask: {:016x}\n",
                entry.register, entry.write_mask, entry.read_mask
            )
        })
    }

    /// Number of entries in the committed policy.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Removes all entries, reporting them to the removal hook.
    pub fn clear(&self) {
        self.notify_evicted(self.table.clear());
    }

    /// Final teardown: clears the policy so the removal hook sees the
    /// last committed entries, then drops the engine. Dropping without
    /// `shutdown` just frees memory and runs no advisory actions.
    pub fn shutdown(self) {
        self.clear();
    }

    // Runs outside the table lock; the hook may call back into queries.
    fn notify_evicted(&self, evicted: Vec<Entry>) {
        if evicted.is_empty() {
            return;
        }
        if let Some(hook) = &self.removal {
            hook.entries_evicted(&evicted);
        }
    }
}

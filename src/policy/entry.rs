//! The compiled permission record stored in the policy table.

use bitflags::bitflags;

bitflags! {
    /// Advisory behavior for the physical register when its entry is
    /// evicted from the policy. The engine carries these as data only;
    /// acting on them belongs to the access-mediation layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RemovalFlags: u8 {
        /// Zero the register once the entry is removed.
        const CLEAR = 0b1;
        /// Re-apply previously captured bits once the entry is removed.
        const RESTORE = 0b10;
    }
}

/// One per-register permission record: which bits of the register a
/// caller may observe on read, and which it may alter on write.
///
/// Field order mirrors the text format: `register write_mask read_mask`.
/// The text format carries no removal field, so parsed entries always
/// have an empty flag set; embedders constructing entries in code can
/// attach flags for their own eviction handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub register: u64,
    pub write_mask: u64,
    pub read_mask: u64,
    pub removal: RemovalFlags,
}

impl Entry {
    pub fn new(register: u64, write_mask: u64, read_mask: u64) -> Self {
        Self {
            register,
            write_mask,
            read_mask,
            removal: RemovalFlags::empty(),
        }
    }

    /// Redacts a raw register value before it is returned to a caller.
    /// Bits outside the read mask are forced to zero.
    pub fn redact_read(&self, raw: u64) -> u64 {
        raw & self.read_mask
    }

    /// Merges a requested write into the current hardware value. Bits
    /// outside the write mask keep their current state and are never
    /// overwritten by caller-supplied data.
    pub fn merge_write(&self, current: u64, requested: u64) -> u64 {
        (current & !self.write_mask) | (requested & self.write_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_read_zeroes_bits_outside_mask() {
        let entry = Entry::new(0x611, 0, 0x0000_0000_ffff_ffff);
        assert_eq!(
            entry.redact_read(0xAAAA_BBBB_CCCC_DDDD),
            0x0000_0000_CCCC_DDDD,
            "high half is outside the read mask and must be redacted"
        );
    }

    #[test]
    fn merge_write_preserves_bits_outside_mask() {
        let entry = Entry::new(0x611, 0x0000_0000_0000_00FF, 0);
        let merged = entry.merge_write(0x1234_5678_9ABC_DE00, 0xFFFF_FFFF_FFFF_FF55);
        assert_eq!(
            merged, 0x1234_5678_9ABC_DE55,
            "only the low byte is writable; everything else keeps hardware state"
        );
    }

    #[test]
    fn parsed_entries_carry_no_removal_behavior() {
        let entry = Entry::new(0x10, 0xFF, 0xFF);
        assert!(entry.removal.is_empty());
        assert!(!entry.removal.contains(RemovalFlags::CLEAR));
    }

    #[test]
    fn removal_flags_compose() {
        let both = RemovalFlags::CLEAR | RemovalFlags::RESTORE;
        assert!(both.contains(RemovalFlags::CLEAR));
        assert!(both.contains(RemovalFlags::RESTORE));
    }
}

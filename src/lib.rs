//! Fine-grained read/write permission enforcement for privileged
//! hardware control registers.
//!
//! A privileged caller submits a text allowlist naming each accessible
//! register and the bits of it that may be read or written. The engine
//! validates the whole submission against caller-local staging, compiles
//! it into a hashed permission table, and atomically swaps the table in
//! while concurrent mask queries continue against the old one. Registers
//! absent from the policy answer with all-zero masks: no entry, no
//! access.
//!
//! ```
//! use regguard::PolicyEngine;
//!
//! let engine = PolicyEngine::new();
//! engine.install(b"0x611 0x0 0xffffffffffffffff\n").unwrap();
//! assert_eq!(engine.read_mask(0x611), u64::MAX);
//! assert_eq!(engine.write_mask(0x611), 0);
//! assert_eq!(engine.read_mask(0x612), 0);
//! ```

pub mod policy;

pub use policy::{
    CLEAR_THRESHOLD, Entry, MAX_POLICY_BYTES, PolicyEngine, PolicyError, PolicyResult,
    PolicyTable, RemovalFlags, RemovalHook, parse_policy,
};

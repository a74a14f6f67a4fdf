//! `secadm-core` — per-jail Integriforce/PaX policy store and enforcement
//! engine.
//!
//! This crate is the hard part: a concurrent, jail-partitioned, ordered
//! rule index mutated under reader-writer discipline, bit-exact file
//! identification across mount points, cryptographic verification with a
//! fail-closed contract, and the staging/commit protocol that lets a new
//! ruleset replace the old one atomically from the perspective of any
//! concurrent enforcement read.
//!
//! The control-channel wire format lives in `secadm-wire`; the MAC-hook
//! surface and a host-framework test double live in `secadm-hooks`. Neither
//! depends on the other — everything about rule identity, storage, and
//! enforcement decisions is settled here.

#![deny(unsafe_code)]

pub mod enforcement;
pub mod error;
pub mod fingerprint;
pub mod ingestion;
pub mod jail;
pub mod path;
pub mod registry;
pub mod rule;

pub use enforcement::{check_exec, check_unlink, Decision, ExecDecision, FileHasher, StdFileHasher};
pub use error::SecadmError;
pub use fingerprint::{FingerprintKey, KindTag, MNAMELEN};
pub use ingestion::{add_rule, load_ruleset, RawRule};
pub use jail::{Destination, JailCounts, JailEntry};
pub use path::{PathResolver, ResolvedPath, StdPathResolver};
pub use registry::Registry;
pub use rule::{FileLocation, HashKind, PaxFlags, RuleKind, RuleRecord, MAX_PATH};

//! Rule records: the in-memory representation of one Integriforce, PaX, or
//! reserved Extended rule.

use crate::fingerprint::{FingerprintKey, KindTag};

/// Maximum length of a rule's target path.
pub const MAX_PATH: usize = 1024;

/// Which digest algorithm an Integriforce rule's `hash_bytes` was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    /// SHA-1, 20-byte digest.
    Sha1,
    /// SHA-256, 32-byte digest.
    Sha256,
}

impl HashKind {
    /// Expected digest length in bytes for this kind.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

/// Per-binary exploit-mitigation toggles applied by a PaX rule.
///
/// Modeled as a plain flag struct rather than a bitmask type: there are only
/// two toggles today, and a struct is simpler to extend with more later than
/// a `bitflags!` set committed to a bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaxFlags {
    /// Enable (`true`) or disable (`false`) address-space layout randomization.
    pub aslr: bool,
    /// Enable (`true`) or disable (`false`) segvguard.
    pub segvguard: bool,
}

/// Identity of a file independent of the path used to reach it: the mount
/// point of its filesystem plus its per-filesystem file id (inode or
/// equivalent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Mounted-on path of the filesystem containing the file.
    pub mount_point: String,
    /// Per-filesystem unique file identifier.
    pub file_id: u64,
}

/// The three rule families. `Extended` is a zero-field placeholder: the
/// family is reserved at the protocol level but rejected at ingestion
/// (`SecadmError::Unsupported`), so there is no data to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Cryptographic file-integrity enforcement.
    Integriforce {
        /// Path the rule was declared against (kept for `get_rule_path`).
        path: String,
        /// File identity used for fingerprinting and live-index lookups.
        location: FileLocation,
        /// Which digest algorithm `hash` was computed with.
        hash_kind: HashKind,
        /// Expected digest, `hash_kind.digest_len()` bytes long.
        hash: Vec<u8>,
    },
    /// Per-binary exploit-mitigation toggle.
    Pax {
        /// Path the rule was declared against.
        path: String,
        /// File identity used for fingerprinting and live-index lookups.
        location: FileLocation,
        /// Feature toggles applied on a matching exec.
        flags: PaxFlags,
    },
    /// Reserved, currently rejected at ingestion.
    Extended,
}

impl RuleKind {
    /// The fingerprint tag for this rule's family.
    #[must_use]
    pub const fn tag(&self) -> KindTag {
        match self {
            Self::Integriforce { .. } => KindTag::Integriforce,
            Self::Pax { .. } => KindTag::Pax,
            Self::Extended => KindTag::Extended,
        }
    }

    /// The file identity this rule targets, if it has one (`Extended` has none).
    #[must_use]
    pub fn location(&self) -> Option<&FileLocation> {
        match self {
            Self::Integriforce { location, .. } | Self::Pax { location, .. } => Some(location),
            Self::Extended => None,
        }
    }

    /// The declared path this rule targets, if it has one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Integriforce { path, .. } | Self::Pax { path, .. } => Some(path.as_str()),
            Self::Extended => None,
        }
    }

    /// The digest kind and expected bytes of an Integriforce rule, if this is one.
    #[must_use]
    pub fn hash_kind_and_bytes(&self) -> Option<(HashKind, &[u8])> {
        match self {
            Self::Integriforce { hash_kind, hash, .. } => Some((*hash_kind, hash.as_slice())),
            Self::Pax { .. } | Self::Extended => None,
        }
    }
}

/// A single rule, owned by exactly one index (live or staging) of exactly
/// one jail entry. Removal from an index destroys the record; nothing else
/// holds a reference to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    /// Identity, monotonic within a jail, separately numbered for live vs staging.
    pub rule_id: u64,
    /// Owning jail.
    pub jail_id: u32,
    /// Whether this rule currently participates in enforcement decisions.
    pub active: bool,
    /// Primary key of the index this record lives in.
    pub fingerprint: u32,
    /// The rule's data.
    pub kind: RuleKind,
}

impl RuleRecord {
    /// Build a fingerprint key for `kind` under `jail_id`, for rules that
    /// have a file identity (`Extended` has none and is never fingerprinted
    /// this way by ingestion — it is rejected before reaching this point).
    #[must_use]
    pub fn fingerprint_key(jail_id: u32, kind: &RuleKind) -> Option<FingerprintKey> {
        let location = kind.location()?;
        Some(FingerprintKey {
            jail_id,
            kind: kind.tag(),
            mount_point: location.mount_point.clone(),
            file_id: location.file_id,
        })
    }

    /// The path this rule was declared against, if it has one. Backs the
    /// `get_rule_path` control command.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.kind.path()
    }

    /// The digest kind and expected bytes, for an Integriforce rule. Backs
    /// the `get_rule_hash` control command.
    #[must_use]
    pub fn hash_kind_and_bytes(&self) -> Option<(HashKind, &[u8])> {
        self.kind.hash_kind_and_bytes()
    }
}

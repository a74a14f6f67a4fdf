//! Error taxonomy for the policy store and enforcement hooks.
//!
//! These are internal, in-process errors — not C `errno` values. The wire
//! boundary (`secadm-wire`) maps each variant to a stable reply code; the
//! MAC hooks (`secadm-hooks`) map them to a host-framework error.

use thiserror::Error;

/// Every failure mode the core can produce.
///
/// Enforcement hooks fail closed: any variant reaching a hook becomes
/// `Decision::Deny`, never `Decision::Allow`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecadmError {
    /// Bounds or malformed-payload failure (path length, unknown hash kind, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The path could not be resolved to a vnode (not found, permission, I/O).
    #[error("path resolution failed for {path}: {reason}")]
    PathResolution {
        /// The path that failed to resolve.
        path: String,
        /// Human-readable reason, carried from the underlying I/O error.
        reason: String,
    },

    /// The resolved path does not name a regular file.
    #[error("{0} is not a regular file")]
    NotRegularFile(String),

    /// `RuleKind::Extended` was submitted; the family is reserved, not implemented.
    #[error("extended rules are not supported")]
    Unsupported,

    /// Another rule already targets the same `(jail_id, kind, mount_point, file_id)`.
    #[error("duplicate rule for the same file")]
    Duplicate,

    /// The requested `rule_id` is unknown (used only where the caller expects an error).
    #[error("rule not found")]
    NotFound,

    /// An Integriforce rule matched but the on-disk hash did not match `hash_bytes`.
    #[error("integrity violation: on-disk hash does not match rule")]
    IntegrityViolation,

    /// An Integriforce rule exists for the target of an `unlink`.
    #[error("file is protected by an integriforce rule")]
    Immutable,

    /// Allocation or I/O failure inside the core itself, unrelated to caller input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SecadmError {
    /// True for every variant an enforcement hook may legitimately return.
    ///
    /// Kept as a narrow allowlist rather than matching everything so a new
    /// variant added later must be explicitly reviewed for hook use.
    #[must_use]
    pub fn is_hook_decidable(&self) -> bool {
        matches!(
            self,
            Self::PathResolution { .. }
                | Self::IntegrityViolation
                | Self::Immutable
                | Self::Internal(_)
        )
    }
}

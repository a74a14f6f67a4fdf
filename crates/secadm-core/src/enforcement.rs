//! The two enforcement hooks: `check_exec` and `check_unlink`.
//!
//! Both resolve the caller's jail, compute the candidate fingerprint(s),
//! probe the live index, and render a decision. Every non-definite outcome
//! denies — there is no default-allow branch reachable on internal error.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::SecadmError;
use crate::fingerprint::{FingerprintKey, KindTag};
use crate::path::PathResolver;
use crate::registry::Registry;
use crate::rule::{HashKind, PaxFlags, RuleKind};

/// Outcome of an enforcement decision with no side payload (`check_unlink`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The operation may proceed.
    Allow,
    /// The operation must not proceed, with the reason.
    Deny(SecadmError),
}

/// Outcome of `check_exec`: an allow/deny decision plus, on allow, the PaX
/// feature toggles (if any) the host should apply to the process being
/// exec'd. PaX never causes a deny; it only ever contributes a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecDecision {
    /// Exec may proceed. `pax_flags` is `Some` iff an active PaX rule
    /// matched the target.
    Allow {
        /// Feature toggles to apply to the process, if a PaX rule matched.
        pax_flags: Option<PaxFlags>,
    },
    /// Exec must be denied, with the reason (always from a failed
    /// Integriforce check or an unresolvable target).
    Deny(SecadmError),
}

/// Reads a file's contents and computes a digest of the requested kind.
///
/// Kept as a trait (rather than calling `std::fs::read` directly from
/// `check_exec`) so tests can substitute fixture contents instead of real
/// files, and so the read can be swapped for `pread`-style chunked I/O
/// later without touching the enforcement hook itself.
pub trait FileHasher: Send + Sync {
    /// Compute the `hash_kind` digest of the file at `path`.
    fn hash(&self, path: &str, hash_kind: HashKind) -> Result<Vec<u8>, SecadmError>;
}

/// Hashes files through `std::fs::read`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileHasher;

impl FileHasher for StdFileHasher {
    fn hash(&self, path: &str, hash_kind: HashKind) -> Result<Vec<u8>, SecadmError> {
        let contents = std::fs::read(path).map_err(|e| SecadmError::Internal(format!(
            "failed reading {path} for integrity check: {e}"
        )))?;
        Ok(match hash_kind {
            HashKind::Sha1 => Sha1::digest(&contents).to_vec(),
            HashKind::Sha256 => Sha256::digest(&contents).to_vec(),
        })
    }
}

fn fingerprint_for(jail_id: u32, tag: KindTag, mount_point: &str, file_id: u64) -> u32 {
    FingerprintKey {
        jail_id,
        kind: tag,
        mount_point: mount_point.to_string(),
        file_id,
    }
    .fingerprint()
}

/// Probe the live index for both an Integriforce and a PaX hit on
/// `target_path`, hash-verify the former and collect feature toggles from
/// the latter.
pub fn check_exec(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
    hasher: &dyn FileHasher,
) -> ExecDecision {
    let resolved = match resolver.resolve(target_path) {
        Ok(r) => r,
        Err(e) => {
            warn!(jail_id, target_path, error = %e, "check_exec: path resolution failed, denying");
            return ExecDecision::Deny(e);
        }
    };

    // A jail with no rule table yet has allowed everything by definition;
    // do not allocate an entry on this hot path just to find it empty.
    let Some(entry) = registry.existing_entry(jail_id) else {
        debug!(jail_id, target_path, "check_exec: no rule table for jail, allow");
        return ExecDecision::Allow { pax_flags: None };
    };

    let integriforce_fp = fingerprint_for(
        jail_id,
        KindTag::Integriforce,
        &resolved.location.mount_point,
        resolved.location.file_id,
    );
    let pax_fp = fingerprint_for(
        jail_id,
        KindTag::Pax,
        &resolved.location.mount_point,
        resolved.location.file_id,
    );

    if let Some(record) = entry.lookup_active_live(integriforce_fp) {
        let RuleKind::Integriforce { hash_kind, hash, .. } = &record.kind else {
            return ExecDecision::Deny(SecadmError::Internal(
                "integriforce fingerprint matched a non-integriforce record".to_string(),
            ));
        };
        match hasher.hash(target_path, *hash_kind) {
            Ok(actual) if &actual == hash => {
                debug!(jail_id, target_path, rule_id = record.rule_id, "check_exec: integriforce hash matched");
            }
            Ok(_) => {
                warn!(jail_id, target_path, rule_id = record.rule_id, "check_exec: integrity violation");
                return ExecDecision::Deny(SecadmError::IntegrityViolation);
            }
            Err(e) => {
                warn!(jail_id, target_path, error = %e, "check_exec: hashing failed, integrity violation");
                return ExecDecision::Deny(SecadmError::IntegrityViolation);
            }
        }
    }

    let pax_flags = entry.lookup_active_live(pax_fp).and_then(|record| {
        if let RuleKind::Pax { flags, .. } = record.kind {
            Some(flags)
        } else {
            None
        }
    });

    ExecDecision::Allow { pax_flags }
}

/// Deny iff an active Integriforce rule matches the target.
pub fn check_unlink(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
) -> Decision {
    let resolved = match resolver.resolve(target_path) {
        Ok(r) => r,
        Err(e) => {
            warn!(jail_id, target_path, error = %e, "check_unlink: path resolution failed, denying");
            return Decision::Deny(e);
        }
    };

    let Some(entry) = registry.existing_entry(jail_id) else {
        return Decision::Allow;
    };

    let fingerprint = fingerprint_for(
        jail_id,
        KindTag::Integriforce,
        &resolved.location.mount_point,
        resolved.location.file_id,
    );

    if entry.lookup_active_live(fingerprint).is_some() {
        warn!(jail_id, target_path, "check_unlink: denied by integriforce rule");
        return Decision::Deny(SecadmError::Immutable);
    }

    Decision::Allow
}

//! Validates and canonicalizes an incoming rule, then inserts it into a
//! jail's live or staging index, plus the bulk `load_ruleset` entry point.

use tracing::{debug, warn};

use crate::error::SecadmError;
use crate::fingerprint::FingerprintKey;
use crate::jail::{Destination, JailEntry};
use crate::path::PathResolver;
use crate::rule::{FileLocation, HashKind, PaxFlags, RuleKind, MAX_PATH};

/// An incoming rule before path resolution and fingerprinting: everything a
/// caller supplies, nothing the core derives for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRule {
    /// A requested Integriforce rule.
    Integriforce {
        /// Path to protect.
        path: String,
        /// Digest algorithm `hash` was computed with.
        hash_kind: HashKind,
        /// Expected digest bytes.
        hash: Vec<u8>,
    },
    /// A requested PaX rule.
    Pax {
        /// Path to apply feature toggles to.
        path: String,
        /// Feature toggles to apply on exec.
        flags: PaxFlags,
    },
    /// A requested Extended rule — always rejected (`SecadmError::Unsupported`).
    Extended,
}

impl RawRule {
    fn path(&self) -> Option<&str> {
        match self {
            Self::Integriforce { path, .. } | Self::Pax { path, .. } => Some(path.as_str()),
            Self::Extended => None,
        }
    }
}

fn validate_path_len(path: &str) -> Result<(), SecadmError> {
    if path.is_empty() || path.len() >= MAX_PATH {
        return Err(SecadmError::InvalidArgument(format!(
            "path length {} out of bounds (0, {MAX_PATH})",
            path.len()
        )));
    }
    Ok(())
}

fn validate_hash_len(hash_kind: HashKind, hash: &[u8]) -> Result<(), SecadmError> {
    if hash.len() != hash_kind.digest_len() {
        return Err(SecadmError::InvalidArgument(format!(
            "hash length {} does not match {:?} ({} expected)",
            hash.len(),
            hash_kind,
            hash_kind.digest_len()
        )));
    }
    Ok(())
}

fn resolve_regular_file(
    resolver: &dyn PathResolver,
    path: &str,
) -> Result<FileLocation, SecadmError> {
    let resolved = resolver.resolve(path)?;
    if !resolved.is_regular_file {
        return Err(SecadmError::NotRegularFile(path.to_string()));
    }
    Ok(resolved.location)
}

/// Validate, canonicalize, and insert `raw` into `jail`'s `destination`
/// index. Returns the assigned `rule_id`.
///
/// Order of checks: kind validation, path-length bound, hash-length-by-kind,
/// path resolution, regular-file check, fingerprint computation, then a
/// single write-locked check-then-insert inside [`JailEntry::insert`].
pub fn add_rule(
    jail: &JailEntry,
    raw: RawRule,
    destination: Destination,
    resolver: &dyn PathResolver,
) -> Result<u64, SecadmError> {
    let kind = match raw {
        RawRule::Extended => return Err(SecadmError::Unsupported),
        RawRule::Integriforce {
            ref path,
            hash_kind,
            ref hash,
        } => {
            validate_path_len(path)?;
            validate_hash_len(hash_kind, hash)?;
            let location = resolve_regular_file(resolver, path)?;
            RuleKind::Integriforce {
                path: path.clone(),
                location,
                hash_kind,
                hash: hash.clone(),
            }
        }
        RawRule::Pax { ref path, flags } => {
            validate_path_len(path)?;
            let location = resolve_regular_file(resolver, path)?;
            RuleKind::Pax {
                path: path.clone(),
                location,
                flags,
            }
        }
    };

    let key = FingerprintKey {
        jail_id: jail.jail_id(),
        kind: kind.tag(),
        mount_point: kind.location().map(|l| l.mount_point.clone()).unwrap_or_default(),
        file_id: kind.location().map(|l| l.file_id).unwrap_or_default(),
    };
    let fingerprint = key.fingerprint();

    match jail.insert(fingerprint, kind, destination) {
        Ok(rule_id) => {
            debug!(jail_id = jail.jail_id(), rule_id, fingerprint, "rule added");
            Ok(rule_id)
        }
        Err(e) => {
            warn!(jail_id = jail.jail_id(), fingerprint, error = %e, "rule rejected");
            Err(e)
        }
    }
}

/// Add every rule in `raws` to `jail`'s staging index in order. Stops and
/// returns on the first failure; rules already staged by earlier elements
/// of `raws` are *not* rolled back — a caller that wants all-or-nothing
/// semantics must inspect the returned ids and issue compensating deletes.
///
/// The returned error is always `InvalidArgument` regardless of which
/// underlying check failed; the real cause is still logged at `warn` level
/// for operators.
pub fn load_ruleset(
    jail: &JailEntry,
    raws: Vec<RawRule>,
    resolver: &dyn PathResolver,
) -> Result<Vec<u64>, SecadmError> {
    let mut ids = Vec::with_capacity(raws.len());
    for (index, raw) in raws.into_iter().enumerate() {
        match add_rule(jail, raw, Destination::Staging, resolver) {
            Ok(id) => ids.push(id),
            Err(e) => {
                warn!(
                    jail_id = jail.jail_id(),
                    index,
                    staged_so_far = ids.len(),
                    error = %e,
                    "load_ruleset aborted; already-staged rules were not rolled back"
                );
                return Err(SecadmError::InvalidArgument(format!(
                    "load_ruleset failed at element {index}: {e}"
                )));
            }
        }
    }
    Ok(ids)
}

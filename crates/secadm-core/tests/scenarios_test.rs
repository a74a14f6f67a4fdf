//! End-to-end coverage of the documented enforcement scenarios, exercised
//! through the public `secadm_core` API rather than internal module tests.

use secadm_core::path::fixtures::FixtureResolver;
use secadm_core::{
    add_rule, check_exec, check_unlink, load_ruleset, Decision, ExecDecision, FileHasher,
    FileLocation, HashKind, PaxFlags, RawRule, Registry, SecadmError,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use secadm_core::jail::Destination;

struct FixtureHasher(Mutex<HashMap<String, Vec<u8>>>);

impl FixtureHasher {
    fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }

    fn set(&self, path: &str, contents: &[u8]) {
        self.0.lock().unwrap().insert(path.to_string(), contents.to_vec());
    }
}

impl FileHasher for FixtureHasher {
    fn hash(&self, path: &str, hash_kind: HashKind) -> Result<Vec<u8>, SecadmError> {
        let map = self.0.lock().unwrap();
        let bytes = map
            .get(path)
            .ok_or_else(|| SecadmError::Internal("missing fixture file".to_string()))?;
        Ok(match hash_kind {
            HashKind::Sha1 => {
                use sha1::Sha1;
                Sha1::digest(bytes).to_vec()
            }
            HashKind::Sha256 => Sha256::digest(bytes).to_vec(),
        })
    }
}

fn resolver() -> FixtureResolver {
    let r = FixtureResolver::new();
    r.insert(
        "/bin/ls",
        FileLocation {
            mount_point: "/".to_string(),
            file_id: 100,
        },
        true,
    );
    r.insert(
        "/usr/bin/example",
        FileLocation {
            mount_point: "/usr".to_string(),
            file_id: 200,
        },
        true,
    );
    r
}

/// Scenario 1 and 2: Integriforce allow, then deny after the file changes.
#[test]
fn integriforce_allow_then_deny_after_tamper() {
    let registry = Registry::new();
    let resolver = resolver();
    let hasher = FixtureHasher::new();
    hasher.set("/bin/ls", b"original bytes");

    let jail = registry.entry(1);
    add_rule(
        &jail,
        RawRule::Integriforce {
            path: "/bin/ls".to_string(),
            hash_kind: HashKind::Sha256,
            hash: Sha256::digest(b"original bytes").to_vec(),
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();

    assert_eq!(
        check_exec(&registry, 1, "/bin/ls", &resolver, &hasher),
        ExecDecision::Allow { pax_flags: None }
    );

    hasher.set("/bin/ls", b"replaced bytes");
    assert_eq!(
        check_exec(&registry, 1, "/bin/ls", &resolver, &hasher),
        ExecDecision::Deny(SecadmError::IntegrityViolation)
    );
}

/// Scenario 3: unlink protection, scoped to the rule's own jail.
#[test]
fn unlink_is_blocked_in_owning_jail_only() {
    let registry = Registry::new();
    let resolver = resolver();
    let jail = registry.entry(1);
    add_rule(
        &jail,
        RawRule::Integriforce {
            path: "/bin/ls".to_string(),
            hash_kind: HashKind::Sha256,
            hash: vec![0u8; 32],
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();

    assert_eq!(
        check_unlink(&registry, 1, "/bin/ls", &resolver),
        Decision::Deny(SecadmError::Immutable)
    );
    assert_eq!(check_unlink(&registry, 2, "/bin/ls", &resolver), Decision::Allow);
}

/// Scenario 4: duplicate rejection, live index size grows by exactly one.
#[test]
fn duplicate_integriforce_rule_is_rejected_and_count_unchanged() {
    let registry = Registry::new();
    let resolver = resolver();
    let jail = registry.entry(1);

    add_rule(
        &jail,
        RawRule::Integriforce {
            path: "/bin/ls".to_string(),
            hash_kind: HashKind::Sha256,
            hash: vec![1u8; 32],
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();

    let err = add_rule(
        &jail,
        RawRule::Integriforce {
            path: "/bin/ls".to_string(),
            hash_kind: HashKind::Sha256,
            hash: vec![2u8; 32],
        },
        Destination::Live,
        &resolver,
    )
    .unwrap_err();

    assert_eq!(err, SecadmError::Duplicate);
    assert_eq!(jail.counts().total, 1);
}

/// Scenario 5: staging 3 rules, 1 already live, then an atomic commit.
#[test]
fn commit_staging_replaces_live_atomically_with_fresh_ids() {
    let registry = Registry::new();
    let resolver = FixtureResolver::new();
    for (path, file_id) in [("/a", 1), ("/b", 2), ("/c", 3), ("/d", 4)] {
        resolver.insert(
            path,
            FileLocation {
                mount_point: "/".to_string(),
                file_id,
            },
            true,
        );
    }
    let jail = registry.entry(1);

    let prior_live_id = add_rule(
        &jail,
        RawRule::Pax {
            path: "/a".to_string(),
            flags: PaxFlags::default(),
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();

    load_ruleset(
        &jail,
        vec![
            RawRule::Pax {
                path: "/b".to_string(),
                flags: PaxFlags::default(),
            },
            RawRule::Pax {
                path: "/c".to_string(),
                flags: PaxFlags::default(),
            },
            RawRule::Pax {
                path: "/d".to_string(),
                flags: PaxFlags::default(),
            },
        ],
        &resolver,
    )
    .unwrap();

    jail.commit_staging();

    assert!(jail.get_rule(prior_live_id).is_none());
    assert_eq!(jail.counts().total, 3);
    assert_eq!(jail.counts().pax, 3);
}

/// Scenario 6: PaX toggle is jail-scoped and applies flags without denying.
#[test]
fn pax_rule_is_jail_scoped_and_never_denies() {
    let registry = Registry::new();
    let resolver = resolver();
    let hasher = FixtureHasher::new();
    let jail1 = registry.entry(1);

    add_rule(
        &jail1,
        RawRule::Pax {
            path: "/usr/bin/example".to_string(),
            flags: PaxFlags {
                aslr: false,
                segvguard: true,
            },
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();

    match check_exec(&registry, 1, "/usr/bin/example", &resolver, &hasher) {
        ExecDecision::Allow { pax_flags } => {
            assert_eq!(
                pax_flags,
                Some(PaxFlags {
                    aslr: false,
                    segvguard: true
                })
            );
        }
        other => panic!("expected allow, got {other:?}"),
    }

    match check_exec(&registry, 2, "/usr/bin/example", &resolver, &hasher) {
        ExecDecision::Allow { pax_flags } => assert_eq!(pax_flags, None),
        other => panic!("expected allow, got {other:?}"),
    }
}

/// Round-trip law: add then delete restores prior counts.
#[test]
fn add_then_delete_restores_prior_counts() {
    let registry = Registry::new();
    let resolver = resolver();
    let jail = registry.entry(1);
    let before = jail.counts();

    let id = add_rule(
        &jail,
        RawRule::Pax {
            path: "/bin/ls".to_string(),
            flags: PaxFlags::default(),
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();
    jail.delete_rule(id);

    assert_eq!(jail.counts(), before);
}

/// `set_active(false)` makes an otherwise-matching rule invisible to exec.
#[test]
fn deactivated_rule_allows_exec() {
    let registry = Registry::new();
    let resolver = resolver();
    let hasher = FixtureHasher::new();
    hasher.set("/bin/ls", b"whatever is on disk");
    let jail = registry.entry(1);

    let id = add_rule(
        &jail,
        RawRule::Integriforce {
            path: "/bin/ls".to_string(),
            hash_kind: HashKind::Sha256,
            hash: Sha256::digest(b"not what's on disk").to_vec(),
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();
    jail.set_active(id, false);

    assert_eq!(
        check_exec(&registry, 1, "/bin/ls", &resolver, &hasher),
        ExecDecision::Allow { pax_flags: None }
    );
}

/// `flush_live` is idempotent and leaves staging untouched.
#[test]
fn flush_live_is_idempotent_and_preserves_staging() {
    let registry = Registry::new();
    let resolver = resolver();
    let jail = registry.entry(1);

    add_rule(
        &jail,
        RawRule::Pax {
            path: "/bin/ls".to_string(),
            flags: PaxFlags::default(),
        },
        Destination::Live,
        &resolver,
    )
    .unwrap();
    load_ruleset(
        &jail,
        vec![RawRule::Pax {
            path: "/usr/bin/example".to_string(),
            flags: PaxFlags::default(),
        }],
        &resolver,
    )
    .unwrap();

    jail.flush_live();
    assert_eq!(jail.counts().total, 0);
    jail.flush_live();
    assert_eq!(jail.counts().total, 0);

    // Staging survived the flush; committing it now brings the rule live.
    jail.commit_staging();
    assert_eq!(jail.counts().total, 1);
}

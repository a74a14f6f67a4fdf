//! The three MAC entry points a real kernel security framework would call:
//! a process's exec check, a process's unlink check, and jail teardown.
//!
//! Each is a thin translation layer between the framework's call shape and
//! `secadm_core`'s engine API — no policy logic lives here, only the
//! plumbing that turns a hook call into a registry lookup and back into
//! whatever shape the host framework expects.

use secadm_core::{check_exec, check_unlink, Decision, ExecDecision, FileHasher, PathResolver, Registry};

/// Outcome a host framework's exec gate understands: a boolean permit plus
/// whatever PaX feature toggles should be applied to the new image if
/// execution proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecVerdict {
    pub permit: bool,
    pub aslr: bool,
    pub segvguard: bool,
}

/// Called before a process in `jail_id` is allowed to execute `target_path`.
pub fn vnode_check_exec(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
    hasher: &dyn FileHasher,
) -> ExecVerdict {
    match check_exec(registry, jail_id, target_path, resolver, hasher) {
        ExecDecision::Allow { pax_flags } => {
            let flags = pax_flags.unwrap_or_default();
            ExecVerdict {
                permit: true,
                aslr: flags.aslr,
                segvguard: flags.segvguard,
            }
        }
        ExecDecision::Deny(_) => ExecVerdict {
            permit: false,
            aslr: false,
            segvguard: false,
        },
    }
}

/// Called before a process in `jail_id` is allowed to unlink `target_path`.
pub fn vnode_check_unlink(
    registry: &Registry,
    jail_id: u32,
    target_path: &str,
    resolver: &dyn PathResolver,
) -> bool {
    matches!(
        check_unlink(registry, jail_id, target_path, resolver),
        Decision::Allow
    )
}

/// Called when a jail is torn down; drops its rule table entirely.
pub fn prison_destroy(registry: &Registry, jail_id: u32) {
    registry.destroy_jail(jail_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use secadm_core::path::fixtures::FixtureResolver;
    use secadm_core::{add_rule, jail::Destination, FileLocation, HashKind, PaxFlags, RawRule, SecadmError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubHasher(Mutex<HashMap<String, Vec<u8>>>);

    impl StubHasher {
        fn new() -> Self {
            Self(Mutex::new(HashMap::new()))
        }
        fn set(&self, path: &str, bytes: &[u8]) {
            self.0.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        }
    }

    impl FileHasher for StubHasher {
        fn hash(&self, path: &str, hash_kind: HashKind) -> Result<Vec<u8>, SecadmError> {
            let map = self.0.lock().unwrap();
            let bytes = map.get(path).ok_or(SecadmError::NotFound)?;
            Ok(match hash_kind {
                HashKind::Sha1 => {
                    use sha1::{Digest, Sha1};
                    Sha1::digest(bytes).to_vec()
                }
                HashKind::Sha256 => {
                    use sha2::{Digest, Sha256};
                    Sha256::digest(bytes).to_vec()
                }
            })
        }
    }

    fn resolver_with(path: &str, file_id: u64) -> FixtureResolver {
        let r = FixtureResolver::new();
        r.insert(
            path,
            FileLocation {
                mount_point: "/".to_string(),
                file_id,
            },
            true,
        );
        r
    }

    #[test]
    fn exec_hook_permits_and_carries_pax_flags() {
        let registry = Registry::new();
        let resolver = resolver_with("/bin/prog", 1);
        let hasher = StubHasher::new();
        let jail = registry.entry(1);
        add_rule(
            &jail,
            RawRule::Pax {
                path: "/bin/prog".to_string(),
                flags: PaxFlags {
                    aslr: true,
                    segvguard: true,
                },
            },
            Destination::Live,
            &resolver,
        )
        .unwrap();

        let verdict = vnode_check_exec(&registry, 1, "/bin/prog", &resolver, &hasher);
        assert_eq!(
            verdict,
            ExecVerdict {
                permit: true,
                aslr: true,
                segvguard: true
            }
        );
    }

    #[test]
    fn exec_hook_denies_on_integrity_mismatch() {
        let registry = Registry::new();
        let resolver = resolver_with("/bin/prog", 1);
        let hasher = StubHasher::new();
        hasher.set("/bin/prog", b"tampered");
        let jail = registry.entry(1);
        add_rule(
            &jail,
            RawRule::Integriforce {
                path: "/bin/prog".to_string(),
                hash_kind: HashKind::Sha256,
                hash: vec![0u8; 32],
            },
            Destination::Live,
            &resolver,
        )
        .unwrap();

        let verdict = vnode_check_exec(&registry, 1, "/bin/prog", &resolver, &hasher);
        assert!(!verdict.permit);
    }

    #[test]
    fn unlink_hook_blocks_protected_file() {
        let registry = Registry::new();
        let resolver = resolver_with("/bin/prog", 1);
        let jail = registry.entry(1);
        add_rule(
            &jail,
            RawRule::Integriforce {
                path: "/bin/prog".to_string(),
                hash_kind: HashKind::Sha256,
                hash: vec![0u8; 32],
            },
            Destination::Live,
            &resolver,
        )
        .unwrap();

        assert!(!vnode_check_unlink(&registry, 1, "/bin/prog", &resolver));
        assert!(vnode_check_unlink(&registry, 2, "/bin/prog", &resolver));
    }

    #[test]
    fn prison_destroy_drops_the_jails_rules() {
        let registry = Registry::new();
        let resolver = resolver_with("/bin/prog", 1);
        let jail = registry.entry(1);
        add_rule(
            &jail,
            RawRule::Pax {
                path: "/bin/prog".to_string(),
                flags: PaxFlags::default(),
            },
            Destination::Live,
            &resolver,
        )
        .unwrap();
        assert_eq!(registry.jail_count(), 1);

        prison_destroy(&registry, 1);
        assert_eq!(registry.jail_count(), 0);
    }
}

//! A host-framework test double standing in for the real OS security
//! framework: owns a [`Registry`], a fixture filesystem, and an in-memory
//! file-contents table, and exposes the same three operations a live
//! kernel would drive (exec, unlink, jail teardown) plus a control-channel
//! `send` for issuing commands without a real IPC transport.

use std::collections::HashMap;
use std::sync::Mutex;

use secadm_core::path::fixtures::FixtureResolver;
use secadm_core::{FileHasher, FileLocation, HashKind, Registry, SecadmError};
use secadm_wire::{Command, Reply};

use crate::dispatch::dispatch;
use crate::mac::{vnode_check_exec, vnode_check_unlink, ExecVerdict};

struct FixtureHasher(Mutex<HashMap<String, Vec<u8>>>);

impl FileHasher for FixtureHasher {
    fn hash(&self, path: &str, hash_kind: HashKind) -> Result<Vec<u8>, SecadmError> {
        let files = self.0.lock().unwrap();
        let bytes = files
            .get(path)
            .ok_or_else(|| SecadmError::PathResolution {
                path: path.to_string(),
                reason: "file not present on mock host".to_string(),
            })?;
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

/// A simulated host: one registry, one fixture filesystem, one set of file
/// contents. Every jail lives in the same process; isolation between jails
/// is whatever `secadm_core::Registry` provides, same as in production.
pub struct MockHost {
    registry: Registry,
    resolver: FixtureResolver,
    hasher: FixtureHasher,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            resolver: FixtureResolver::new(),
            hasher: FixtureHasher(Mutex::new(HashMap::new())),
        }
    }

    /// Register a file at `path`, backed by `contents`, as a regular file
    /// living on `mount_point` with file id `file_id`.
    pub fn put_file(&self, path: &str, mount_point: &str, file_id: u64, contents: &[u8]) {
        self.resolver.insert(
            path,
            FileLocation {
                mount_point: mount_point.to_string(),
                file_id,
            },
            true,
        );
        self.hasher
            .0
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_vec());
    }

    /// Overwrite the contents of an already-registered file, simulating a
    /// tamper or an upgrade between an Integriforce rule's installation and
    /// a later exec.
    pub fn replace_file_contents(&self, path: &str, contents: &[u8]) {
        self.hasher
            .0
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_vec());
    }

    /// Register a non-regular-file path (a directory, a device node).
    pub fn put_non_regular(&self, path: &str, mount_point: &str, file_id: u64) {
        self.resolver.insert(
            path,
            FileLocation {
                mount_point: mount_point.to_string(),
                file_id,
            },
            false,
        );
    }

    /// Simulate a process in `jail_id` execing `path`.
    #[must_use]
    pub fn exec(&self, jail_id: u32, path: &str) -> ExecVerdict {
        vnode_check_exec(&self.registry, jail_id, path, &self.resolver, &self.hasher)
    }

    /// Simulate a process in `jail_id` unlinking `path`.
    #[must_use]
    pub fn unlink(&self, jail_id: u32, path: &str) -> bool {
        vnode_check_unlink(&self.registry, jail_id, path, &self.resolver)
    }

    /// Simulate jail teardown.
    pub fn destroy_jail(&self, jail_id: u32) {
        crate::mac::prison_destroy(&self.registry, jail_id);
    }

    /// Send a control-channel command and get its reply, exactly as a CLI
    /// client talking over a real transport would observe it.
    #[must_use]
    pub fn send(&self, command: &Command) -> Reply {
        dispatch(command, &self.registry, &self.resolver, &self.hasher)
    }

    /// Direct access to the registry, for assertions a production caller
    /// would never need but a test does (e.g. counting jails).
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

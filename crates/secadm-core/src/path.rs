//! Resolves a path against the live filesystem namespace into the
//! `(mount_point, file_id)` pair rule ingestion and enforcement key off.
//!
//! HardenedBSD's kernel module does this with `namei(9)` plus
//! `VOP_GETATTR` inside the kernel; user space has no equivalent call, so
//! this resolves the same information through `stat(2)` (`st_dev`,
//! `st_ino`) and a walk of `/proc/mounts` to recover the mount point a real
//! `namei` lookup would have attached to the vnode.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::SecadmError;
use crate::rule::FileLocation;

/// Outcome of resolving a path: its file identity plus whether it names a
/// regular file (ingestion rejects everything that is not one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Mount point and per-filesystem file id for the target.
    pub location: FileLocation,
    /// Whether the target is a regular file.
    pub is_regular_file: bool,
}

/// Abstraction over path resolution so enforcement and ingestion can be
/// tested against a fixture filesystem instead of the real one.
pub trait PathResolver: Send + Sync {
    /// Resolve `path`, returning `PathResolution` on any lookup failure.
    fn resolve(&self, path: &str) -> Result<ResolvedPath, SecadmError>;
}

/// Resolves against the real filesystem visible to this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPathResolver;

impl PathResolver for StdPathResolver {
    fn resolve(&self, path: &str) -> Result<ResolvedPath, SecadmError> {
        let meta = fs::metadata(path).map_err(|e| SecadmError::PathResolution {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let canonical = fs::canonicalize(path).unwrap_or_else(|_| Path::new(path).to_path_buf());
        let mount_point = mount_point_for(&canonical, meta.dev()).unwrap_or_else(|| "/".to_string());

        Ok(ResolvedPath {
            location: FileLocation {
                mount_point,
                file_id: meta.ino(),
            },
            is_regular_file: meta.is_file(),
        })
    }
}

/// Find the mount point backing `target_dev`, preferring the longest path
/// prefix of `canonical_path` among candidates sharing that device — the
/// same disambiguation a real `namei` walk performs implicitly by descending
/// through bind mounts.
fn mount_point_for(canonical_path: &Path, target_dev: u64) -> Option<String> {
    let mounts = fs::read_to_string("/proc/mounts").ok()?;
    let mut best: Option<String> = None;

    for line in mounts.lines() {
        let mount_path = line.split_whitespace().nth(1)?;
        let Ok(candidate_meta) = fs::metadata(mount_path) else {
            continue;
        };
        if candidate_meta.dev() != target_dev {
            continue;
        }
        if !canonical_path.starts_with(mount_path) {
            continue;
        }
        if best.as_ref().is_none_or(|b| mount_path.len() > b.len()) {
            best = Some(mount_path.to_string());
        }
    }

    best
}

/// In-memory stand-in for the filesystem namespace.
///
/// Exposed (not `#[cfg(test)]`-gated) so downstream crates — notably
/// `secadm-hooks`'s scenario tests — can drive ingestion and enforcement
/// against fixed `(path -> mount_point, file_id)` mappings without real
/// files on disk.
pub mod fixtures {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{PathResolver, ResolvedPath};
    use crate::error::SecadmError;
    use crate::rule::FileLocation;

    /// A fixed table of path resolutions, installed by tests.
    #[derive(Default)]
    pub struct FixtureResolver {
        entries: Mutex<HashMap<String, ResolvedPath>>,
    }

    impl FixtureResolver {
        /// An empty fixture resolver; populate it with [`Self::insert`].
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register `path` as resolving to `location` with the given file type.
        pub fn insert(&self, path: &str, location: FileLocation, is_regular_file: bool) {
            self.entries.lock().unwrap().insert(
                path.to_string(),
                ResolvedPath {
                    location,
                    is_regular_file,
                },
            );
        }
    }

    impl PathResolver for FixtureResolver {
        fn resolve(&self, path: &str) -> Result<ResolvedPath, SecadmError> {
            self.entries
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| SecadmError::PathResolution {
                    path: path.to_string(),
                    reason: "no such fixture entry".to_string(),
                })
        }
    }
}

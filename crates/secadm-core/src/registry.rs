//! The process-wide set of per-jail entries.
//!
//! Lookup creates on demand, matching HardenedBSD's `get_prison_list_entry`.
//! Entries are stable for the module's lifetime once inserted, except during
//! jail destruction (`destroy_jail`) or module teardown (`Registry::drop`,
//! implicit), both of which take the registry's write lock.
//!
//! Lock ordering: registry, then jail entry — never the reverse. No
//! operation here ever holds a jail entry's lock while acquiring the
//! registry lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::jail::JailEntry;

/// Owns every jail's rule table. Construct one explicitly (no ambient
/// global) and thread it through the control-channel dispatcher and the MAC
/// hooks.
#[derive(Debug, Default)]
pub struct Registry {
    jails: RwLock<HashMap<u32, Arc<JailEntry>>>,
}

impl Registry {
    /// An empty registry with no jail entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the entry for `jail_id`, creating an empty one on first
    /// reference.
    #[must_use]
    pub fn entry(&self, jail_id: u32) -> Arc<JailEntry> {
        if let Some(entry) = self.jails.read().get(&jail_id) {
            return Arc::clone(entry);
        }

        let mut jails = self.jails.write();
        // Another writer may have created it between our read-unlock and
        // this write-lock acquisition.
        Arc::clone(
            jails
                .entry(jail_id)
                .or_insert_with(|| Arc::new(JailEntry::new(jail_id))),
        )
    }

    /// Fetch the entry for `jail_id` only if one already exists, without
    /// creating it. Enforcement hooks use this: a jail with no rules ever
    /// loaded should not allocate a table on the exec hot path.
    #[must_use]
    pub fn existing_entry(&self, jail_id: u32) -> Option<Arc<JailEntry>> {
        self.jails.read().get(&jail_id).map(Arc::clone)
    }

    /// Drain and free a destroyed jail's rule table entirely (as opposed to
    /// `flush_live`, which only empties the live index and keeps the entry
    /// around for reuse). Invoked by the `prison_destroy` MAC hook.
    pub fn destroy_jail(&self, jail_id: u32) {
        self.jails.write().remove(&jail_id);
    }

    /// Number of jails with an entry (for observability / tests only).
    #[must_use]
    pub fn jail_count(&self) -> usize {
        self.jails.read().len()
    }
}

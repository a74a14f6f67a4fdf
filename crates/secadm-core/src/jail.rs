//! Per-jail rule table: two fingerprint-keyed ordered indices (live and
//! staging) plus their id generators and counters, all behind one
//! reader-writer lock.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::rule::RuleRecord;

/// Which of a jail's two indices an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The index enforcement hooks consult.
    Live,
    /// The index `load_ruleset`/staged `add_rule` calls accumulate into,
    /// swapped into `Live` by `commit_staging`.
    Staging,
}

/// Total and per-kind rule counts for a jail's live index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JailCounts {
    /// All active and inactive live rules.
    pub total: u64,
    /// Live Integriforce rules.
    pub integriforce: u64,
    /// Live PaX rules.
    pub pax: u64,
    /// Live Extended rules (always zero today; ingestion rejects them).
    pub extended: u64,
}

/// An ordered, fingerprint-keyed table of rules. A `BTreeMap` gives O(log n)
/// point lookups (the hot path for enforcement) and a stable iteration
/// order (needed for deterministic flush/commit draining) without reaching
/// for a balanced-tree crate the rest of the workspace has no other use for.
pub type OrderedIndex = BTreeMap<u32, RuleRecord>;

#[derive(Debug, Default)]
struct JailState {
    live: OrderedIndex,
    staging: OrderedIndex,
    next_live_id: u64,
    next_staging_id: u64,
    counts: JailCounts,
}

impl JailState {
    fn counts_for(kind_mut: &mut JailCounts, record: &RuleRecord, delta: i64) {
        let apply = |field: &mut u64| {
            *field = if delta.is_negative() {
                field.saturating_sub(delta.unsigned_abs())
            } else {
                field.saturating_add(delta as u64)
            };
        };
        apply(&mut kind_mut.total);
        match record.kind {
            crate::rule::RuleKind::Integriforce { .. } => apply(&mut kind_mut.integriforce),
            crate::rule::RuleKind::Pax { .. } => apply(&mut kind_mut.pax),
            crate::rule::RuleKind::Extended => apply(&mut kind_mut.extended),
        }
    }
}

/// One jail's rule table, reachable from the [`crate::registry::Registry`]
/// by jail id. Stable for the module's lifetime once created; never moved
/// or freed except by jail destruction or module teardown (both handled by
/// the registry, not here).
#[derive(Debug)]
pub struct JailEntry {
    jail_id: u32,
    state: RwLock<JailState>,
}

impl JailEntry {
    /// A fresh, empty entry for `jail_id`.
    #[must_use]
    pub fn new(jail_id: u32) -> Self {
        Self {
            jail_id,
            state: RwLock::new(JailState::default()),
        }
    }

    /// This entry's jail id.
    #[must_use]
    pub fn jail_id(&self) -> u32 {
        self.jail_id
    }

    /// Look up a rule in the live index by fingerprint, ignoring
    /// `active == false` rules. Read-locked; the matched record is cloned
    /// out so callers (enforcement hooks) can release the lock before doing
    /// any I/O on it — a hash computation must never run with the lock held.
    #[must_use]
    pub fn lookup_active_live(&self, fingerprint: u32) -> Option<RuleRecord> {
        let state = self.state.read();
        state
            .live
            .get(&fingerprint)
            .filter(|r| r.active)
            .cloned()
    }

    /// Current live-index counters.
    #[must_use]
    pub fn counts(&self) -> JailCounts {
        self.state.read().counts
    }

    /// Fetch a rule from the live index by `rule_id` (a linear scan: the id
    /// is not the index's primary key, the fingerprint is).
    #[must_use]
    pub fn get_rule(&self, rule_id: u64) -> Option<RuleRecord> {
        self.state
            .read()
            .live
            .values()
            .find(|r| r.rule_id == rule_id)
            .cloned()
    }

    /// Whether the live index already has a rule at this fingerprint.
    /// Callers must hold `state`'s write lock across this check and the
    /// following insert (see `insert`) — checking under a read lock and
    /// inserting under a separate write lock would let two concurrent
    /// inserts both pass the check and race to occupy the same fingerprint.
    fn contains_fingerprint(state: &JailState, fingerprint: u32) -> bool {
        state.live.contains_key(&fingerprint)
    }

    /// Insert `record` (whose `rule_id`/`fingerprint` are not yet set) into
    /// `destination`, assigning both under one write-lock critical section.
    /// Returns the assigned `rule_id`, or `Duplicate` if `destination` is
    /// `Live` and a rule already occupies this fingerprint.
    pub fn insert(
        &self,
        fingerprint: u32,
        kind: crate::rule::RuleKind,
        destination: Destination,
    ) -> Result<u64, crate::error::SecadmError> {
        let mut state = self.state.write();

        if destination == Destination::Live && Self::contains_fingerprint(&state, fingerprint) {
            return Err(crate::error::SecadmError::Duplicate);
        }

        let rule_id = match destination {
            Destination::Live => {
                let id = state.next_live_id;
                state.next_live_id += 1;
                id
            }
            Destination::Staging => {
                let id = state.next_staging_id;
                state.next_staging_id += 1;
                id
            }
        };

        let record = RuleRecord {
            rule_id,
            jail_id: self.jail_id,
            active: true,
            fingerprint,
            kind,
        };

        match destination {
            Destination::Live => {
                JailState::counts_for(&mut state.counts, &record, 1);
                state.live.insert(fingerprint, record);
            }
            Destination::Staging => {
                state.staging.insert(fingerprint, record);
            }
        }

        Ok(rule_id)
    }

    /// Remove a rule from the live index by `rule_id`. A no-op, not an
    /// error, if no such rule exists.
    pub fn delete_rule(&self, rule_id: u64) {
        let mut state = self.state.write();
        let Some(fingerprint) = state
            .live
            .values()
            .find(|r| r.rule_id == rule_id)
            .map(|r| r.fingerprint)
        else {
            return;
        };
        if let Some(record) = state.live.remove(&fingerprint) {
            JailState::counts_for(&mut state.counts, &record, -1);
        }
    }

    /// Toggle a live rule's `active` flag by `rule_id`. A no-op on miss.
    pub fn set_active(&self, rule_id: u64, active: bool) {
        let mut state = self.state.write();
        if let Some(record) = state.live.values_mut().find(|r| r.rule_id == rule_id) {
            record.active = active;
        }
    }

    /// Drain and free every live rule, resetting counters. Staging is
    /// untouched.
    pub fn flush_live(&self) {
        let mut state = self.state.write();
        state.live.clear();
        state.counts = JailCounts::default();
    }

    /// Atomically replace the live index with the staged ruleset: drop the
    /// current live rules, then move every staged record into live,
    /// re-stamping `rule_id` from the live generator (matching
    /// HardenedBSD's `secadm.c`, which restarts numbering from
    /// `sp_last_id` rather than preserving staging-assigned ids) and
    /// recomputing counters. Staging ends empty.
    pub fn commit_staging(&self) {
        let mut state = self.state.write();
        state.live.clear();
        state.counts = JailCounts::default();

        let staged = std::mem::take(&mut state.staging);
        for (fingerprint, mut record) in staged {
            record.rule_id = state.next_live_id;
            state.next_live_id += 1;
            JailState::counts_for(&mut state.counts, &record, 1);
            state.live.insert(fingerprint, record);
        }
    }
}

//! Needed-set management: the persistent list of references this node has
//! been told to obtain but does not yet have.
//!
//! The set is advisory. Entries are added only after checking the blob is
//! absent, but a concurrent store can land between the check and the write;
//! higher layers tolerate stale entries, and the next
//! [`mark_refs_as_needed`](crate::FsRefStore::mark_refs_as_needed) re-filters
//! against what is actually on disk.

use serde_json::Value;
use tracing::warn;

use strand_index::IndexError;
use strand_types::RefId;

use crate::error::StoreResult;
use crate::store::FsRefStore;

impl FsRefStore {
    /// Decode the persistent needed set.
    ///
    /// Identifiers that no longer parse are logged and skipped; an
    /// undecodable set reads as empty rather than failing the caller (and
    /// is never overwritten here).
    pub fn refs_needed(&self) -> StoreResult<Vec<RefId>> {
        let missing = match self.index.read_missing_set() {
            Ok(set) => set,
            Err(IndexError::Malformed(reason)) => {
                warn!(%reason, "needed set is undecodable, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut refs = Vec::with_capacity(missing.len());
        for text in missing.keys() {
            match text.parse::<RefId>() {
                Ok(ref_id) => refs.push(ref_id),
                Err(e) => {
                    warn!(ref_id = %text, error = %e, "skipping malformed needed-set entry");
                }
            }
        }
        Ok(refs)
    }

    /// Add the subset of `refs` not present locally to the needed set, then
    /// notify listeners with the full persisted set.
    pub fn mark_refs_as_needed(&self, refs: &[RefId]) {
        let mut actually_needed = Vec::new();
        for ref_id in refs {
            match self.have_object(ref_id) {
                Ok(true) => {}
                Ok(false) => actually_needed.push(*ref_id),
                Err(e) => {
                    warn!(ref_id = %ref_id, error = %e, "cannot check store for ref");
                }
            }
        }

        if let Err(e) = self.index.update_missing_set(|set| {
            for ref_id in &actually_needed {
                set.insert(ref_id.to_string(), Value::Null);
            }
        }) {
            // Advisory: fall through and notify with whatever is persisted.
            warn!(error = %e, "failed to update needed set");
        }

        let all_needed = match self.refs_needed() {
            Ok(refs) => refs,
            Err(e) => {
                warn!(error = %e, "failed to reload needed set");
                return;
            }
        };
        self.bus.notify_refs_needed(&all_needed);
    }

    /// Drop `refs` from the needed set. Called after a successful store.
    pub(crate) fn unmark_refs_as_needed(&self, refs: &[RefId]) {
        if let Err(e) = self.index.update_missing_set(|set| {
            for ref_id in refs {
                set.remove(&ref_id.to_string());
            }
        }) {
            warn!(error = %e, "failed to update needed set");
        }
    }
}

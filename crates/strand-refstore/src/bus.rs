//! In-process pub/sub registry for store events.
//!
//! Two independent listener sets: `RefsNeeded(list)` fires after the needed
//! set changes, `RefsSaved()` fires after a blob has been durably published.
//! Dispatch is parallel with a barrier — the emitter does not continue until
//! every callback has returned — so a slow listener gives back-pressure but
//! cannot reorder events relative to the emitter's subsequent work.

use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;
use std::thread;

use tracing::warn;

use strand_types::RefId;

/// Callback invoked with the full current needed set.
pub type RefsNeededFn = Box<dyn Fn(&[RefId]) + Send + Sync>;

/// Callback invoked after each successful store.
pub type RefsSavedFn = Box<dyn Fn() + Send + Sync>;

/// Registry and fan-out for the two store events.
///
/// Registration is thread-safe. Notification holds the registry read lock
/// for the duration of the dispatch, so callbacks must not re-enter
/// registration — register listeners at startup, before events flow.
pub struct ListenerBus {
    refs_needed: RwLock<Vec<RefsNeededFn>>,
    refs_saved: RwLock<Vec<RefsSavedFn>>,
}

impl ListenerBus {
    pub fn new() -> Self {
        Self {
            refs_needed: RwLock::new(Vec::new()),
            refs_saved: RwLock::new(Vec::new()),
        }
    }

    /// Register a callback for needed-set changes.
    pub fn on_refs_needed(&self, callback: RefsNeededFn) {
        self.refs_needed
            .write()
            .expect("listener lock poisoned")
            .push(callback);
    }

    /// Register a callback for successful stores.
    pub fn on_refs_saved(&self, callback: RefsSavedFn) {
        self.refs_saved
            .write()
            .expect("listener lock poisoned")
            .push(callback);
    }

    /// Deliver the full needed set to every registered callback, in
    /// parallel, and wait for all of them to finish.
    pub fn notify_refs_needed(&self, refs: &[RefId]) {
        let listeners = self.refs_needed.read().expect("listener lock poisoned");
        thread::scope(|scope| {
            for listener in listeners.iter() {
                scope.spawn(move || {
                    if panic::catch_unwind(AssertUnwindSafe(|| listener(refs))).is_err() {
                        warn!("refs-needed listener panicked");
                    }
                });
            }
        });
    }

    /// Notify every registered callback that an object was saved, in
    /// parallel, and wait for all of them to finish.
    pub fn notify_refs_saved(&self) {
        let listeners = self.refs_saved.read().expect("listener lock poisoned");
        thread::scope(|scope| {
            for listener in listeners.iter() {
                scope.spawn(move || {
                    if panic::catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                        warn!("refs-saved listener panicked");
                    }
                });
            }
        });
    }

    /// Number of registered needed-set listeners.
    pub fn refs_needed_count(&self) -> usize {
        self.refs_needed.read().expect("listener lock poisoned").len()
    }

    /// Number of registered saved listeners.
    pub fn refs_saved_count(&self) -> usize {
        self.refs_saved.read().expect("listener lock poisoned").len()
    }
}

impl Default for ListenerBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBus")
            .field("refs_needed", &self.refs_needed_count())
            .field("refs_saved", &self.refs_saved_count())
            .finish()
    }
}

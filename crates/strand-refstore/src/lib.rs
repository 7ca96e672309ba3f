//! Content-addressed reference store for the Strand replication node.
//!
//! This crate owns the blob directory, the dual-hash metadata index, the
//! persistent set of references this node still needs, and the listener
//! registry that wakes the peering layer when either changes. The HTTP
//! transport and gossip logic live elsewhere; they drive replication
//! entirely through the [`RefStore`] trait.
//!
//! # Key Types
//!
//! - [`RefStore`] — the surface consumed by the transport and peering layers
//! - [`FsRefStore`] — the production filesystem implementation
//! - [`StoreConfig`] — root path and on-disk layout
//! - [`ListenerBus`] — pub/sub registry for `RefsNeeded` / `RefsSaved`
//!
//! # Design Rules
//!
//! 1. A blob's canonical name is the lowercase hex of its Keccak-256 digest;
//!    nothing is ever written under a non-canonical name.
//! 2. Publication is atomic: a blob is streamed to a temporary file in the
//!    store root, fsynced, and renamed into `blobs/`. Readers never observe
//!    a partial blob.
//! 3. Storing is idempotent. Re-storing existing content succeeds and
//!    changes nothing observable.
//! 4. The missing set is advisory. Mark/unmark failures are logged and
//!    reconciled on the next mark, never escalated to the caller.
//! 5. Listener callbacks run concurrently; a panicking callback cannot stop
//!    the others or fail the emitter.

pub mod bus;
pub mod config;
pub mod error;
pub mod needed;
pub mod store;
pub mod traits;

pub use bus::{ListenerBus, RefsNeededFn, RefsSavedFn};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::FsRefStore;
pub use traits::RefStore;

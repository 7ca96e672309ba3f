//! The [`RefStore`] trait defining the reference store surface.

use std::io::Read;
use std::path::PathBuf;

use strand_types::{RefId, Sha1Hash, Sha3Hash};

use crate::bus::{RefsNeededFn, RefsSavedFn};
use crate::error::StoreResult;

/// The store surface consumed by the transport and peering layers.
///
/// Implementations must be thread-safe (`Send + Sync`); the store is shared
/// across the process and called from many request handlers at once. All
/// operations may block on I/O.
pub trait RefStore: Send + Sync {
    /// Whether the blob named by `ref_id` is present locally.
    ///
    /// A SHA-1 reference whose mapping entry was never written resolves to
    /// `Ok(false)`, not an error.
    fn have_object(&self, ref_id: &RefId) -> StoreResult<bool>;

    /// Open the blob named by `ref_id` for streaming reads.
    ///
    /// Returns the read handle and the blob length in bytes. Fails with
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) if either the
    /// mapping entry or the file is missing.
    fn object(&self, ref_id: &RefId) -> StoreResult<(Box<dyn Read + Send>, u64)>;

    /// The canonical path of the blob named by `ref_id`, without opening it.
    ///
    /// For callers that serve the file through a zero-copy transport. The
    /// path stays valid after return because blobs are never deleted and
    /// rename publication is atomic.
    fn object_filepath(&self, ref_id: &RefId) -> StoreResult<PathBuf>;

    /// Ingest a byte stream and publish it under its canonical name.
    ///
    /// The stream is written once, hashed by both algorithms in the same
    /// pass, and atomically renamed into place. Storing content that is
    /// already present succeeds and returns the same digest pair. Both of
    /// the blob's identities are removed from the needed set and a
    /// `RefsSaved` notification is delivered before this returns.
    fn store_object(&self, reader: &mut dyn Read) -> StoreResult<(Sha1Hash, Sha3Hash)>;

    /// Every reference identity this store can serve, in unspecified order.
    ///
    /// Each blob appears under its Keccak-256 identity, plus its SHA-1
    /// identity when the reverse mapping resolves. Foreign files in the
    /// blob directory are skipped.
    fn all_hashes(&self) -> StoreResult<Vec<RefId>>;

    /// The persistent set of references this node still needs.
    fn refs_needed(&self) -> StoreResult<Vec<RefId>>;

    /// Add the subset of `refs` not already present locally to the needed
    /// set, then notify listeners with the full current set.
    ///
    /// Advisory: failures are logged, never returned.
    fn mark_refs_as_needed(&self, refs: &[RefId]);

    /// Register a callback for needed-set changes.
    fn on_refs_needed(&self, callback: RefsNeededFn);

    /// Register a callback for successful stores.
    fn on_refs_saved(&self, callback: RefsSavedFn);
}

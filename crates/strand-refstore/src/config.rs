use std::path::PathBuf;

use strand_types::Sha3Hash;

/// On-disk layout of a reference store.
///
/// Everything lives under one root directory:
///
/// ```text
/// <root>/
///   metadata/     index database, owned exclusively by strand-index
///   blobs/        one file per blob, filename = lowercase hex Keccak-256
///   temp-XXXXXX   transient; renamed into blobs/ on success, else deleted
/// ```
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Root directory of the store. Created on open if absent.
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the blob files.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Directory holding the metadata index database.
    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    /// Canonical path of the blob with the given Keccak-256 digest.
    pub fn blob_path(&self, sha3: &Sha3Hash) -> PathBuf {
        self.blobs_dir().join(sha3.to_hex())
    }
}

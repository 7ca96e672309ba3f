//! The filesystem-backed reference store.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

use strand_crypto::HashingWriter;
use strand_index::{IndexError, RefIndex};
use strand_types::{RefId, Sha1Hash, Sha3Hash};

use crate::bus::{ListenerBus, RefsNeededFn, RefsSavedFn};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::RefStore;

/// Prefix of in-flight temporary files in the store root.
const TEMP_PREFIX: &str = "temp-";

/// The production [`RefStore`]: blobs on the local filesystem, metadata in
/// the dual-hash index.
///
/// One store-wide mutex serializes every operation that touches the blob
/// area. The serialization cost is small and buys the guarantee that no
/// reader observes a half-written blob and no enumeration observes a
/// temporary file. `object_filepath` releases the mutex before the caller
/// opens the file; rename atomicity keeps that safe.
pub struct FsRefStore {
    pub(crate) config: StoreConfig,
    pub(crate) index: RefIndex,
    pub(crate) bus: ListenerBus,
    file_mu: Mutex<()>,
}

impl FsRefStore {
    /// Open a store rooted at the given directory, creating it if absent.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_config(StoreConfig::new(root))
    }

    /// Open a store with an explicit configuration.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root)?;
        let index = RefIndex::open(&config.metadata_dir())?;
        Ok(Self {
            config,
            index,
            bus: ListenerBus::new(),
            file_mu: Mutex::new(()),
        })
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ensure_blobs_dir(&self) -> io::Result<()> {
        fs::create_dir_all(self.config.blobs_dir())
    }

    /// Resolve a reference to the blob's canonical Keccak-256 digest,
    /// consulting the index for SHA-1 references.
    fn resolve_sha3(&self, ref_id: &RefId) -> StoreResult<Sha3Hash> {
        match ref_id {
            RefId::Sha3(sha3) => Ok(*sha3),
            RefId::Sha1(sha1) => match self.index.sha3_for_sha1(sha1) {
                Ok(sha3) => Ok(sha3),
                Err(IndexError::NotFound) => Err(StoreError::NotFound(*ref_id)),
                Err(e) => Err(e.into()),
            },
        }
    }

    pub fn have_object(&self, ref_id: &RefId) -> StoreResult<bool> {
        let _guard = self.file_mu.lock().expect("file mutex poisoned");

        let sha3 = match self.resolve_sha3(ref_id) {
            Ok(sha3) => sha3,
            Err(StoreError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match fs::metadata(self.config.blob_path(&sha3)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn object(&self, ref_id: &RefId) -> StoreResult<(Box<dyn Read + Send>, u64)> {
        let _guard = self.file_mu.lock().expect("file mutex poisoned");

        self.ensure_blobs_dir()?;
        let sha3 = self.resolve_sha3(ref_id)?;
        let file = match File::open(self.config.blob_path(&sha3)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*ref_id));
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        Ok((Box::new(file), len))
    }

    pub fn object_filepath(&self, ref_id: &RefId) -> StoreResult<PathBuf> {
        let _guard = self.file_mu.lock().expect("file mutex poisoned");

        let sha3 = self.resolve_sha3(ref_id)?;
        Ok(self.config.blob_path(&sha3))
    }

    pub fn store_object(&self, reader: &mut dyn Read) -> StoreResult<(Sha1Hash, Sha3Hash)> {
        let _guard = self.file_mu.lock().expect("file mutex poisoned");

        self.ensure_blobs_dir()?;

        // The temp file lives in the root, not blobs/, so enumeration never
        // sees it. It unlinks itself if we bail out before persisting.
        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.config.root)?;

        let mut sink = HashingWriter::new(tmp);
        io::copy(reader, &mut sink)?;
        let (mut tmp, sha1, sha3) = sink.finish();
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        // Rename within the same filesystem; replacing an existing blob of
        // identical content is success, not a conflict.
        tmp.persist(self.config.blob_path(&sha3))
            .map_err(|e| StoreError::Io(e.error))?;

        self.index.put_mapping(&sha1, &sha3)?;
        info!(sha1 = %sha1, sha3 = %sha3, "saved object");

        self.unmark_refs_as_needed(&[RefId::Sha1(sha1), RefId::Sha3(sha3)]);
        self.bus.notify_refs_saved();

        Ok((sha1, sha3))
    }

    pub fn all_hashes(&self) -> StoreResult<Vec<RefId>> {
        let _guard = self.file_mu.lock().expect("file mutex poisoned");

        self.ensure_blobs_dir()?;
        let mut refs = Vec::new();
        for entry in fs::read_dir(self.config.blobs_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            // Foreign files that do not parse as canonical names are skipped.
            let Ok(sha3) = Sha3Hash::from_hex(name) else { continue };
            refs.push(RefId::Sha3(sha3));
            // Blobs restored from backup may have no SHA-1 side; emit it
            // only when the reverse mapping resolves.
            if let Ok(sha1) = self.index.sha1_for_sha3(&sha3) {
                refs.push(RefId::Sha1(sha1));
            }
        }
        Ok(refs)
    }

    pub fn on_refs_needed(&self, callback: RefsNeededFn) {
        self.bus.on_refs_needed(callback);
    }

    pub fn on_refs_saved(&self, callback: RefsSavedFn) {
        self.bus.on_refs_saved(callback);
    }
}

impl RefStore for FsRefStore {
    fn have_object(&self, ref_id: &RefId) -> StoreResult<bool> {
        FsRefStore::have_object(self, ref_id)
    }

    fn object(&self, ref_id: &RefId) -> StoreResult<(Box<dyn Read + Send>, u64)> {
        FsRefStore::object(self, ref_id)
    }

    fn object_filepath(&self, ref_id: &RefId) -> StoreResult<PathBuf> {
        FsRefStore::object_filepath(self, ref_id)
    }

    fn store_object(&self, reader: &mut dyn Read) -> StoreResult<(Sha1Hash, Sha3Hash)> {
        FsRefStore::store_object(self, reader)
    }

    fn all_hashes(&self) -> StoreResult<Vec<RefId>> {
        FsRefStore::all_hashes(self)
    }

    fn refs_needed(&self) -> StoreResult<Vec<RefId>> {
        FsRefStore::refs_needed(self)
    }

    fn mark_refs_as_needed(&self, refs: &[RefId]) {
        FsRefStore::mark_refs_as_needed(self, refs)
    }

    fn on_refs_needed(&self, callback: RefsNeededFn) {
        FsRefStore::on_refs_needed(self, callback)
    }

    fn on_refs_saved(&self, callback: RefsSavedFn) {
        FsRefStore::on_refs_saved(self, callback)
    }
}

impl std::fmt::Debug for FsRefStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsRefStore")
            .field("root", &self.config.root)
            .finish()
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use tracing::debug;

use strand_types::{Sha1Hash, Sha3Hash};

use crate::error::{IndexError, IndexResult};

/// Key of the single serialized missing set.
const MISSING_REFS_KEY: &[u8] = b"missing-refs";

/// Suffix of a SHA-1 → SHA-3 mapping key: `<20 raw sha1 bytes> || ":sha3"`.
const SHA3_SUFFIX: &[u8] = b":sha3";

/// Suffix of a SHA-3 → SHA-1 mapping key: `<32 raw sha3 bytes> || ":sha1"`.
const SHA1_SUFFIX: &[u8] = b":sha1";

/// The decoded missing set: canonical ref-id strings used as keys, values
/// ignored. Stored as a single JSON object under `"missing-refs"`.
pub type MissingSet = BTreeMap<String, serde_json::Value>;

/// The persistent dual-hash index.
///
/// Holds three key families: the two mapping directions between a blob's
/// SHA-1 and Keccak-256 digests, and the serialized missing set. Mapping
/// entries are written once and never modified; redundant writes are
/// idempotent. Reads are snapshot-consistent and writes go through sled
/// transactions, so the missing-set read-modify-write never races other
/// index writers.
pub struct RefIndex {
    db: sled::Db,
}

impl RefIndex {
    /// Open (or create) the index database at the given directory.
    pub fn open(path: &Path) -> IndexResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Record both mapping directions for a stored blob in one transaction.
    pub fn put_mapping(&self, sha1: &Sha1Hash, sha3: &Sha3Hash) -> IndexResult<()> {
        let result: sled::transaction::TransactionResult<(), IndexError> =
            self.db.transaction(|tx| {
                tx.insert(sha1_to_sha3_key(sha1), sha3.as_bytes().to_vec())?;
                tx.insert(sha3_to_sha1_key(sha3), sha1.as_bytes().to_vec())?;
                Ok(())
            });
        unwrap_transaction(result)?;
        self.db.flush()?;
        Ok(())
    }

    /// Resolve a SHA-1 digest to the blob's canonical Keccak-256 digest.
    pub fn sha3_for_sha1(&self, sha1: &Sha1Hash) -> IndexResult<Sha3Hash> {
        match self.db.get(sha1_to_sha3_key(sha1))? {
            None => Err(IndexError::NotFound),
            Some(raw) => {
                let bytes: [u8; 32] = raw.as_ref().try_into().map_err(|_| {
                    IndexError::Malformed(format!("sha3 mapping value has {} bytes", raw.len()))
                })?;
                Ok(Sha3Hash::from(bytes))
            }
        }
    }

    /// Resolve a canonical Keccak-256 digest to the blob's SHA-1 digest.
    pub fn sha1_for_sha3(&self, sha3: &Sha3Hash) -> IndexResult<Sha1Hash> {
        match self.db.get(sha3_to_sha1_key(sha3))? {
            None => Err(IndexError::NotFound),
            Some(raw) => {
                let bytes: [u8; 20] = raw.as_ref().try_into().map_err(|_| {
                    IndexError::Malformed(format!("sha1 mapping value has {} bytes", raw.len()))
                })?;
                Ok(Sha1Hash::from(bytes))
            }
        }
    }

    /// Decode the persistent missing set. Absent key means the empty set.
    pub fn read_missing_set(&self) -> IndexResult<MissingSet> {
        match self.db.get(MISSING_REFS_KEY)? {
            None => Ok(MissingSet::new()),
            Some(raw) => serde_json::from_slice(&raw)
                .map_err(|e| IndexError::Malformed(format!("missing set: {e}"))),
        }
    }

    /// Replace the persistent missing set.
    pub fn write_missing_set(&self, set: &MissingSet) -> IndexResult<()> {
        let encoded = serde_json::to_vec(set)
            .map_err(|e| IndexError::Malformed(format!("missing set: {e}")))?;
        self.db.insert(MISSING_REFS_KEY, encoded)?;
        self.db.flush()?;
        Ok(())
    }

    /// Load, mutate, and store the missing set in a single transaction.
    ///
    /// `apply` may run more than once if the transaction conflicts and
    /// retries, so it must be a pure function of the set it is given. If the
    /// stored value does not decode, the transaction aborts and the value is
    /// left untouched.
    pub fn update_missing_set(&self, apply: impl Fn(&mut MissingSet)) -> IndexResult<()> {
        let result: sled::transaction::TransactionResult<(), IndexError> =
            self.db.transaction(|tx| {
                let mut set: MissingSet = match tx.get(MISSING_REFS_KEY)? {
                    None => MissingSet::new(),
                    Some(raw) => serde_json::from_slice(&raw).map_err(|e| {
                        ConflictableTransactionError::Abort(IndexError::Malformed(format!(
                            "missing set: {e}"
                        )))
                    })?,
                };
                apply(&mut set);
                let encoded = serde_json::to_vec(&set).map_err(|e| {
                    ConflictableTransactionError::Abort(IndexError::Malformed(format!(
                        "missing set: {e}"
                    )))
                })?;
                tx.insert(MISSING_REFS_KEY, encoded)?;
                Ok(())
            });
        unwrap_transaction(result)?;
        self.db.flush()?;
        Ok(())
    }

    /// Log every mapping entry at debug level.
    pub fn debug_dump(&self) -> IndexResult<()> {
        for entry in self.db.iter() {
            let (key, value) = entry?;
            if let Some(sha1) = key.strip_suffix(SHA3_SUFFIX) {
                debug!(
                    key = format!("{}:sha3", hex::encode(sha1)),
                    value = hex::encode(&value),
                    "index entry"
                );
            } else if let Some(sha3) = key.strip_suffix(SHA1_SUFFIX) {
                debug!(
                    key = format!("{}:sha1", hex::encode(sha3)),
                    value = hex::encode(&value),
                    "index entry"
                );
            } else if key.as_ref() == MISSING_REFS_KEY {
                debug!(
                    value = String::from_utf8_lossy(&value).into_owned(),
                    "missing set"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RefIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefIndex")
            .field("entries", &self.db.len())
            .finish()
    }
}

fn sha1_to_sha3_key(sha1: &Sha1Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + SHA3_SUFFIX.len());
    key.extend_from_slice(sha1.as_bytes());
    key.extend_from_slice(SHA3_SUFFIX);
    key
}

fn sha3_to_sha1_key(sha3: &Sha3Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + SHA1_SUFFIX.len());
    key.extend_from_slice(sha3.as_bytes());
    key.extend_from_slice(SHA1_SUFFIX);
    key
}

fn unwrap_transaction<T>(result: sled::transaction::TransactionResult<T, IndexError>) -> IndexResult<T> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => IndexError::Db(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_index() -> (tempfile::TempDir, RefIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = RefIndex::open(dir.path()).unwrap();
        (dir, index)
    }

    fn sample_pair() -> (Sha1Hash, Sha3Hash) {
        (Sha1Hash::from([0x11; 20]), Sha3Hash::from([0x33; 32]))
    }

    // -----------------------------------------------------------------------
    // Mapping entries
    // -----------------------------------------------------------------------

    #[test]
    fn put_mapping_resolves_both_directions() {
        let (_dir, index) = temp_index();
        let (sha1, sha3) = sample_pair();
        index.put_mapping(&sha1, &sha3).unwrap();

        assert_eq!(index.sha3_for_sha1(&sha1).unwrap(), sha3);
        assert_eq!(index.sha1_for_sha3(&sha3).unwrap(), sha1);
    }

    #[test]
    fn lookup_miss_is_not_found() {
        let (_dir, index) = temp_index();
        let (sha1, sha3) = sample_pair();
        assert!(matches!(
            index.sha3_for_sha1(&sha1),
            Err(IndexError::NotFound)
        ));
        assert!(matches!(
            index.sha1_for_sha3(&sha3),
            Err(IndexError::NotFound)
        ));
    }

    #[test]
    fn put_mapping_is_idempotent() {
        let (_dir, index) = temp_index();
        let (sha1, sha3) = sample_pair();
        index.put_mapping(&sha1, &sha3).unwrap();
        index.put_mapping(&sha1, &sha3).unwrap();
        assert_eq!(index.sha3_for_sha1(&sha1).unwrap(), sha3);
    }

    #[test]
    fn mappings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (sha1, sha3) = sample_pair();
        {
            let index = RefIndex::open(dir.path()).unwrap();
            index.put_mapping(&sha1, &sha3).unwrap();
        }
        let index = RefIndex::open(dir.path()).unwrap();
        assert_eq!(index.sha3_for_sha1(&sha1).unwrap(), sha3);
    }

    // -----------------------------------------------------------------------
    // Missing set
    // -----------------------------------------------------------------------

    #[test]
    fn missing_set_starts_empty() {
        let (_dir, index) = temp_index();
        assert!(index.read_missing_set().unwrap().is_empty());
    }

    #[test]
    fn update_missing_set_adds_and_removes() {
        let (_dir, index) = temp_index();
        index
            .update_missing_set(|set| {
                set.insert("sha3:aaaa".to_string(), serde_json::Value::Null);
                set.insert("sha3:bbbb".to_string(), serde_json::Value::Null);
            })
            .unwrap();
        assert_eq!(index.read_missing_set().unwrap().len(), 2);

        index
            .update_missing_set(|set| {
                set.remove("sha3:aaaa");
            })
            .unwrap();
        let set = index.read_missing_set().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("sha3:bbbb"));
    }

    #[test]
    fn write_missing_set_replaces() {
        let (_dir, index) = temp_index();
        let mut set = MissingSet::new();
        set.insert("sha1:cafe".to_string(), serde_json::Value::Null);
        index.write_missing_set(&set).unwrap();
        assert_eq!(index.read_missing_set().unwrap(), set);
    }

    #[test]
    fn malformed_missing_set_is_reported_not_overwritten() {
        let (_dir, index) = temp_index();
        index.db.insert(MISSING_REFS_KEY, &b"not json"[..]).unwrap();

        assert!(matches!(
            index.read_missing_set(),
            Err(IndexError::Malformed(_))
        ));
        assert!(matches!(
            index.update_missing_set(|_| {}),
            Err(IndexError::Malformed(_))
        ));
        // The stored value is untouched after the aborted update.
        let raw = index.db.get(MISSING_REFS_KEY).unwrap().unwrap();
        assert_eq!(raw.as_ref(), b"not json");
    }

    #[test]
    fn missing_set_is_stored_as_json_object() {
        let (_dir, index) = temp_index();
        index
            .update_missing_set(|set| {
                set.insert("sha3:dead".to_string(), serde_json::Value::Null);
            })
            .unwrap();
        let raw = index.db.get(MISSING_REFS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(value.is_object());
        assert!(value.get("sha3:dead").unwrap().is_null());
    }

    // -----------------------------------------------------------------------
    // Key schema
    // -----------------------------------------------------------------------

    #[test]
    fn mapping_keys_use_raw_digest_plus_suffix() {
        let (_dir, index) = temp_index();
        let (sha1, sha3) = sample_pair();
        index.put_mapping(&sha1, &sha3).unwrap();

        let mut key = sha1.as_bytes().to_vec();
        key.extend_from_slice(b":sha3");
        let value = index.db.get(key).unwrap().unwrap();
        assert_eq!(value.as_ref(), sha3.as_bytes());

        let mut key = sha3.as_bytes().to_vec();
        key.extend_from_slice(b":sha1");
        let value = index.db.get(key).unwrap().unwrap();
        assert_eq!(value.as_ref(), sha1.as_bytes());
    }

    #[test]
    fn debug_dump_tolerates_all_key_families() {
        let (_dir, index) = temp_index();
        let (sha1, sha3) = sample_pair();
        index.put_mapping(&sha1, &sha3).unwrap();
        index
            .update_missing_set(|set| {
                set.insert("sha3:beef".to_string(), serde_json::Value::Null);
            })
            .unwrap();
        index.debug_dump().unwrap();
    }
}

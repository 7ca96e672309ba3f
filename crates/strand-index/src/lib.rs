//! Persistent dual-hash index for the Strand reference store.
//!
//! Maps each stored blob's SHA-1 digest to its canonical Keccak-256 digest
//! and back, and holds the serialized set of references this node still
//! needs. Backed by a `sled` database owned exclusively by this crate;
//! callers never touch the key schema directly.
//!
//! # Key Types
//!
//! - [`RefIndex`] — the index handle; all access goes through short
//!   transactions
//! - [`MissingSet`] — the decoded `"missing-refs"` value
//! - [`IndexError`] — lookup misses, database failures, malformed entries

pub mod error;
pub mod index;

pub use error::{IndexError, IndexResult};
pub use index::{MissingSet, RefIndex};

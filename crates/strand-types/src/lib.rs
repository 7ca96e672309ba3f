//! Foundation types for the Strand reference store.
//!
//! This crate provides the digest and reference-identifier types used
//! throughout the Strand node. Every other Strand crate depends on
//! `strand-types`.
//!
//! # Key Types
//!
//! - [`Sha1Hash`] — a 20-byte SHA-1 digest
//! - [`Sha3Hash`] — a 32-byte Keccak-256 digest (the legacy pre-standard
//!   SHA-3 variant this system was built on)
//! - [`HashAlg`] — the algorithm tag distinguishing the two families
//! - [`RefId`] — a tagged digest naming a stored blob, with the canonical
//!   `"<alg>:<hex>"` text form used as a persistent key

pub mod error;
pub mod hash;
pub mod ref_id;

pub use error::TypeError;
pub use hash::{Sha1Hash, Sha3Hash};
pub use ref_id::{HashAlg, RefId};

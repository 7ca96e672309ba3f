//! Cryptographic primitives for the Strand reference store.
//!
//! Provides the dual SHA-1 / Keccak-256 digest used to name blobs, both as
//! a one-shot function and as a streaming [`std::io::Write`] sink.
//!
//! All digest operations wrap established libraries — no custom cryptography.

pub mod hasher;

pub use hasher::{DualHasher, HashingWriter};

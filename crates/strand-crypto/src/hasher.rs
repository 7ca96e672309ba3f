use std::io::{self, Write};

use sha1::{Digest, Sha1};
use sha3::Keccak256;

use strand_types::{Sha1Hash, Sha3Hash};

/// Computes the SHA-1 and Keccak-256 digests of a byte stream in one pass.
///
/// Every chunk fed to [`update`](Self::update) goes to both hashers, so the
/// stream is never buffered or replayed. Keccak-256 here is the legacy
/// pre-standard variant (what this system calls "sha3"), not NIST SHA3-256.
pub struct DualHasher {
    sha1: Sha1,
    keccak: Keccak256,
}

impl DualHasher {
    pub fn new() -> Self {
        Self {
            sha1: Sha1::new(),
            keccak: Keccak256::new(),
        }
    }

    /// Feed a chunk to both hashers.
    pub fn update(&mut self, chunk: &[u8]) {
        self.sha1.update(chunk);
        self.keccak.update(chunk);
    }

    /// Consume the hasher and return both digests.
    pub fn finalize(self) -> (Sha1Hash, Sha3Hash) {
        let sha1: [u8; 20] = self.sha1.finalize().into();
        let keccak: [u8; 32] = self.keccak.finalize().into();
        (Sha1Hash::from(sha1), Sha3Hash::from(keccak))
    }

    /// One-shot digest of an in-memory byte slice.
    pub fn digest(data: &[u8]) -> (Sha1Hash, Sha3Hash) {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl Default for DualHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// A write sink that tees every chunk into an inner writer and a
/// [`DualHasher`].
///
/// This is how a blob is ingested: `io::copy` drives the reader into a
/// `HashingWriter` wrapping the destination file, so the payload is written
/// and hashed by both algorithms in a single pass without staging it in
/// memory.
pub struct HashingWriter<W> {
    inner: W,
    hasher: DualHasher,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: DualHasher::new(),
        }
    }

    /// Unwrap the inner writer and return it with both digests.
    pub fn finish(self) -> (W, Sha1Hash, Sha3Hash) {
        let (sha1, sha3) = self.hasher.finalize();
        (self.inner, sha1, sha3)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Only bytes the inner writer accepted count toward the digests.
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vectors for b"hello" and the empty input.
    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    const HELLO_SHA3: &str = "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8";
    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const EMPTY_SHA3: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

    #[test]
    fn known_vectors() {
        let (sha1, sha3) = DualHasher::digest(b"hello");
        assert_eq!(sha1.to_hex(), HELLO_SHA1);
        assert_eq!(sha3.to_hex(), HELLO_SHA3);
    }

    #[test]
    fn empty_input_vectors() {
        let (sha1, sha3) = DualHasher::digest(b"");
        assert_eq!(sha1.to_hex(), EMPTY_SHA1);
        assert_eq!(sha3.to_hex(), EMPTY_SHA3);
    }

    #[test]
    fn chunked_update_matches_one_shot() {
        let mut hasher = DualHasher::new();
        hasher.update(b"he");
        hasher.update(b"l");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize(), DualHasher::digest(b"hello"));
    }

    #[test]
    fn writer_tees_into_inner_and_hashers() {
        let mut writer = HashingWriter::new(Vec::new());
        io::copy(&mut &b"hello"[..], &mut writer).unwrap();
        let (inner, sha1, sha3) = writer.finish();
        assert_eq!(inner, b"hello");
        assert_eq!(sha1.to_hex(), HELLO_SHA1);
        assert_eq!(sha3.to_hex(), HELLO_SHA3);
    }

    #[test]
    fn writer_handles_large_streams() {
        // Bigger than any single io::copy chunk, to exercise repeated writes.
        let data = vec![0x5a_u8; 1 << 20];
        let mut writer = HashingWriter::new(io::sink());
        writer.write_all(&data).unwrap();
        let (_, sha1, sha3) = writer.finish();
        assert_eq!((sha1, sha3), DualHasher::digest(&data));
    }

    #[test]
    fn writer_counts_only_accepted_bytes() {
        // A writer that accepts input two bytes at a time.
        struct Trickle(Vec<u8>);
        impl Write for Trickle {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let n = buf.len().min(2);
                self.0.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = HashingWriter::new(Trickle(Vec::new()));
        writer.write_all(b"hello").unwrap();
        let (inner, sha1, _) = writer.finish();
        assert_eq!(inner.0, b"hello");
        assert_eq!(sha1.to_hex(), HELLO_SHA1);
    }
}

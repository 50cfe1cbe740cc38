//! Digest hashing and 32-bit word extraction for ring placement.
//!
//! Every client of a cluster must hash identically, bit for bit, or keys
//! migrate between servers depending on who hashed them. The scheme is:
//! digest the input (MD5 by default), then read 32-bit words out of the
//! digest with the fixed byte-grouping rule of [`extract_word`].
//!
//! [`RingHasher`] is the seam for substituting another digest. Substitutes
//! must keep the extraction rule, and anything other than [`Md5Hasher`]
//! gives up compatibility with rings built by other clients.

use md5::{Digest, Md5};

/// Extract the 32-bit word at `index` from a digest.
///
/// Reads the four bytes starting at `index * 4` and combines them
/// little-endian, regardless of the digest's own byte order:
///
/// ```text
/// word = b[3] << 24 | b[2] << 16 | b[1] << 8 | b[0]
/// ```
///
/// A 16-byte digest therefore yields words 0 through 3.
///
/// # Panics
///
/// Panics if the digest holds fewer than `(index + 1) * 4` bytes. Ring
/// builders gate on [`RingHasher::words_per_digest`] before drawing words.
pub fn extract_word(digest: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([digest[at], digest[at + 1], digest[at + 2], digest[at + 3]])
}

/// Hashing scheme used for ring point generation and key lookup.
///
/// Implementations must be deterministic and produce a fixed-length digest.
/// Weighted rings draw four words per digest, so a 32-bit scheme such as
/// [`Crc32Hasher`] is only usable on unweighted rings.
pub trait RingHasher: Send + Sync {
    /// Digest `input`. The output length is fixed per implementation.
    fn digest(&self, input: &[u8]) -> Vec<u8>;

    /// Number of 32-bit words one digest yields.
    fn words_per_digest(&self) -> usize;

    /// Hash `input` down to a single 32-bit value (word 0 of the digest).
    ///
    /// Schemes that natively produce 32 bits override this to skip the
    /// digest allocation.
    fn hash32(&self, input: &[u8]) -> u32 {
        extract_word(&self.digest(input), 0)
    }
}

/// The default scheme: MD5, 16-byte digest, four words.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Hasher;

impl RingHasher for Md5Hasher {
    fn digest(&self, input: &[u8]) -> Vec<u8> {
        Md5::digest(input).to_vec()
    }

    fn words_per_digest(&self) -> usize {
        4
    }
}

/// CRC-32 (IEEE), a direct 32-bit scheme: one word per digest.
///
/// Cheaper than a cryptographic digest, but too narrow for weighted rings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Hasher;

impl RingHasher for Crc32Hasher {
    fn digest(&self, input: &[u8]) -> Vec<u8> {
        crc32fast::hash(input).to_le_bytes().to_vec()
    }

    fn words_per_digest(&self) -> usize {
        1
    }

    fn hash32(&self, input: &[u8]) -> u32 {
        crc32fast::hash(input)
    }
}

/// Hash arbitrary bytes with the default ring scheme (MD5 word 0).
///
/// For callers that need ring-compatible hashing outside a continuum, e.g.
/// precomputing key placements or debugging a placement disagreement
/// between two clients.
pub fn ring_hash(input: impl AsRef<[u8]>) -> u32 {
    Md5Hasher.hash32(input.as_ref())
}

//! Per-block hash function
//!
//! Every block (full, trailing, and the concatenated digest chain) is hashed
//! as one fully materialized byte sequence. The hasher carries no state
//! between calls.

use sha1::{Digest, Sha1};
use std::io::Read;

use crate::error::QetagResult;
use crate::BLOCK_DIGEST_SIZE;

/// A 20-byte block digest
pub type BlockDigest = [u8; BLOCK_DIGEST_SIZE];

/// Hash function applied to each block and to the digest chain.
pub trait BlockHasher {
    /// Hash `data` in one shot.
    fn hash_block(&self, data: &[u8]) -> QetagResult<BlockDigest>;
}

/// SHA-1, the only hash the qetag scheme defines
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl BlockHasher for Sha1Hasher {
    fn hash_block(&self, data: &[u8]) -> QetagResult<BlockDigest> {
        hash_reader(data)
    }
}

/// SHA-1 of everything `reader` yields, propagating read errors.
pub fn hash_reader<R: Read>(mut reader: R) -> QetagResult<BlockDigest> {
    let mut hasher = Sha1::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hex(d: &BlockDigest) -> String {
        d.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn empty_input_hashes_to_sha1_of_nothing() {
        let d = Sha1Hasher.hash_block(&[]).unwrap();
        assert_eq!(hex(&d), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn known_sha1_vector() {
        let d = Sha1Hasher.hash_block(b"abc").unwrap();
        assert_eq!(hex(&d), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn reader_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("source went away"))
            }
        }

        let err = hash_reader(Broken).unwrap_err();
        assert!(err.to_string().contains("source went away"));
    }

    proptest! {
        #[test]
        fn slice_and_reader_agree(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            let a = Sha1Hasher.hash_block(&data).unwrap();
            let b = hash_reader(std::io::Cursor::new(&data)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}

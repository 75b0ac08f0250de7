//! Block accumulator and digest combiner
//!
//! Bytes are copied into a single reusable 4 MiB buffer. Each time the buffer
//! fills, it is hashed and the 20-byte digest is appended to the block chain.
//! Finalizing hashes the trailing partial block (if any) and combines:
//!
//! ```text
//! total_len <= BLOCK_SIZE : 0x16 || chain[0]
//! total_len >  BLOCK_SIZE : 0x96 || SHA1(chain[0] || chain[1] || ...)
//! ```
//!
//! A `QetagDigest` is a plain owned value with no interior synchronization;
//! sharing one instance across threads requires an external lock.

use std::fmt;
use std::io;

use crate::error::QetagResult;
use crate::etag::Etag;
use crate::hasher::{BlockDigest, BlockHasher, Sha1Hasher};
use crate::{BLOCK_SIZE, ETAG_SIZE, MULTI_BLOCK_MARKER, SINGLE_BLOCK_MARKER};

/// Incremental qetag accumulator.
///
/// After `update` returns an error the instance is in an unspecified state
/// and must be `reset` (or dropped) before further use.
pub struct QetagDigest<H: BlockHasher = Sha1Hasher> {
    /// Bytes absorbed since construction or the last reset
    total_len: u64,
    /// Current block; always exactly `BLOCK_SIZE` long, never reallocated
    buffer: Box<[u8]>,
    /// Filled prefix of `buffer`
    cursor: usize,
    /// One digest per completed full block, in order
    block_digests: Vec<BlockDigest>,
    hasher: H,
}

impl QetagDigest<Sha1Hasher> {
    pub fn new() -> Self {
        Self::with_hasher(Sha1Hasher)
    }
}

impl Default for QetagDigest<Sha1Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: BlockHasher> QetagDigest<H> {
    /// Build an empty accumulator around a custom block hasher.
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            total_len: 0,
            buffer: vec![0u8; BLOCK_SIZE].into_boxed_slice(),
            cursor: 0,
            block_digests: Vec::new(),
            hasher,
        }
    }

    /// Absorb `data`, hashing every block it completes.
    ///
    /// Returns the number of bytes consumed, which is `data.len()` on success.
    pub fn update(&mut self, mut data: &[u8]) -> QetagResult<usize> {
        let mut consumed = 0;

        while !data.is_empty() {
            let n = data.len().min(BLOCK_SIZE - self.cursor);
            self.buffer[self.cursor..self.cursor + n].copy_from_slice(&data[..n]);
            self.cursor += n;
            self.total_len += n as u64;
            consumed += n;
            data = &data[n..];

            if self.cursor == BLOCK_SIZE {
                let digest = self.hasher.hash_block(&self.buffer)?;
                self.block_digests.push(digest);
                self.cursor = 0;
                tracing::trace!(
                    block = self.block_digests.len() - 1,
                    total_len = self.total_len,
                    "flushed full block"
                );
            }
        }

        Ok(consumed)
    }

    /// Combine the block chain into the final etag.
    ///
    /// Does not mutate the accumulator: calling it twice, or absorbing more
    /// data afterwards, behaves as if it had never been called.
    pub fn finalize(&self) -> QetagResult<Etag> {
        let mut chain = self.block_digests.clone();
        // An empty input still hashes one (empty) trailing block.
        if self.cursor > 0 || self.total_len == 0 {
            chain.push(self.hasher.hash_block(&self.buffer[..self.cursor])?);
        }

        let etag = match chain.as_slice() {
            [only] if self.total_len <= BLOCK_SIZE as u64 => {
                Etag::from_parts(SINGLE_BLOCK_MARKER, only)
            }
            _ => {
                let combined = self.hasher.hash_block(chain.as_flattened())?;
                Etag::from_parts(MULTI_BLOCK_MARKER, &combined)
            }
        };

        tracing::debug!(
            total_len = self.total_len,
            blocks = chain.len(),
            multi_block = etag.is_multi_block(),
            "finalized qetag"
        );
        Ok(etag)
    }

    /// Finalize and render as URL-safe base64.
    pub fn etag(&self) -> QetagResult<String> {
        Ok(self.finalize()?.encoded())
    }

    /// Return to the empty state, keeping the block buffer allocation.
    pub fn reset(&mut self) {
        self.total_len = 0;
        self.cursor = 0;
        self.block_digests.clear();
    }

    /// Total bytes absorbed.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Number of full blocks hashed so far.
    pub fn block_count(&self) -> usize {
        self.block_digests.len()
    }

    /// Bytes sitting in the partial trailing block.
    pub fn buffered_len(&self) -> usize {
        self.cursor
    }

    /// Length of the raw finalized output.
    pub fn output_size(&self) -> usize {
        ETAG_SIZE
    }
}

impl<H: BlockHasher> io::Write for QetagDigest<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf).map_err(|e| match e {
            crate::QetagError::Io(io_err) => io_err,
            other => io::Error::other(other),
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<H: BlockHasher> fmt::Debug for QetagDigest<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QetagDigest")
            .field("total_len", &self.total_len)
            .field("cursor", &self.cursor)
            .field("blocks", &self.block_digests.len())
            .finish_non_exhaustive()
    }
}

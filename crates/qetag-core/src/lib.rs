//! qetag-core: content-derived etags compatible with Qiniu's `qetag` scheme
//!
//! # Overview
//! - `digest`: the block accumulator and digest combiner (`QetagDigest`)
//! - `hasher`: the per-block hash seam (`BlockHasher`, SHA-1 by default)
//! - `etag`: the 21-byte result and its URL-safe base64 presentation
//! - `io`: convenience helpers that feed readers, files and slices
//! - `config`: TOML configuration schema shared with the CLI
//!
//! Scheme:
//! ```text
//! len <= 4 MiB : 0x16 || SHA1(data)
//! len >  4 MiB : 0x96 || SHA1(SHA1(block_0) || SHA1(block_1) || ...)
//! etag         : base64url(21 bytes)
//! ```

pub mod config;
pub mod digest;
pub mod error;
pub mod etag;
pub mod hasher;
pub mod io;

pub use config::QetagConfig;
pub use digest::QetagDigest;
pub use error::{QetagError, QetagResult};
pub use etag::{encode, Etag};
pub use hasher::{hash_reader, BlockDigest, BlockHasher, Sha1Hasher};
pub use io::{etag_bytes, etag_file, etag_reader};

/// log2 of the block size
pub const BLOCK_BITS: u32 = 22;

/// Size of one hashed block (4 MiB)
pub const BLOCK_SIZE: usize = 1 << BLOCK_BITS;

/// Size of a single block digest (SHA-1, 160-bit)
pub const BLOCK_DIGEST_SIZE: usize = 20;

/// Size of the finalized etag: marker byte + block digest
pub const ETAG_SIZE: usize = 1 + BLOCK_DIGEST_SIZE;

/// Marker for inputs of at most one block
pub const SINGLE_BLOCK_MARKER: u8 = 0x16;

/// Marker for inputs spanning more than one block
pub const MULTI_BLOCK_MARKER: u8 = 0x96;

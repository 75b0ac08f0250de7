//! Helpers that feed slices, readers and files through a `QetagDigest`
//!
//! The accumulator owns block alignment, so reads can use any buffer size.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::digest::QetagDigest;
use crate::error::{QetagError, QetagResult};
use crate::etag::Etag;

/// Etag of an in-memory slice.
pub fn etag_bytes(data: &[u8]) -> QetagResult<Etag> {
    let mut digest = QetagDigest::new();
    digest.update(data)?;
    digest.finalize()
}

/// Etag and byte count of everything `reader` yields, read
/// `read_buffer_size` bytes at a time. `on_read` sees each read's length.
pub fn etag_reader<R, F>(
    mut reader: R,
    read_buffer_size: usize,
    mut on_read: F,
) -> QetagResult<(Etag, u64)>
where
    R: Read,
    F: FnMut(u64),
{
    if read_buffer_size == 0 {
        return Err(QetagError::Config("read buffer size must be > 0".into()));
    }

    let mut digest = QetagDigest::new();
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        digest.update(&buf[..n])?;
        on_read(n as u64);
    }

    Ok((digest.finalize()?, digest.total_len()))
}

/// Etag and size of a file on disk.
pub fn etag_file<F: FnMut(u64)>(
    path: &Path,
    read_buffer_size: usize,
    on_read: F,
) -> Result<(Etag, u64)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening file for etag: {}", path.display()))?;

    etag_reader(file, read_buffer_size, on_read)
        .with_context(|| format!("computing etag: {}", path.display()))
}

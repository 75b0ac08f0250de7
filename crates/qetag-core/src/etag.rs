//! The finalized 21-byte etag and its URL-safe base64 presentation

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{QetagError, QetagResult};
use crate::hasher::BlockDigest;
use crate::{ETAG_SIZE, MULTI_BLOCK_MARKER, SINGLE_BLOCK_MARKER};

/// Render a raw 21-byte etag as padded URL-safe base64 (28 chars).
pub fn encode(raw: &[u8; ETAG_SIZE]) -> String {
    URL_SAFE.encode(raw)
}

/// A finalized etag: marker byte followed by a 20-byte SHA-1 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Etag {
    marker: u8,
    digest: BlockDigest,
}

impl Etag {
    pub(crate) fn from_parts(marker: u8, digest: &BlockDigest) -> Self {
        Etag {
            marker,
            digest: *digest,
        }
    }

    /// Wrap raw bytes, checking the marker byte.
    pub fn from_bytes(raw: [u8; ETAG_SIZE]) -> QetagResult<Self> {
        let [marker, digest @ ..] = raw;
        match marker {
            SINGLE_BLOCK_MARKER | MULTI_BLOCK_MARKER => Ok(Etag { marker, digest }),
            other => Err(QetagError::InvalidEtag(format!(
                "unknown marker byte 0x{other:02x}"
            ))),
        }
    }

    /// Decode a URL-safe base64 etag string.
    pub fn parse(s: &str) -> QetagResult<Self> {
        let bytes = URL_SAFE
            .decode(s.trim())
            .map_err(|e| QetagError::InvalidEtag(format!("'{s}': {e}")))?;
        let raw: [u8; ETAG_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            QetagError::InvalidEtag(format!(
                "'{s}': expected {ETAG_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::from_bytes(raw)
    }

    /// The raw 21-byte form.
    pub fn to_bytes(&self) -> [u8; ETAG_SIZE] {
        let mut raw = [0u8; ETAG_SIZE];
        raw[0] = self.marker;
        raw[1..].copy_from_slice(&self.digest);
        raw
    }

    pub fn marker(&self) -> u8 {
        self.marker
    }

    /// True when the input was larger than one block.
    pub fn is_multi_block(&self) -> bool {
        self.marker() == MULTI_BLOCK_MARKER
    }

    /// The 20-byte digest after the marker.
    pub fn hash(&self) -> &BlockDigest {
        &self.digest
    }

    /// URL-safe base64 form, as published by the storage service.
    pub fn encoded(&self) -> String {
        encode(&self.to_bytes())
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

impl fmt::Debug for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Etag").field(&self.encoded()).finish()
    }
}

impl FromStr for Etag {
    type Err = QetagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Etag> for [u8; ETAG_SIZE] {
    fn from(etag: Etag) -> Self {
        etag.to_bytes()
    }
}

impl Serialize for Etag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for Etag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Etag::parse(&s).map_err(serde::de::Error::custom)
    }
}

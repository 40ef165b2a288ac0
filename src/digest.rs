//! Content digests in the `sha256:<hex>` form used by OCI registries.
//!
//! [`sha256_reader`] hashes a byte stream in one forward pass with a fixed
//! buffer, returning the [`Digest`] together with the number of bytes seen so
//! descriptors can be built from a single read of the content.

use crate::error::{PackError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// The only digest algorithm this crate produces or accepts.
pub const DIGEST_ALGORITHM: &str = "sha256";

const DIGEST_HEX_LEN: usize = 64;
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A SHA-256 content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    hex: String,
}

impl Digest {
    /// Builds a digest from a bare 64-character lowercase hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != DIGEST_HEX_LEN {
            return Err(PackError::Digest(format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                hex.len()
            )));
        }
        if let Some(bad) = hex
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(PackError::Digest(format!("invalid hex character '{bad}'")));
        }
        Ok(Self {
            hex: hex.to_string(),
        })
    }

    pub fn algorithm(&self) -> &'static str {
        DIGEST_ALGORITHM
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Converts into the `oci-spec` representation used inside descriptors.
    pub fn to_oci(&self) -> Result<oci_spec::image::Digest> {
        oci_spec::image::Digest::from_str(&self.to_string())
            .map_err(|e| PackError::Digest(e.to_string()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", DIGEST_ALGORITHM, self.hex)
    }
}

impl FromStr for Digest {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| PackError::Digest(format!("missing algorithm prefix in '{s}'")))?;
        if algorithm != DIGEST_ALGORITHM {
            return Err(PackError::Digest(format!(
                "unsupported algorithm '{algorithm}'"
            )));
        }
        Self::from_hex(hex)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Hashes everything `reader` yields, returning the digest and byte count.
pub fn sha256_reader<R: Read>(mut reader: R) -> Result<(Digest, u64)> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }

    let hex = hex::encode(hasher.finalize());
    Ok((Digest { hex }, total))
}

pub fn sha256_bytes(bytes: &[u8]) -> Digest {
    Digest {
        hex: hex::encode(Sha256::digest(bytes)),
    }
}

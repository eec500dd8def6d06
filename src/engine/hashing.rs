//! Segment hashing

use anyhow::Result;
use blake3::Hasher;

use crate::Digest;

/// Maps segment bytes to a digest. Must be pure: workers call it concurrently on different inputs.
pub trait SegmentHasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> Result<Digest>;

    /// Short algorithm name for log lines.
    fn name(&self) -> &'static str;
}

/// BLAKE3, 32-byte digest.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl SegmentHasher for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> Result<Digest> {
        let mut hasher = Hasher::new();
        hasher.update(data);
        Ok(Digest::from(*hasher.finalize().as_bytes()))
    }

    fn name(&self) -> &'static str {
        "blake3"
    }
}

/// Hash `data` with BLAKE3 and return lowercase hex.
pub fn hash_hex(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}


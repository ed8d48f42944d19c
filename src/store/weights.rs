//! Raw LoRA weights as loaded from storage

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Parameter deltas of one LoRA file.
///
/// The bytes are kept opaque; parsing the checkpoint format belongs to
/// whatever performs the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet {
    path: PathBuf,
    data: Vec<u8>,
    fingerprint: String,
}

impl WeightSet {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        let fingerprint = Self::compute_fingerprint(&data);
        Self {
            path: path.into(),
            data,
            fingerprint,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// SHA-256 of the raw bytes, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

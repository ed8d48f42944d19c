//! Weight Store: resolves LoRA names to files and loads their weights
//!
//! The store is the narrow interface between the nodes and everything they
//! do not own: the LoRA folder layout, the checkpoint format and the merge
//! arithmetic. Nodes only pass logical names and strength scalars through.

mod directory;
mod memory;
mod weights;

pub use directory::DirectoryStore;
pub use memory::InMemoryStore;
pub use weights::WeightSet;

use crate::error::Result;
use crate::model::{AppliedPatch, EncoderHandle, ModelHandle};
use std::path::{Path, PathBuf};

/// Access to LoRA weight files
pub trait WeightStore: Send + Sync {
    /// Logical names of every LoRA the store can resolve
    fn list(&self) -> Vec<String>;

    /// Map a logical LoRA name to the path of its weight file
    fn resolve(&self, name: &str) -> Result<PathBuf>;

    /// Load the weights stored at `path`
    fn load(&self, path: &Path) -> Result<WeightSet>;

    /// Apply `weights` to a model/encoder pair, producing new handles.
    ///
    /// The default records the patch on both handles and leaves the merge
    /// arithmetic to the host that owns the tensors.
    fn merge(
        &self,
        model: &ModelHandle,
        encoder: &EncoderHandle,
        weights: &WeightSet,
        model_strength: f64,
        encoder_strength: f64,
    ) -> Result<(ModelHandle, EncoderHandle)> {
        Ok(patch_handles(model, encoder, weights, model_strength, encoder_strength))
    }
}

/// Record `weights` on fresh copies of both handles
pub(crate) fn patch_handles(
    model: &ModelHandle,
    encoder: &EncoderHandle,
    weights: &WeightSet,
    model_strength: f64,
    encoder_strength: f64,
) -> (ModelHandle, EncoderHandle) {
    let source = weights.path().display().to_string();
    let model = model.patched(AppliedPatch {
        source: source.clone(),
        fingerprint: weights.fingerprint().to_string(),
        strength: model_strength,
    });
    let encoder = encoder.patched(AppliedPatch {
        source,
        fingerprint: weights.fingerprint().to_string(),
        strength: encoder_strength,
    });
    (model, encoder)
}

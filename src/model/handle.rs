//! Model and text-encoder handles
//!
//! Handles are immutable: applying a LoRA produces a new handle with a fresh
//! id and the patch appended to the chain, the input handle is left as is.

use serde::{Deserialize, Serialize};

/// One LoRA patch recorded on a handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPatch {
    /// Path the weights were loaded from
    pub source: String,
    /// SHA-256 fingerprint of the loaded weights
    pub fingerprint: String,
    /// Strength the patch was applied with
    pub strength: f64,
}

/// Defines a handle type. Model and encoder handles share one layout and
/// differ only in the label `summary` prints.
macro_rules! handle {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            id: String,
            checkpoint: String,
            patches: Vec<AppliedPatch>,
        }

        impl $name {
            /// Handle for a freshly loaded checkpoint
            pub fn new(checkpoint: impl Into<String>) -> Self {
                Self {
                    id: uuid::Uuid::new_v4().to_string(),
                    checkpoint: checkpoint.into(),
                    patches: Vec::new(),
                }
            }

            /// New handle carrying one more patch
            pub fn patched(&self, patch: AppliedPatch) -> Self {
                let mut patches = self.patches.clone();
                patches.push(patch);
                Self {
                    id: uuid::Uuid::new_v4().to_string(),
                    checkpoint: self.checkpoint.clone(),
                    patches,
                }
            }

            pub fn id(&self) -> &str {
                &self.id
            }

            pub fn checkpoint(&self) -> &str {
                &self.checkpoint
            }

            pub fn patches(&self) -> &[AppliedPatch] {
                &self.patches
            }

            pub fn summary(&self) -> String {
                summarize($kind, &self.checkpoint, &self.patches)
            }
        }
    };
}

handle!(
    /// Handle to a generation model owned by the host graph
    ModelHandle,
    "model"
);

handle!(
    /// Handle to the text encoder paired with a model
    EncoderHandle,
    "clip"
);

fn summarize(kind: &str, checkpoint: &str, patches: &[AppliedPatch]) -> String {
    let chain: Vec<String> = patches
        .iter()
        .map(|p| format!("{}@{:.2}", p.source, p.strength))
        .collect();
    format!("{} '{}' | {} patches | [{}]", kind, checkpoint, patches.len(), chain.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(source: &str, strength: f64) -> AppliedPatch {
        AppliedPatch {
            source: source.to_string(),
            fingerprint: "00".to_string(),
            strength,
        }
    }

    #[test]
    fn test_patched_leaves_original_untouched() {
        let base = ModelHandle::new("sd15.safetensors");
        let patched = base.patched(patch("style.safetensors", 0.8));
        assert!(base.patches().is_empty());
        assert_eq!(patched.patches().len(), 1);
        assert_ne!(base.id(), patched.id());
        assert_eq!(patched.checkpoint(), "sd15.safetensors");
    }

    #[test]
    fn test_model_and_encoder_patch_alike() {
        let model = ModelHandle::new("sd15.safetensors").patched(patch("a", 0.5));
        let clip = EncoderHandle::new("sd15.safetensors").patched(patch("a", 0.5));
        assert_eq!(model.patches(), clip.patches());
        assert_eq!(model.checkpoint(), clip.checkpoint());
        assert!(model.summary().starts_with("model "));
        assert!(clip.summary().starts_with("clip "));
    }

    #[test]
    fn test_encoder_chain_order() {
        let clip = EncoderHandle::new("sd15.safetensors")
            .patched(patch("a", 1.0))
            .patched(patch("b", -0.5));
        let sources: Vec<&str> = clip.patches().iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b"]);
        assert!(clip.summary().contains("2 patches"));
    }
}

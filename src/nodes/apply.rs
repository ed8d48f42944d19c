//! Stack Applier: folds a LoRA stack onto a model/encoder pair

use crate::error::Result;
use crate::model::{EncoderHandle, LoraStack, ModelHandle};
use crate::store::WeightStore;
use log::info;
use std::sync::Arc;

/// Applies every selection of a stack in order. Weights are reloaded for
/// each entry; there is no cache at this layer.
pub struct StackApplier {
    store: Arc<dyn WeightStore>,
}

impl StackApplier {
    pub fn new(store: Arc<dyn WeightStore>) -> Self {
        Self { store }
    }

    pub fn apply_stack(
        &self,
        model: &ModelHandle,
        encoder: &EncoderHandle,
        stack: Option<&LoraStack>,
    ) -> Result<(ModelHandle, EncoderHandle)> {
        let stack = match stack {
            Some(stack) if !stack.is_empty() => stack,
            _ => return Ok((model.clone(), encoder.clone())),
        };

        let mut model = model.clone();
        let mut encoder = encoder.clone();
        for selection in stack {
            let path = self.store.resolve(&selection.name)?;
            let weights = self.store.load(&path)?;
            let (next_model, next_encoder) = self.store.merge(
                &model,
                &encoder,
                &weights,
                selection.model_strength,
                selection.encoder_strength,
            )?;
            model = next_model;
            encoder = next_encoder;
        }
        info!("Applied LoRA stack of {} entries", stack.len());
        Ok((model, encoder))
    }
}

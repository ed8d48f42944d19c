//! Single LoRA Loader
//!
//! Applies one LoRA to a model/encoder pair behind an on/off switch. The
//! loader keeps the last weights it loaded so re-running a graph with the
//! same LoRA does not hit storage again.

use crate::error::Result;
use crate::model::{is_none_name, EncoderHandle, ModelHandle, Switch};
use crate::store::{WeightSet, WeightStore};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One-LoRA loader with a single-slot weight cache.
///
/// The cache belongs to this instance; each node placement gets its own.
pub struct LoraLoader {
    store: Arc<dyn WeightStore>,
    cached: Option<(PathBuf, Arc<WeightSet>)>,
}

impl LoraLoader {
    pub fn new(store: Arc<dyn WeightStore>) -> Self {
        Self {
            store,
            cached: None,
        }
    }

    /// Path of the weights currently held in the cache
    pub fn cached_path(&self) -> Option<&Path> {
        self.cached.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn load_lora(
        &mut self,
        model: &ModelHandle,
        encoder: &EncoderHandle,
        switch: Switch,
        name: &str,
        model_strength: f64,
        encoder_strength: f64,
    ) -> Result<(ModelHandle, EncoderHandle)> {
        if model_strength == 0.0 && encoder_strength == 0.0 {
            return Ok((model.clone(), encoder.clone()));
        }
        if !switch.is_on() || is_none_name(name) {
            return Ok((model.clone(), encoder.clone()));
        }

        let path = self.store.resolve(name)?;
        let weights = self.weights_for(&path)?;
        self.store
            .merge(model, encoder, &weights, model_strength, encoder_strength)
    }

    fn weights_for(&mut self, path: &Path) -> Result<Arc<WeightSet>> {
        if let Some((cached_path, weights)) = &self.cached {
            if cached_path == path {
                debug!("Reusing cached weights for {}", path.display());
                return Ok(weights.clone());
            }
        }
        // Release the old weights before reading the new file.
        self.cached = None;
        let weights = Arc::new(self.store.load(path)?);
        info!(
            "Loaded LoRA {} ({} bytes)",
            path.display(),
            weights.size_bytes()
        );
        self.cached = Some((path.to_path_buf(), weights.clone()));
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoraError;
    use crate::store::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, LoraLoader, ModelHandle, EncoderHandle) {
        let store = Arc::new(InMemoryStore::with_loras(&["a.safetensors", "b.safetensors"]));
        let loader = LoraLoader::new(store.clone());
        (
            store,
            loader,
            ModelHandle::new("base.safetensors"),
            EncoderHandle::new("base.safetensors"),
        )
    }

    #[test]
    fn test_switch_off_is_identity() {
        let (store, mut loader, model, clip) = setup();
        let (m, c) = loader
            .load_lora(&model, &clip, Switch::Off, "a.safetensors", 1.0, 1.0)
            .unwrap();
        assert_eq!(m, model);
        assert_eq!(c, clip);
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_none_name_is_identity() {
        let (store, mut loader, model, clip) = setup();
        let (m, c) = loader
            .load_lora(&model, &clip, Switch::On, "None", 1.0, 1.0)
            .unwrap();
        assert_eq!(m, model);
        assert_eq!(c, clip);
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_zero_strengths_skip_even_unknown_name() {
        let (store, mut loader, model, clip) = setup();
        let (m, _) = loader
            .load_lora(&model, &clip, Switch::On, "missing.safetensors", 0.0, 0.0)
            .unwrap();
        assert_eq!(m, model);
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_one_zero_strength_still_applies() {
        let (_store, mut loader, model, clip) = setup();
        let (m, c) = loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 0.0, 0.7)
            .unwrap();
        assert_eq!(m.patches()[0].strength, 0.0);
        assert_eq!(c.patches()[0].strength, 0.7);
    }

    #[test]
    fn test_same_path_loads_once() {
        let (store, mut loader, model, clip) = setup();
        loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 1.0, 1.0)
            .unwrap();
        let (m, _) = loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 0.5, 0.5)
            .unwrap();
        assert_eq!(store.load_count(), 1);
        assert_eq!(store.merge_log().len(), 2);
        assert_eq!(m.patches().len(), 1);
    }

    #[test]
    fn test_different_path_evicts() {
        let (store, mut loader, model, clip) = setup();
        loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 1.0, 1.0)
            .unwrap();
        loader
            .load_lora(&model, &clip, Switch::On, "b.safetensors", 1.0, 1.0)
            .unwrap();
        assert!(loader.cached_path().unwrap().ends_with("b.safetensors"));
        loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 1.0, 1.0)
            .unwrap();
        assert_eq!(store.load_count(), 3);
    }

    #[test]
    fn test_unknown_name_propagates() {
        let (_store, mut loader, model, clip) = setup();
        let result = loader.load_lora(&model, &clip, Switch::On, "missing.safetensors", 1.0, 1.0);
        assert!(matches!(result, Err(LoraError::UnresolvableName(_))));
        assert!(loader.cached_path().is_none());
    }

    #[test]
    fn test_failed_load_leaves_cache_empty() {
        let (store, mut loader, model, clip) = setup();
        store.insert("broken.safetensors", Vec::new());
        loader
            .load_lora(&model, &clip, Switch::On, "a.safetensors", 1.0, 1.0)
            .unwrap();
        let result = loader.load_lora(&model, &clip, Switch::On, "broken.safetensors", 1.0, 1.0);
        assert!(matches!(result, Err(LoraError::LoadFailed { .. })));
        assert!(loader.cached_path().is_none());
    }
}

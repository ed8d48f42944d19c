//! In-memory weight store
//!
//! Holds LoRA bytes in a map and counts loads and merges, which makes it the
//! store of choice for tests and for the CLI demo.

use super::{patch_handles, WeightSet, WeightStore};
use crate::error::{LoraError, Result};
use crate::model::{EncoderHandle, ModelHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

const ROOT: &str = "memory";

/// Map-backed store with load and merge accounting
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    loads: AtomicUsize,
    merges: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with one small weight blob per name
    pub fn with_loras(names: &[&str]) -> Self {
        let store = Self::new();
        for (i, name) in names.iter().enumerate() {
            store.insert(name, vec![(i % 255) as u8 + 1; 16]);
        }
        store
    }

    /// Add or replace a LoRA. Empty bytes make the entry unloadable.
    pub fn insert(&self, name: &str, data: Vec<u8>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(name.to_string(), data);
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        self.entries
            .write()
            .map(|mut entries| entries.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Number of successful and failed `load` calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Paths passed to `merge`, in call order
    pub fn merge_log(&self) -> Vec<String> {
        self.merges.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn name_of(path: &Path) -> Option<String> {
        path.strip_prefix(ROOT)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }
}

impl WeightStore for InMemoryStore {
    fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let known = self
            .entries
            .read()
            .map(|entries| entries.contains_key(name))
            .unwrap_or(false);
        if known {
            Ok(Path::new(ROOT).join(name))
        } else {
            Err(LoraError::UnresolvableName(name.to_string()))
        }
    }

    fn load(&self, path: &Path) -> Result<WeightSet> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let failed = |reason: &str| LoraError::LoadFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };
        let name = Self::name_of(path).ok_or_else(|| failed("path outside memory store"))?;
        let entries = self.entries.read().map_err(|_| failed("store lock poisoned"))?;
        match entries.get(&name) {
            Some(data) if !data.is_empty() => Ok(WeightSet::new(path, data.clone())),
            Some(_) => Err(failed("weight data is empty")),
            None => Err(failed("no such entry")),
        }
    }

    fn merge(
        &self,
        model: &ModelHandle,
        encoder: &EncoderHandle,
        weights: &WeightSet,
        model_strength: f64,
        encoder_strength: f64,
    ) -> Result<(ModelHandle, EncoderHandle)> {
        if let Ok(mut merges) = self.merges.lock() {
            merges.push(weights.path().display().to_string());
        }
        Ok(patch_handles(
            model,
            encoder,
            weights,
            model_strength,
            encoder_strength,
        ))
    }
}

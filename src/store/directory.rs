//! Filesystem weight store rooted at a LoRA folder

use super::{WeightSet, WeightStore};
use crate::config::NodeConfig;
use crate::error::{LoraError, Result};
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

/// Resolves LoRA names relative to a root directory.
///
/// Names are `/`-separated paths below the root, e.g. `styles/ink.safetensors`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    /// Store rooted at the configured LoRA folder
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(&config.loras_dir, config.extensions.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_weight_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Walk `dir` without following directory symlinks, so link cycles
    /// cannot recurse. Symlinked weight files are still listed.
    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping LoRA folder {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            let name = if prefix.is_empty() {
                file_name
            } else {
                format!("{}/{}", prefix, file_name)
            };
            if file_type.is_dir() {
                self.collect(&path, &name, out);
            } else if file_type.is_symlink() && path.is_dir() {
                debug!("Not following directory link {}", path.display());
            } else if path.is_file() && self.has_weight_extension(&path) {
                out.push(name);
            }
        }
    }
}

impl WeightStore for DirectoryStore {
    fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect(&self.root, "", &mut names);
        names.sort();
        names
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(LoraError::UnresolvableName(name.to_string()));
        }
        let path = self.root.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(LoraError::UnresolvableName(name.to_string()))
        }
    }

    fn load(&self, path: &Path) -> Result<WeightSet> {
        let data = std::fs::read(path).map_err(|e| LoraError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if data.is_empty() {
            return Err(LoraError::LoadFailed {
                path: path.display().to_string(),
                reason: "weight file is empty".to_string(),
            });
        }
        debug!("Loaded {} bytes from {}", data.len(), path.display());
        Ok(WeightSet::new(path, data))
    }
}

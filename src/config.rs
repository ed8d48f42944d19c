//! Node configuration
//!
//! Input ranges, the LoRA folder and the retry cap for forced
//! re-randomization. Loaded from JSON; every field has a default.

use crate::error::{LoraError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Folder scanned by the directory store
    pub loras_dir: String,
    /// File extensions treated as LoRA weight files
    pub extensions: Vec<String>,
    /// Lower bound for model/clip strength inputs
    pub strength_min: f64,
    /// Upper bound for model/clip strength inputs
    pub strength_max: f64,
    /// UI step for strength and chance inputs
    pub strength_step: f64,
    /// Upper bound for the random stack stride input
    pub stride_max: i64,
    /// Redraw attempts allowed while forcing a different random selection
    pub max_rediversify_attempts: u32,
    /// Category the nodes are listed under
    pub category: String,
    /// Default log filter for the CLI
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            loras_dir: "models/loras".to_string(),
            extensions: ["safetensors", "ckpt", "pt", "pth", "bin"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            strength_min: -10.0,
            strength_max: 10.0,
            strength_step: 0.01,
            stride_max: 1000,
            max_rediversify_attempts: 100,
            category: "Comfyroll/LoRA".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load from a JSON configuration file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.strength_min <= self.strength_max) {
            return Err(LoraError::Config(format!(
                "strength_min {} exceeds strength_max {}",
                self.strength_min, self.strength_max
            )));
        }
        if self.stride_max < 1 {
            return Err(LoraError::Config(format!(
                "stride_max must be at least 1, got {}",
                self.stride_max
            )));
        }
        if self.max_rediversify_attempts == 0 {
            return Err(LoraError::Config(
                "max_rediversify_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strength_min, -10.0);
        assert_eq!(config.stride_max, 1000);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loranode.json");
        std::fs::write(&path, r#"{ "loras_dir": "/data/loras", "stride_max": 50 }"#).unwrap();
        let config = NodeConfig::load_from_file(&path).unwrap();
        assert_eq!(config.loras_dir, "/data/loras");
        assert_eq!(config.stride_max, 50);
        assert_eq!(config.strength_max, 10.0);
    }

    #[test]
    fn test_nan_bound_rejected() {
        let config = NodeConfig {
            strength_min: f64::NAN,
            ..NodeConfig::default()
        };
        assert!(matches!(config.validate(), Err(LoraError::Config(_))));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "strength_min": 2.0, "strength_max": 1.0 }"#).unwrap();
        assert!(matches!(
            NodeConfig::load_from_file(&path),
            Err(LoraError::Config(_))
        ));
    }
}

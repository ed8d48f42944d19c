//! Error types shared by the stores, nodes and host contract

/// Errors raised while resolving, loading or applying LoRAs
#[derive(Debug, thiserror::Error)]
pub enum LoraError {
    #[error("LoRA not found: {0}")]
    UnresolvableName(String),

    #[error("Failed to load LoRA weights from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Merge failed: {0}")]
    MergeFailed(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Unknown node type: {0}")]
    UnknownNode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoraError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        LoraError::InvalidInput {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoraError>;

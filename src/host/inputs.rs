//! Input declarations
//!
//! A node declares typed input slots; the host renders controls from the
//! declaration and `InputTypes::prepare` validates and clamps arguments
//! against it before invocation.

use super::{Args, Value};
use crate::config::NodeConfig;
use crate::error::{LoraError, Result};
use crate::model::{Switch, NONE};
use serde::Serialize;

/// Kind of an input slot, with its control parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum InputKind {
    #[serde(rename = "MODEL")]
    Model,
    #[serde(rename = "CLIP")]
    Clip,
    #[serde(rename = "LORA_STACK")]
    LoraStack,
    #[serde(rename = "FLOAT")]
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    #[serde(rename = "INT")]
    Int { default: i64, min: i64, max: i64 },
    /// Fixed list of options; the first is the default
    #[serde(rename = "COMBO")]
    Combo { options: Vec<String> },
}

impl InputKind {
    /// Model or clip strength, default 1.0
    pub fn strength(config: &NodeConfig) -> Self {
        InputKind::Float {
            default: 1.0,
            min: config.strength_min,
            max: config.strength_max,
            step: config.strength_step,
        }
    }

    /// Probability of a random stack slot, default 1.0
    pub fn chance(config: &NodeConfig) -> Self {
        InputKind::Float {
            default: 1.0,
            min: 0.0,
            max: 1.0,
            step: config.strength_step,
        }
    }

    pub fn stride(config: &NodeConfig) -> Self {
        InputKind::Int {
            default: 1,
            min: 1,
            max: config.stride_max,
        }
    }

    /// On/Off combo whose default is `first`
    pub fn switch(first: Switch) -> Self {
        let second = if first.is_on() { Switch::Off } else { Switch::On };
        InputKind::Combo {
            options: vec![first.name().to_string(), second.name().to_string()],
        }
    }

    /// `None` followed by every LoRA the store lists
    pub fn lora_names(loras: &[String]) -> Self {
        let mut options = Vec::with_capacity(loras.len() + 1);
        options.push(NONE.to_string());
        options.extend(loras.iter().cloned());
        InputKind::Combo { options }
    }

    fn prepare(&self, name: &str, value: &Value) -> Result<Value> {
        match (self, value) {
            (InputKind::Model, Value::Model(_))
            | (InputKind::Clip, Value::Clip(_))
            | (InputKind::LoraStack, Value::Stack(_)) => Ok(value.clone()),
            (InputKind::Float { min, max, .. }, Value::Float(_) | Value::Int(_)) if !(min <= max) => {
                Err(inverted_range(name, *min, *max))
            }
            (InputKind::Int { min, max, .. }, Value::Int(_)) if min > max => {
                Err(inverted_range(name, *min as f64, *max as f64))
            }
            (InputKind::Float { min, max, .. }, Value::Float(v)) => Ok(Value::Float(v.clamp(*min, *max))),
            (InputKind::Float { min, max, .. }, Value::Int(v)) => {
                Ok(Value::Float((*v as f64).clamp(*min, *max)))
            }
            (InputKind::Int { min, max, .. }, Value::Int(v)) => Ok(Value::Int((*v).clamp(*min, *max))),
            (InputKind::Combo { options }, Value::Text(v)) => {
                if options.iter().any(|o| o == v) {
                    Ok(value.clone())
                } else {
                    Err(LoraError::invalid(name, format!("'{}' is not one of the options", v)))
                }
            }
            (kind, other) => Err(LoraError::invalid(
                name,
                format!("expected {}, got {}", kind.type_name(), other.kind()),
            )),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            InputKind::Model => "MODEL",
            InputKind::Clip => "CLIP",
            InputKind::LoraStack => "LORA_STACK",
            InputKind::Float { .. } => "FLOAT",
            InputKind::Int { .. } => "INT",
            InputKind::Combo { .. } => "COMBO",
        }
    }
}

fn inverted_range(name: &str, min: f64, max: f64) -> LoraError {
    LoraError::Config(format!("input '{}' has range [{}, {}]", name, min, max))
}

/// A named input slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSlot {
    pub name: String,
    #[serde(flatten)]
    pub kind: InputKind,
}

/// Required and optional inputs of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputTypes {
    pub required: Vec<InputSlot>,
    pub optional: Vec<InputSlot>,
}

impl InputTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, kind: InputKind) -> Self {
        self.required.push(InputSlot {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn optional(mut self, name: &str, kind: InputKind) -> Self {
        self.optional.push(InputSlot {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn slot(&self, name: &str) -> Option<&InputSlot> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|s| s.name == name)
    }

    /// Validate `args` against the declaration.
    ///
    /// Required inputs must be present; numbers are clamped into their range;
    /// combo values must be one of the options. Undeclared arguments are
    /// dropped.
    pub fn prepare(&self, args: &Args) -> Result<Args> {
        let mut prepared = Args::new();
        for slot in &self.required {
            let value = args
                .get(&slot.name)
                .ok_or_else(|| LoraError::MissingInput(slot.name.clone()))?;
            prepared.insert(&slot.name, slot.kind.prepare(&slot.name, value)?);
        }
        for slot in &self.optional {
            if let Some(value) = args.get(&slot.name) {
                prepared.insert(&slot.name, slot.kind.prepare(&slot.name, value)?);
            }
        }
        Ok(prepared)
    }
}

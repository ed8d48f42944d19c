//! Values exchanged with the host and keyword-argument access

use crate::error::{LoraError, Result};
use crate::model::{EncoderHandle, LoraStack, ModelHandle, Switch};
use std::collections::BTreeMap;

/// A value flowing through a node input or output
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Model(ModelHandle),
    Clip(EncoderHandle),
    Stack(LoraStack),
    Float(f64),
    Int(i64),
    Text(String),
}

impl Value {
    /// Host type name of the value
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Model(_) => "MODEL",
            Value::Clip(_) => "CLIP",
            Value::Stack(_) => "LORA_STACK",
            Value::Float(_) => "FLOAT",
            Value::Int(_) => "INT",
            Value::Text(_) => "STRING",
        }
    }
}

impl From<ModelHandle> for Value {
    fn from(v: ModelHandle) -> Self {
        Value::Model(v)
    }
}

impl From<EncoderHandle> for Value {
    fn from(v: EncoderHandle) -> Self {
        Value::Clip(v)
    }
}

impl From<LoraStack> for Value {
    fn from(v: LoraStack) -> Self {
        Value::Stack(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Switch> for Value {
    fn from(v: Switch) -> Self {
        Value::Text(v.name().to_string())
    }
}

/// Keyword arguments of one node invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn required(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| LoraError::MissingInput(name.to_string()))
    }

    pub fn model(&self, name: &str) -> Result<&ModelHandle> {
        match self.required(name)? {
            Value::Model(m) => Ok(m),
            other => Err(mismatch(name, "MODEL", other)),
        }
    }

    pub fn clip(&self, name: &str) -> Result<&EncoderHandle> {
        match self.required(name)? {
            Value::Clip(c) => Ok(c),
            other => Err(mismatch(name, "CLIP", other)),
        }
    }

    /// Optional stack input; absent means no incoming stack
    pub fn stack(&self, name: &str) -> Result<Option<&LoraStack>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::Stack(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(name, "LORA_STACK", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.required(name)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(mismatch(name, "FLOAT", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.required(name)? {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(name, "INT", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.required(name)? {
            Value::Text(v) => Ok(v.as_str()),
            other => Err(mismatch(name, "STRING", other)),
        }
    }

    pub fn switch(&self, name: &str) -> Result<Switch> {
        self.text(name)?
            .parse::<Switch>()
            .map_err(|e| LoraError::invalid(name, e))
    }
}

fn mismatch(name: &str, expected: &str, got: &Value) -> LoraError {
    LoraError::invalid(name, format!("expected {}, got {}", expected, got.kind()))
}

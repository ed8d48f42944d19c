//! LoRA selections, stacks and node switches

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel LoRA name meaning "no LoRA in this slot"
pub const NONE: &str = "None";

/// True when `name` is the `None` sentinel (any letter case)
pub fn is_none_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(NONE)
}

/// On/off switch used by every LoRA node slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(&self) -> bool {
        matches!(self, Switch::On)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Switch::On => "On",
            Switch::Off => "Off",
        }
    }
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        if on {
            Switch::On
        } else {
            Switch::Off
        }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "On" | "on" => Ok(Switch::On),
            "Off" | "off" => Ok(Switch::Off),
            other => Err(format!("expected On or Off, got '{}'", other)),
        }
    }
}

/// One LoRA to apply with its model and text-encoder strengths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraSelection {
    pub name: String,
    pub model_strength: f64,
    pub encoder_strength: f64,
}

impl LoraSelection {
    pub fn new(name: impl Into<String>, model_strength: f64, encoder_strength: f64) -> Self {
        Self {
            name: name.into(),
            model_strength,
            encoder_strength,
        }
    }

    pub fn is_none(&self) -> bool {
        is_none_name(&self.name)
    }
}

/// Ordered list of LoRA selections, applied front to back.
///
/// Serialized as a plain list. Deserializing drops `None` entries the same
/// way `push` does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LoraSelection>", into = "Vec<LoraSelection>")]
pub struct LoraStack(Vec<LoraSelection>);

impl LoraStack {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Copy of `incoming` with every `None` entry dropped, order kept.
    /// An absent stack yields an empty one.
    pub fn seeded_from(incoming: Option<&LoraStack>) -> Self {
        match incoming {
            Some(stack) => stack.iter().filter(|s| !s.is_none()).cloned().collect(),
            None => Self::new(),
        }
    }

    /// Append a selection unless it is the `None` sentinel
    pub fn push(&mut self, selection: LoraSelection) {
        if !selection.is_none() {
            self.0.push(selection);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoraSelection> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|s| s.name.as_str()).collect()
    }
}

impl FromIterator<LoraSelection> for LoraStack {
    fn from_iter<I: IntoIterator<Item = LoraSelection>>(iter: I) -> Self {
        let mut stack = LoraStack::new();
        for selection in iter {
            stack.push(selection);
        }
        stack
    }
}

impl From<Vec<LoraSelection>> for LoraStack {
    fn from(selections: Vec<LoraSelection>) -> Self {
        selections.into_iter().collect()
    }
}

impl From<LoraStack> for Vec<LoraSelection> {
    fn from(stack: LoraStack) -> Self {
        stack.0
    }
}

impl IntoIterator for LoraStack {
    type Item = LoraSelection;
    type IntoIter = std::vec::IntoIter<LoraSelection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LoraStack {
    type Item = &'a LoraSelection;
    type IntoIter = std::slice::Iter<'a, LoraSelection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

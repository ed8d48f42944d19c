//! LoRA Stack Builder
//!
//! Three switchable LoRA slots appended to an optional incoming stack.

use crate::model::{is_none_name, LoraSelection, LoraStack, Switch};

/// One slot of the stack builder
#[derive(Debug, Clone, PartialEq)]
pub struct StackSlot {
    pub switch: Switch,
    pub name: String,
    pub model_strength: f64,
    pub encoder_strength: f64,
}

impl StackSlot {
    pub fn new(switch: Switch, name: impl Into<String>, model_strength: f64, encoder_strength: f64) -> Self {
        Self {
            switch,
            name: name.into(),
            model_strength,
            encoder_strength,
        }
    }

    /// Switched on and naming a LoRA
    pub fn is_active(&self) -> bool {
        self.switch.is_on() && !is_none_name(&self.name)
    }

    pub fn selection(&self) -> LoraSelection {
        LoraSelection::new(self.name.clone(), self.model_strength, self.encoder_strength)
    }
}

/// Stateless node wrapper around [`build_stack`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoraStackBuilder;

impl LoraStackBuilder {
    pub fn build(&self, slots: &[StackSlot], incoming: Option<&LoraStack>) -> LoraStack {
        build_stack(slots, incoming)
    }
}

/// Incoming stack (without `None` entries) followed by each active slot in
/// slot order. The same LoRA may appear more than once.
pub fn build_stack(slots: &[StackSlot], incoming: Option<&LoraStack>) -> LoraStack {
    let mut stack = LoraStack::seeded_from(incoming);
    for slot in slots.iter().filter(|s| s.is_active()) {
        stack.push(slot.selection());
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(a: (Switch, &str), b: (Switch, &str), c: (Switch, &str)) -> [StackSlot; 3] {
        [
            StackSlot::new(a.0, a.1, 1.0, 1.0),
            StackSlot::new(b.0, b.1, 0.5, 0.25),
            StackSlot::new(c.0, c.1, -1.0, 0.0),
        ]
    }

    #[test]
    fn test_slot_order_kept() {
        let s = slots(
            (Switch::On, "c.safetensors"),
            (Switch::On, "a.safetensors"),
            (Switch::On, "b.safetensors"),
        );
        let stack = build_stack(&s, None);
        assert_eq!(stack.names(), vec!["c.safetensors", "a.safetensors", "b.safetensors"]);
        assert_eq!(stack.iter().nth(1).unwrap().encoder_strength, 0.25);
    }

    #[test]
    fn test_off_and_none_slots_omitted() {
        let s = slots(
            (Switch::Off, "a.safetensors"),
            (Switch::On, "None"),
            (Switch::On, "c.safetensors"),
        );
        assert_eq!(build_stack(&s, None).names(), vec!["c.safetensors"]);
    }

    #[test]
    fn test_incoming_first_and_filtered() {
        // Upstream `None` entries are dropped when the stack is read.
        let incoming: LoraStack = serde_json::from_str(
            r#"[
                {"name": "x.safetensors", "model_strength": 1.0, "encoder_strength": 1.0},
                {"name": "None", "model_strength": 1.0, "encoder_strength": 1.0},
                {"name": "y.safetensors", "model_strength": 1.0, "encoder_strength": 1.0}
            ]"#,
        )
        .unwrap();
        assert_eq!(incoming.names(), vec!["x.safetensors", "y.safetensors"]);
        let s = slots(
            (Switch::On, "x.safetensors"),
            (Switch::Off, "None"),
            (Switch::Off, "None"),
        );
        let stack = build_stack(&s, Some(&incoming));
        assert_eq!(
            stack.names(),
            vec!["x.safetensors", "y.safetensors", "x.safetensors"]
        );
    }

    #[test]
    fn test_all_off_passes_incoming_through() {
        let incoming: LoraStack = vec![LoraSelection::new("x.safetensors", 1.0, 1.0)]
            .into_iter()
            .collect();
        let s = slots(
            (Switch::Off, "a.safetensors"),
            (Switch::Off, "b.safetensors"),
            (Switch::Off, "c.safetensors"),
        );
        assert_eq!(build_stack(&s, Some(&incoming)), incoming);
        assert!(build_stack(&s, None).is_empty());
    }
}

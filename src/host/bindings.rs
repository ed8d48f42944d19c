//! `Node` implementations mapping host keyword arguments onto the nodes

use super::{Args, InputKind, InputTypes, Node, Value};
use crate::config::NodeConfig;
use crate::error::Result;
use crate::model::Switch;
use crate::nodes::{
    LoraLoader, LoraStackBuilder, RandomLoraStack, RandomSlot, RandomStackRequest, StackApplier,
    StackSlot,
};
use crate::session::ChangeSignal;

const MODEL_CLIP: &[&str] = &["MODEL", "CLIP"];
const STACK: &[&str] = &["LORA_STACK"];

fn slot_inputs(
    mut types: InputTypes,
    config: &NodeConfig,
    loras: &[String],
    with_chance: bool,
) -> InputTypes {
    for i in 1..=3 {
        types = types
            .required(&format!("switch_{}", i), InputKind::switch(Switch::Off))
            .required(&format!("lora_name_{}", i), InputKind::lora_names(loras))
            .required(&format!("model_weight_{}", i), InputKind::strength(config))
            .required(&format!("clip_weight_{}", i), InputKind::strength(config));
        if with_chance {
            types = types.required(&format!("chance_{}", i), InputKind::chance(config));
        }
    }
    types.optional("lora_stack", InputKind::LoraStack)
}

fn stack_slot(args: &Args, i: usize) -> Result<StackSlot> {
    Ok(StackSlot::new(
        args.switch(&format!("switch_{}", i))?,
        args.text(&format!("lora_name_{}", i))?,
        args.float(&format!("model_weight_{}", i))?,
        args.float(&format!("clip_weight_{}", i))?,
    ))
}

fn random_slot(args: &Args, i: usize) -> Result<RandomSlot> {
    let slot = stack_slot(args, i)?;
    Ok(RandomSlot::new(
        slot.switch,
        slot.name,
        slot.model_strength,
        slot.encoder_strength,
        args.float(&format!("chance_{}", i))?,
    ))
}

fn random_request(args: &Args) -> Result<RandomStackRequest> {
    let stride = u32::try_from(args.int("stride")?.max(1)).unwrap_or(u32::MAX);
    Ok(RandomStackRequest {
        exclusive: args.switch("exclusive_mode")?,
        stride,
        force_rediversify: args.switch("force_randomize_after_stride")?,
        slots: [random_slot(args, 1)?, random_slot(args, 2)?, random_slot(args, 3)?],
        incoming: args.stack("lora_stack")?.cloned(),
    })
}

impl Node for LoraLoader {
    fn input_types(&self, config: &NodeConfig, loras: &[String]) -> InputTypes {
        InputTypes::new()
            .required("model", InputKind::Model)
            .required("clip", InputKind::Clip)
            .required("switch", InputKind::switch(Switch::On))
            .required("lora_name", InputKind::lora_names(loras))
            .required("strength_model", InputKind::strength(config))
            .required("strength_clip", InputKind::strength(config))
    }

    fn return_types(&self) -> &'static [&'static str] {
        MODEL_CLIP
    }

    fn execute(&mut self, args: &Args) -> Result<Vec<Value>> {
        let (model, clip) = self.load_lora(
            args.model("model")?,
            args.clip("clip")?,
            args.switch("switch")?,
            args.text("lora_name")?,
            args.float("strength_model")?,
            args.float("strength_clip")?,
        )?;
        Ok(vec![model.into(), clip.into()])
    }
}

impl Node for LoraStackBuilder {
    fn input_types(&self, config: &NodeConfig, loras: &[String]) -> InputTypes {
        slot_inputs(InputTypes::new(), config, loras, false)
    }

    fn return_types(&self) -> &'static [&'static str] {
        STACK
    }

    fn execute(&mut self, args: &Args) -> Result<Vec<Value>> {
        let slots = [stack_slot(args, 1)?, stack_slot(args, 2)?, stack_slot(args, 3)?];
        Ok(vec![self.build(&slots, args.stack("lora_stack")?).into()])
    }
}

impl Node for RandomLoraStack {
    fn input_types(&self, config: &NodeConfig, loras: &[String]) -> InputTypes {
        let head = InputTypes::new()
            .required("exclusive_mode", InputKind::switch(Switch::Off))
            .required("stride", InputKind::stride(config))
            .required("force_randomize_after_stride", InputKind::switch(Switch::Off));
        slot_inputs(head, config, loras, true)
    }

    fn return_types(&self) -> &'static [&'static str] {
        STACK
    }

    fn execute(&mut self, args: &Args) -> Result<Vec<Value>> {
        let request = random_request(args)?;
        Ok(vec![self.build(&request).into()])
    }

    fn is_changed(&mut self, args: &Args) -> Result<Option<ChangeSignal>> {
        let request = random_request(args)?;
        Ok(Some(self.change_signal(&request)))
    }
}

impl Node for StackApplier {
    fn input_types(&self, _config: &NodeConfig, _loras: &[String]) -> InputTypes {
        InputTypes::new()
            .required("model", InputKind::Model)
            .required("clip", InputKind::Clip)
            .optional("lora_stack", InputKind::LoraStack)
    }

    fn return_types(&self) -> &'static [&'static str] {
        MODEL_CLIP
    }

    fn execute(&mut self, args: &Args) -> Result<Vec<Value>> {
        let (model, clip) =
            self.apply_stack(args.model("model")?, args.clip("clip")?, args.stack("lora_stack")?)?;
        Ok(vec![model.into(), clip.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EncoderHandle, LoraStack, ModelHandle};
    use crate::nodes::SequenceDraws;
    use crate::session::InMemorySessionStore;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn slot_args(mut args: Args, with_chance: bool) -> Args {
        let names = ["a.safetensors", "None", "b.safetensors"];
        for (i, name) in names.iter().enumerate() {
            let n = i + 1;
            args.insert(&format!("switch_{}", n), "On");
            args.insert(&format!("lora_name_{}", n), *name);
            args.insert(&format!("model_weight_{}", n), 1.0);
            args.insert(&format!("clip_weight_{}", n), 0.5);
            if with_chance {
                args.insert(&format!("chance_{}", n), 1.0);
            }
        }
        args
    }

    #[test]
    fn test_stack_builder_reads_numbered_slots() {
        let mut node = LoraStackBuilder;
        let out = node.execute(&slot_args(Args::new(), false)).unwrap();
        match &out[..] {
            [Value::Stack(stack)] => assert_eq!(stack.names(), vec!["a.safetensors", "b.safetensors"]),
            other => panic!("unexpected outputs {:?}", other),
        }
    }

    #[test]
    fn test_random_stack_signals_then_builds() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let mut node = RandomLoraStack::new(sessions, Box::new(SequenceDraws::new([0.4, 0.9, 0.2])));
        let args = slot_args(
            Args::new()
                .with("exclusive_mode", "On")
                .with("stride", 1i64)
                .with("force_randomize_after_stride", "Off"),
            true,
        );
        assert!(node.is_changed(&args).unwrap().is_some());
        match &node.execute(&args).unwrap()[..] {
            [Value::Stack(stack)] => assert_eq!(stack.names(), vec!["b.safetensors"]),
            other => panic!("unexpected outputs {:?}", other),
        }
    }

    #[test]
    fn test_applier_outputs_model_and_clip() {
        let store = Arc::new(InMemoryStore::with_loras(&["a.safetensors"]));
        let mut node = StackApplier::new(store);
        let stack: LoraStack = vec![crate::model::LoraSelection::new("a.safetensors", 1.0, 1.0)]
            .into_iter()
            .collect();
        let args = Args::new()
            .with("model", ModelHandle::new("base"))
            .with("clip", EncoderHandle::new("base"))
            .with("lora_stack", stack);
        let out = node.execute(&args).unwrap();
        assert_eq!(out.len(), node.return_types().len());
        assert!(matches!(&out[0], Value::Model(m) if m.patches().len() == 1));
        assert!(node.is_changed(&args).unwrap().is_none());
    }
}

//! Node registry: maps host display names to node factories

use super::{Args, InputTypes, Node, Value};
use crate::config::NodeConfig;
use crate::error::{LoraError, Result};
use crate::nodes::{DrawSource, LoraLoader, LoraStackBuilder, RandomLoraStack, RngDraws, StackApplier};
use crate::session::{ChangeSignal, SessionStore};
use crate::store::WeightStore;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

pub const LOAD_LORA: &str = "CR Load LoRA";
pub const LORA_STACK: &str = "CR LoRA Stack";
pub const RANDOM_LORA_STACK: &str = "CR Random LoRA Stack";
pub const APPLY_LORA_STACK: &str = "CR Apply LoRA Stack";

/// Every node the registry can create, in menu order
pub const NODE_NAMES: &[&str] = &[LOAD_LORA, LORA_STACK, RANDOM_LORA_STACK, APPLY_LORA_STACK];

type DrawFactory = Box<dyn Fn() -> Box<dyn DrawSource> + Send + Sync>;

/// What the host needs to render a node
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescription {
    pub name: String,
    pub category: String,
    pub input: InputTypes,
    pub output: Vec<String>,
}

pub struct NodeRegistry {
    store: Arc<dyn WeightStore>,
    sessions: Arc<dyn SessionStore>,
    config: NodeConfig,
    draws: DrawFactory,
}

impl NodeRegistry {
    /// Registry over a validated `config`. Random stack nodes draw from an
    /// entropy-seeded generator by default.
    pub fn new(
        store: Arc<dyn WeightStore>,
        sessions: Arc<dyn SessionStore>,
        config: NodeConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            sessions,
            config,
            draws: Box::new(|| -> Box<dyn DrawSource> { Box::new(RngDraws::from_entropy()) }),
        })
    }

    /// Replace the draw source given to each new random stack node
    pub fn with_draws<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DrawSource> + Send + Sync + 'static,
    {
        self.draws = Box::new(factory);
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn names(&self) -> &'static [&'static str] {
        NODE_NAMES
    }

    /// New node instance. Loaders get their own cache; random stacks share
    /// the registry's session store.
    pub fn create(&self, name: &str) -> Result<Box<dyn Node>> {
        let node: Box<dyn Node> = match name {
            LOAD_LORA => Box::new(LoraLoader::new(self.store.clone())),
            LORA_STACK => Box::new(LoraStackBuilder),
            RANDOM_LORA_STACK => Box::new(
                RandomLoraStack::new(self.sessions.clone(), (self.draws)())
                    .with_max_attempts(self.config.max_rediversify_attempts),
            ),
            APPLY_LORA_STACK => Box::new(StackApplier::new(self.store.clone())),
            other => return Err(LoraError::UnknownNode(other.to_string())),
        };
        debug!("Created node {}", name);
        Ok(node)
    }

    pub fn describe(&self, name: &str) -> Result<NodeDescription> {
        let node = self.create(name)?;
        Ok(NodeDescription {
            name: name.to_string(),
            category: self.config.category.clone(),
            input: node.input_types(&self.config, &self.store.list()),
            output: node.return_types().iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn describe_all(&self) -> Result<Vec<NodeDescription>> {
        NODE_NAMES.iter().map(|name| self.describe(name)).collect()
    }

    /// Prepare `args` against the node's declaration, then execute
    pub fn run(&self, node: &mut dyn Node, args: &Args) -> Result<Vec<Value>> {
        let prepared = self.prepare(node, args)?;
        node.execute(&prepared)
    }

    /// Prepare `args`, then ask the node for its change signal
    pub fn poll(&self, node: &mut dyn Node, args: &Args) -> Result<Option<ChangeSignal>> {
        let prepared = self.prepare(node, args)?;
        node.is_changed(&prepared)
    }

    fn prepare(&self, node: &dyn Node, args: &Args) -> Result<Args> {
        node.input_types(&self.config, &self.store.list())
            .prepare(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EncoderHandle, ModelHandle};
    use crate::nodes::SequenceDraws;
    use crate::session::InMemorySessionStore;
    use crate::store::InMemoryStore;

    fn registry() -> (Arc<InMemoryStore>, NodeRegistry) {
        let store = Arc::new(InMemoryStore::with_loras(&["a.safetensors", "b.safetensors"]));
        let registry = NodeRegistry::new(
            store.clone(),
            Arc::new(InMemorySessionStore::new()),
            NodeConfig::default(),
        )
        .unwrap()
        .with_draws(|| Box::new(SequenceDraws::new([0.1, 0.5, 0.9])));
        (store, registry)
    }

    fn loader_args(name: &str, strength: f64) -> Args {
        Args::new()
            .with("model", ModelHandle::new("base"))
            .with("clip", EncoderHandle::new("base"))
            .with("switch", "On")
            .with("lora_name", name)
            .with("strength_model", strength)
            .with("strength_clip", 1.0)
    }

    #[test]
    fn test_inverted_strength_range_rejected() {
        let config = NodeConfig {
            strength_min: 2.0,
            strength_max: 1.0,
            ..NodeConfig::default()
        };
        let result = NodeRegistry::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemorySessionStore::new()),
            config,
        );
        assert!(matches!(result, Err(LoraError::Config(_))));
    }

    #[test]
    fn test_creates_every_declared_node() {
        let (_store, registry) = registry();
        for name in registry.names() {
            assert!(registry.create(name).is_ok(), "{} should be creatable", name);
        }
        assert!(matches!(
            registry.create("CR Load LoRA XL"),
            Err(LoraError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_descriptions_list_store_names() {
        let (_store, registry) = registry();
        let all = registry.describe_all().unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|d| d.category == "Comfyroll/LoRA"));

        let loader = &all[0];
        assert_eq!(loader.output, vec!["MODEL", "CLIP"]);
        let json = serde_json::to_value(&loader.input).unwrap();
        let names = &json["required"][3]["options"];
        assert_eq!(names[0], "None");
        assert_eq!(names[1], "a.safetensors");
        assert_eq!(json["required"][2]["options"][0], "On");
    }

    #[test]
    fn test_run_clamps_strength() {
        let (_store, registry) = registry();
        let mut node = registry.create(LOAD_LORA).unwrap();
        let out = registry
            .run(node.as_mut(), &loader_args("a.safetensors", 42.0))
            .unwrap();
        match &out[0] {
            Value::Model(model) => assert_eq!(model.patches()[0].strength, 10.0),
            other => panic!("expected model, got {:?}", other),
        }
    }

    #[test]
    fn test_run_rejects_unlisted_name() {
        let (store, registry) = registry();
        let mut node = registry.create(LOAD_LORA).unwrap();
        let result = registry.run(node.as_mut(), &loader_args("c.safetensors", 1.0));
        assert!(matches!(result, Err(LoraError::InvalidInput { .. })));
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_loaders_have_separate_caches() {
        let (store, registry) = registry();
        let mut first = registry.create(LOAD_LORA).unwrap();
        let mut second = registry.create(LOAD_LORA).unwrap();
        let args = loader_args("a.safetensors", 1.0);
        registry.run(first.as_mut(), &args).unwrap();
        registry.run(first.as_mut(), &args).unwrap();
        registry.run(second.as_mut(), &args).unwrap();
        assert_eq!(store.load_count(), 2);
    }

    #[test]
    fn test_random_nodes_share_sessions() {
        let (_store, registry) = registry();
        let mut args = Args::new()
            .with("exclusive_mode", "Off")
            .with("stride", 3i64)
            .with("force_randomize_after_stride", "Off");
        for (i, name) in ["a.safetensors", "b.safetensors", "None"].iter().enumerate() {
            let n = i + 1;
            args.insert(&format!("switch_{}", n), "On");
            args.insert(&format!("lora_name_{}", n), *name);
            args.insert(&format!("model_weight_{}", n), 1.0);
            args.insert(&format!("clip_weight_{}", n), 1.0);
            args.insert(&format!("chance_{}", n), 0.5);
        }

        let mut first = registry.create(RANDOM_LORA_STACK).unwrap();
        let mut second = registry.create(RANDOM_LORA_STACK).unwrap();
        let signal = registry.poll(first.as_mut(), &args).unwrap();
        assert!(signal.is_some());
        assert_eq!(registry.poll(second.as_mut(), &args).unwrap(), signal);
        match &registry.run(second.as_mut(), &args).unwrap()[0] {
            Value::Stack(stack) => assert_eq!(stack.names(), vec!["a.safetensors", "b.safetensors"]),
            other => panic!("expected stack, got {:?}", other),
        }
    }
}

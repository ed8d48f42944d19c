//! loranode CLI: inspect and exercise the LoRA nodes outside a host
//!
//! Commands:
//!   loranode list: list LoRA files in the configured folder
//!   loranode nodes: print node declarations as JSON
//!   loranode apply: apply a stack of LoRAs to a checkpoint
//!   loranode random: simulate host passes through a random stack
//!   loranode demo: run every node against an in-memory store

use loranode_core::host::{Args, Value, APPLY_LORA_STACK, LOAD_LORA, LORA_STACK, RANDOM_LORA_STACK};
use loranode_core::model::{EncoderHandle, LoraSelection, LoraStack, ModelHandle};
use loranode_core::nodes::{RandomLoraStack, RandomSlot, RandomStackRequest, RngDraws};
use loranode_core::{
    DirectoryStore, InMemorySessionStore, InMemoryStore, NodeConfig, NodeRegistry, SessionStore,
    StackApplier, Switch, WeightStore,
};
use std::env;
use std::path::Path;
use std::sync::Arc;

const CONFIG_ENV: &str = "LORANODE_CONFIG";
const CONFIG_FILE: &str = "loranode.json";

fn print_usage() {
    println!(
        r#"
loranode v0.1: LoRA loader and stack nodes

Usage: loranode <command> [options]

Commands:
  list                                           List LoRA files in the LoRA folder
  nodes                                          Print node declarations as JSON
  apply  <checkpoint> <name[:model[:clip]]>...   Apply LoRAs in order to a checkpoint
  random <name> <name> <name> [passes] [stride]  Simulate host passes of a random stack
  demo                                           Run every node on an in-memory store

Config is read from ${} or ./{} when present.

Examples:
  loranode list
  loranode apply sd15.safetensors detail.safetensors:0.8 style/ink.safetensors:1.0:0.5
  loranode random a.safetensors b.safetensors None 10 3
"#,
        CONFIG_ENV, CONFIG_FILE
    );
}

fn load_config() -> NodeConfig {
    let path = env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
    if !Path::new(&path).exists() {
        return NodeConfig::default();
    }
    match NodeConfig::load_from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  Ignoring {}: {}", path, e);
            NodeConfig::default()
        }
    }
}

fn main() {
    let config = load_config();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "list" => cmd_list(&config),
        "nodes" => cmd_nodes(config),
        "apply" => cmd_apply(&config, &args[2..]),
        "random" => cmd_random(&config, &args[2..]),
        "demo" => cmd_demo(config),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
        }
    }
}

fn cmd_list(config: &NodeConfig) {
    let store = DirectoryStore::from_config(config);
    let names = store.list();
    if names.is_empty() {
        println!("  No LoRA files under {}", store.root().display());
        return;
    }
    println!("  {} LoRA files under {}:", names.len(), store.root().display());
    for name in names {
        println!("    {}", name);
    }
}

fn cmd_nodes(config: NodeConfig) {
    let store = Arc::new(DirectoryStore::from_config(&config));
    let described = NodeRegistry::new(store, Arc::new(InMemorySessionStore::new()), config)
        .and_then(|registry| registry.describe_all())
        .and_then(|all| Ok(serde_json::to_string_pretty(&all)?));
    match described {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("  Failed to describe nodes: {}", e),
    }
}

/// Parse `name[:model[:clip]]`; a missing clip strength follows the model one
fn parse_selection(arg: &str) -> Option<LoraSelection> {
    let mut parts = arg.split(':');
    let name = parts.next().filter(|n| !n.is_empty())?;
    let model: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 1.0,
    };
    let clip: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => model,
    };
    Some(LoraSelection::new(name, model, clip))
}

fn cmd_apply(config: &NodeConfig, args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: loranode apply <checkpoint> <name[:model[:clip]]>...");
        return;
    }

    let mut stack = LoraStack::new();
    for arg in &args[1..] {
        match parse_selection(arg) {
            Some(selection) => stack.push(selection),
            None => {
                eprintln!("  Invalid LoRA argument: {}", arg);
                return;
            }
        }
    }

    let applier = StackApplier::new(Arc::new(DirectoryStore::from_config(config)));
    let model = ModelHandle::new(args[0].as_str());
    let clip = EncoderHandle::new(args[0].as_str());
    match applier.apply_stack(&model, &clip, Some(&stack)) {
        Ok((model, clip)) => {
            println!("  {}", model.summary());
            println!("  {}", clip.summary());
            for patch in model.patches() {
                println!(
                    "    {} @ {:.2} [{}]",
                    patch.source,
                    patch.strength,
                    &patch.fingerprint[..12.min(patch.fingerprint.len())]
                );
            }
        }
        Err(e) => eprintln!("  Failed to apply stack: {}", e),
    }
}

fn cmd_random(config: &NodeConfig, args: &[String]) {
    if args.len() < 3 {
        eprintln!("Usage: loranode random <name> <name> <name> [passes] [stride]");
        return;
    }
    let passes: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(10);
    let stride: u32 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(1).max(1);

    let sessions = Arc::new(InMemorySessionStore::new());
    let mut node = RandomLoraStack::new(sessions.clone(), Box::new(RngDraws::from_entropy()))
        .with_max_attempts(config.max_rediversify_attempts);
    let slot = |name: &str| RandomSlot::new(Switch::On, name, 1.0, 1.0, 0.5);
    let request = RandomStackRequest {
        exclusive: Switch::Off,
        stride,
        force_rediversify: Switch::On,
        slots: [slot(&args[0]), slot(&args[1]), slot(&args[2])],
        incoming: None,
    };

    println!("  Session {}", request.session_key());
    for pass in 1..=passes {
        let signal = node.change_signal(&request);
        let stack = node.build(&request);
        println!(
            "  pass {:>3}  signal {}  stack [{}]",
            pass,
            &signal.as_str()[..12],
            stack.names().join(", ")
        );
    }
    if let Some(state) = sessions.get(&request.session_key()) {
        println!("  {} randomizations over {} passes", state.randomizations, passes);
    }
}

fn print_outputs(label: &str, outputs: &[Value]) {
    for value in outputs {
        match value {
            Value::Model(m) => println!("  {} -> {}", label, m.summary()),
            Value::Clip(c) => println!("  {} -> {}", label, c.summary()),
            Value::Stack(s) => println!("  {} -> stack [{}]", label, s.names().join(", ")),
            other => println!("  {} -> {:?}", label, other),
        }
    }
}

fn cmd_demo(config: NodeConfig) {
    println!("\nloranode demo: every node on an in-memory store");
    println!("{}", "-".repeat(60));

    let store = Arc::new(InMemoryStore::with_loras(&[
        "detail.safetensors",
        "style/ink.safetensors",
        "style/watercolor.safetensors",
    ]));
    let registry =
        match NodeRegistry::new(store.clone(), Arc::new(InMemorySessionStore::new()), config) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("  {}", e);
                return;
            }
        };
    let model = ModelHandle::new("sd15.safetensors");
    let clip = EncoderHandle::new("sd15.safetensors");

    let step = |label: &str, name: &str, args: Args| {
        let result = registry
            .create(name)
            .and_then(|mut node| registry.run(node.as_mut(), &args));
        match result {
            Ok(outputs) => {
                print_outputs(label, &outputs);
                outputs
            }
            Err(e) => {
                eprintln!("  {} failed: {}", label, e);
                Vec::new()
            }
        }
    };

    step(
        LOAD_LORA,
        LOAD_LORA,
        Args::new()
            .with("model", model.clone())
            .with("clip", clip.clone())
            .with("switch", "On")
            .with("lora_name", "detail.safetensors")
            .with("strength_model", 0.8)
            .with("strength_clip", 0.8),
    );

    let mut stack_args = Args::new();
    for (i, name) in ["style/ink.safetensors", "None", "detail.safetensors"].iter().enumerate() {
        let n = i + 1;
        stack_args.insert(&format!("switch_{}", n), "On");
        stack_args.insert(&format!("lora_name_{}", n), *name);
        stack_args.insert(&format!("model_weight_{}", n), 1.0);
        stack_args.insert(&format!("clip_weight_{}", n), 0.5);
    }
    let stack = match step(LORA_STACK, LORA_STACK, stack_args).into_iter().next() {
        Some(Value::Stack(stack)) => stack,
        _ => LoraStack::new(),
    };

    let mut random_args = Args::new()
        .with("exclusive_mode", "On")
        .with("stride", 1i64)
        .with("force_randomize_after_stride", "On")
        .with("lora_stack", stack.clone());
    for (i, name) in [
        "style/ink.safetensors",
        "style/watercolor.safetensors",
        "detail.safetensors",
    ]
    .iter()
    .enumerate()
    {
        let n = i + 1;
        random_args.insert(&format!("switch_{}", n), "On");
        random_args.insert(&format!("lora_name_{}", n), *name);
        random_args.insert(&format!("model_weight_{}", n), 0.7);
        random_args.insert(&format!("clip_weight_{}", n), 0.7);
        random_args.insert(&format!("chance_{}", n), 0.6);
    }
    match registry.create(RANDOM_LORA_STACK) {
        Ok(mut node) => {
            for pass in 1..=3 {
                let signal = registry.poll(node.as_mut(), &random_args);
                let outputs = registry.run(node.as_mut(), &random_args);
                match (signal, outputs) {
                    (Ok(signal), Ok(outputs)) => {
                        if let Some(signal) = signal {
                            println!("  pass {} signal {}", pass, signal);
                        }
                        print_outputs(RANDOM_LORA_STACK, &outputs);
                    }
                    (Err(e), _) | (_, Err(e)) => eprintln!("  {} failed: {}", RANDOM_LORA_STACK, e),
                }
            }
        }
        Err(e) => eprintln!("  {}", e),
    }

    step(
        APPLY_LORA_STACK,
        APPLY_LORA_STACK,
        Args::new()
            .with("model", model)
            .with("clip", clip)
            .with("lora_stack", stack),
    );

    println!("{}", "-".repeat(60));
    println!(
        "  {} weight loads, {} merges",
        store.load_count(),
        store.merge_log().len()
    );
}

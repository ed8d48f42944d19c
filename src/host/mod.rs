//! Host node contract
//!
//! The graph host asks each node for its input declaration, invokes it with
//! keyword arguments and, before re-running, polls it for a change signal.

mod bindings;
mod inputs;
mod registry;
mod value;

pub use inputs::{InputKind, InputSlot, InputTypes};
pub use registry::{
    NodeDescription, NodeRegistry, APPLY_LORA_STACK, LOAD_LORA, LORA_STACK, NODE_NAMES,
    RANDOM_LORA_STACK,
};
pub use value::{Args, Value};

use crate::config::NodeConfig;
use crate::error::Result;
use crate::session::ChangeSignal;

/// A node the host can place in a graph
pub trait Node: Send {
    /// Input declaration; `loras` is the store's listing for name choices
    fn input_types(&self, config: &NodeConfig, loras: &[String]) -> InputTypes;

    /// Output types, in output order
    fn return_types(&self) -> &'static [&'static str];

    /// Run the node on prepared arguments
    fn execute(&mut self, args: &Args) -> Result<Vec<Value>>;

    /// Re-execution token. `None` lets the host rely on input equality.
    fn is_changed(&mut self, _args: &Args) -> Result<Option<ChangeSignal>> {
        Ok(None)
    }
}

//! loranode-core: LoRA loader and stack nodes for graph-based image hosts
//!
//! Four nodes: a single LoRA loader with a one-slot weight cache, a
//! three-slot stack builder, a random stack builder with stride and forced
//! diversity, and a stack applier. Weight storage and session state are
//! injected through the `WeightStore` and `SessionStore` traits.

pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod nodes;
pub mod session;
pub mod store;

pub use config::NodeConfig;
pub use error::{LoraError, Result};
pub use host::{Args, Node, NodeRegistry, Value};
pub use model::{EncoderHandle, LoraSelection, LoraStack, ModelHandle, Switch};
pub use nodes::{LoraLoader, LoraStackBuilder, RandomLoraStack, StackApplier};
pub use session::{InMemorySessionStore, SessionStore};
pub use store::{DirectoryStore, InMemoryStore, WeightStore};

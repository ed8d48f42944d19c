//! LoRA nodes
//!
//! - `loader`: single LoRA behind a switch, with a one-slot weight cache
//! - `stack`: three switchable slots appended to an incoming stack
//! - `random_stack`: probabilistic slots with stride and forced diversity
//! - `apply`: folds a stack onto a model/encoder pair

mod apply;
mod draw;
mod loader;
mod random_stack;
mod stack;

pub use apply::StackApplier;
pub use draw::{DrawSource, RngDraws, SequenceDraws};
pub use loader::LoraLoader;
pub use random_stack::{RandomLoraStack, RandomSlot, RandomStackRequest, DEFAULT_MAX_ATTEMPTS};
pub use stack::{build_stack, LoraStackBuilder, StackSlot};

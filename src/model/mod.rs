//! Model data: opaque host handles and LoRA stack values
//!
//! Handles stand in for the host's model and text-encoder objects. A
//! selection names one LoRA with its two strengths; a stack is an ordered
//! list of selections folded onto a handle pair by the applier.

mod handle;
mod selection;

pub use handle::{AppliedPatch, EncoderHandle, ModelHandle};
pub use selection::{is_none_name, LoraSelection, LoraStack, Switch, NONE};

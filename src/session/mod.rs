//! Randomization sessions for the random LoRA stack
//!
//! A session is keyed by the unordered set of candidate LoRA names, not by
//! node instance: two nodes offering the same three names share one stride
//! counter and one recorded selection. The store is injected so hosts decide
//! how widely sessions are shared.

mod key;
mod store;

pub use key::{ChangeSignal, SessionKey};
pub use store::{InMemorySessionStore, SessionState, SessionStore};

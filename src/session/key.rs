//! Order-independent hashing of name sets

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a randomization session: SHA-256 over the sorted,
/// de-duplicated candidate names.
///
/// `(A, B, C)` and `(C, B, A)` map to the same key, as do `(A, A, None)` and
/// `(None, A, None)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let set: BTreeSet<&str> = names.into_iter().collect();
        Self(hash_set(set))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0[..12])
    }
}

/// Token the host compares between passes to decide whether to re-run a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSignal(String);

impl ChangeSignal {
    /// Signal for a selected-name set
    pub fn of(selection: &BTreeSet<String>) -> Self {
        Self(hash_set(selection.iter().map(String::as_str)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names are fed in sorted order with a NUL after each, so `{"ab"}` and
/// `{"a", "b"}` hash differently.
fn hash_set<'a, I>(sorted: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for name in sorted {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_slot_order() {
        let a = SessionKey::from_names(["a", "b", "c"]);
        let b = SessionKey::from_names(["c", "b", "a"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_collapses_duplicates() {
        let a = SessionKey::from_names(["a", "a", "None"]);
        let b = SessionKey::from_names(["None", "a", "None"]);
        assert_eq!(a, b);
        assert_ne!(a, SessionKey::from_names(["a", "b", "None"]));
    }

    #[test]
    fn test_signal_separates_names() {
        let joined: BTreeSet<String> = ["ab".to_string()].into_iter().collect();
        let split: BTreeSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        assert_ne!(ChangeSignal::of(&joined), ChangeSignal::of(&split));
    }

    #[test]
    fn test_empty_selection_has_stable_signal() {
        let empty = BTreeSet::new();
        assert_eq!(ChangeSignal::of(&empty), ChangeSignal::of(&BTreeSet::new()));
        assert_eq!(ChangeSignal::of(&empty).as_str().len(), 64);
    }
}

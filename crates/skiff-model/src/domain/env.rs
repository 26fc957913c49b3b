use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::KeyValue;

/// Environment overrides for one runnable.
///
/// Keys are unique and keep their first insertion order, so the remote side
/// exports them in the same order they were configured.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(transparent)]
pub struct Env(Vec<KeyValue>);

impl Env {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|kv| kv.key() == key).map(|kv| kv.value())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` to `value`.
    ///
    /// An existing key is only replaced when `overwrite` is set; a new key is always appended.
    /// Returns `true` if the environment changed.
    pub fn set<K, V>(&mut self, key: K, value: V, overwrite: bool) -> bool
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        match self.0.iter_mut().find(|kv| kv.key() == key) {
            Some(existing) if overwrite => {
                existing.set_value(value.into());
                true
            }
            Some(_) => false,
            None => {
                self.0.push(KeyValue::new(key, value));
                true
            }
        }
    }

    /// Merge all entries of `other` into `self` using [`Env::set`] semantics.
    pub fn merge<I, K, V>(&mut self, other: I, overwrite: bool)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.set(k, v, overwrite);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut env = Env::new();
        env.merge(iter, true);
        env
    }
}

//! String interning for property paths and source ids.
//!
//! Keys are interned once, at registration time, and addressed by a dense
//! `u32` afterwards. Indices are assigned in registration order, so two
//! participants that register the same keys in the same order agree on every
//! index.
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
pub(crate) struct Interner<K> {
    index: HashMap<K, u32>,
    keys: Vec<K>,
}

impl<K> Interner<K>
where
    K: Clone + Eq + Hash + Borrow<str>,
{
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            keys: Vec::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<u32> {
        self.index.get(key).copied()
    }

    pub(crate) fn intern(&mut self, key: &K) -> u32 {
        if let Some(&id) = self.index.get(key.borrow()) {
            return id;
        }
        let id = self.keys.len() as u32;
        self.keys.push(key.clone());
        self.index.insert(key.clone(), id);
        id
    }

    /// Panics on an index this interner never produced; indices only come
    /// from [`Self::intern`] and [`Self::get`].
    pub(crate) fn resolve(&self, id: u32) -> &K {
        &self.keys[id as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

impl<K> Default for Interner<K>
where
    K: Clone + Eq + Hash + Borrow<str>,
{
    fn default() -> Self {
        Self::new()
    }
}

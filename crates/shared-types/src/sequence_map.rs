//! # Sequence Map
//!
//! A map whose keys each carry a sequence number (generation or birth round),
//! with a sliding lower bound. Shifting the window evicts every entry whose
//! sequence number falls below the new bound.
//!
//! Used by the deduplicator and orphan buffer to keep their state bounded by
//! the event window.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

/// Window-bounded map keyed by `K`, indexed by a per-key sequence number.
pub struct SequenceMap<K, V> {
    entries: HashMap<K, V>,
    by_sequence: BTreeMap<u64, HashSet<K>>,
    sequence_of: fn(&K) -> u64,
    lower_bound: u64,
}

impl<K, V> SequenceMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty map. `sequence_of` extracts the sequence number of a key.
    pub fn new(sequence_of: fn(&K) -> u64) -> Self {
        Self {
            entries: HashMap::new(),
            by_sequence: BTreeMap::new(),
            sequence_of,
            lower_bound: 0,
        }
    }

    /// Smallest sequence number the map currently accepts.
    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    /// Insert or replace a value.
    ///
    /// Returns `false` without inserting if the key is below the window.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let sequence = (self.sequence_of)(&key);
        if sequence < self.lower_bound {
            return false;
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.by_sequence.entry(sequence).or_default().insert(key);
        }
        true
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Value for `key`, inserting `make()` if absent.
    ///
    /// Returns `None` if the key is below the window.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> Option<&mut V> {
        let sequence = (self.sequence_of)(&key);
        if sequence < self.lower_bound {
            return None;
        }
        if !self.entries.contains_key(&key) {
            self.by_sequence
                .entry(sequence)
                .or_default()
                .insert(key.clone());
        }
        Some(self.entries.entry(key).or_insert_with(make))
    }

    /// Remove `key` and return its value.
    ///
    /// The index is cleaned under the stored key's sequence number, which may
    /// differ from the lookup key's when equality ignores the sequence.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (stored, value) = self.entries.remove_entry(key)?;
        let sequence = (self.sequence_of)(&stored);
        if let Some(keys) = self.by_sequence.get_mut(&sequence) {
            keys.remove(&stored);
            if keys.is_empty() {
                self.by_sequence.remove(&sequence);
            }
        }
        Some(value)
    }

    /// Raise the lower bound to `threshold`, handing every evicted entry to
    /// `on_evict` in ascending sequence order.
    ///
    /// A threshold at or below the current bound is a no-op.
    pub fn shift_window(&mut self, threshold: u64, mut on_evict: impl FnMut(K, V)) {
        if threshold <= self.lower_bound {
            return;
        }
        self.lower_bound = threshold;

        let retained = self.by_sequence.split_off(&threshold);
        let evicted = std::mem::replace(&mut self.by_sequence, retained);
        for key in evicted.into_values().flatten() {
            if let Some(value) = self.entries.remove(&key) {
                on_evict(key, value);
            }
        }
    }

    /// Drop every entry and reset the lower bound.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_sequence.clear();
        self.lower_bound = 0;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> std::fmt::Debug for SequenceMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceMap")
            .field("len", &self.entries.len())
            .field("lower_bound", &self.lower_bound)
            .finish()
    }
}

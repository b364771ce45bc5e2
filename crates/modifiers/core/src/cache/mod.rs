//! Lazily populated resolved-value cache and the player-scope membership index.
//!
//! Nothing in here is persisted. Both structures are empty after a restore and
//! refill on first read.
mod membership;

pub use membership::PlayerScopeIndex;

use std::collections::{BTreeSet, HashMap};

use crate::store::PropertyId;
use crate::types::EntityId;

/// Cache key for a raw value: its exact bits, with all NaNs sharing one key.
///
/// `+0.0` and `-0.0` stay apart because an identity fold hands the raw value
/// back unchanged, sign included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct RawKey(u64);

impl RawKey {
    fn of(raw: f64) -> Self {
        if raw.is_nan() {
            Self(f64::NAN.to_bits())
        } else {
            Self(raw.to_bits())
        }
    }
}

/// `(property, scope, raw) → resolved` cache.
#[derive(Clone, Debug, Default)]
pub struct ValueCache {
    rows: HashMap<(PropertyId, EntityId), HashMap<RawKey, f64>>,
    cached_properties: HashMap<EntityId, BTreeSet<PropertyId>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: PropertyId, scope: EntityId, raw: f64) -> Option<f64> {
        self.rows
            .get(&(property, scope))?
            .get(&RawKey::of(raw))
            .copied()
    }

    pub fn insert(&mut self, property: PropertyId, scope: EntityId, raw: f64, value: f64) {
        self.rows
            .entry((property, scope))
            .or_default()
            .insert(RawKey::of(raw), value);
        self.cached_properties
            .entry(scope)
            .or_default()
            .insert(property);
    }

    /// Drops the row for `(property, scope)`. Returns whether a row existed.
    pub fn invalidate(&mut self, property: PropertyId, scope: EntityId) -> bool {
        if self.rows.remove(&(property, scope)).is_none() {
            return false;
        }
        if let Some(properties) = self.cached_properties.get_mut(&scope) {
            properties.remove(&property);
            if properties.is_empty() {
                self.cached_properties.remove(&scope);
            }
        }
        true
    }

    /// Drops every row cached for `scope`. Returns how many rows went.
    pub fn invalidate_all(&mut self, scope: EntityId) -> usize {
        let Some(properties) = self.cached_properties.remove(&scope) else {
            return 0;
        };
        for property in &properties {
            self.rows.remove(&(*property, scope));
        }
        properties.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.cached_properties.clear();
    }

    /// Number of cached `(property, scope)` rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

//! The modifier store: the single source of truth for active modifiers.
//!
//! Entries are keyed by `(property, scope)` and kept in registration order
//! inside each key. The store knows nothing about caches; every mutation
//! reports what changed and the owner ([`crate::ModifiersManager`]) turns that
//! into invalidations and notices.
//!
//! # Layout
//!
//! ```text
//! properties: PropertyPath ⇄ PropertyId        (interned, dense)
//! sources:    SourceId     ⇄ SourceKey         (interned, dense)
//! slots:      (PropertyId, scope) → [entry]    (registration order)
//! scope_properties: scope → [PropertyId]       (first-registration order)
//! source_properties: (SourceKey, scope) → [PropertyId]
//! ```
//!
//! Lookups go through the hash maps; every sequence that is ever iterated to
//! fold values or to produce output is a `Vec`, never a hash map.
mod intern;

use std::collections::HashMap;
use std::sync::Arc;

use intern::Interner;

use crate::modification::Directive;
use crate::types::{EntityId, PropertyPath, SourceId};

/// Interned handle of a property path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SourceKey(u32);

#[derive(Clone, Debug)]
struct StoredEntry {
    source: SourceKey,
    directives: Arc<[Directive]>,
    stackable: bool,
    count: u32,
}

/// Borrowed view of one store entry.
#[derive(Clone, Copy, Debug)]
pub struct Modifier<'a> {
    pub source: &'a SourceId,
    pub directives: &'a [Directive],
    pub stackable: bool,
    /// Number of stacked instances; 1 for non-stackable entries.
    pub count: u32,
}

/// How an add call changed the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry was appended.
    Inserted,
    /// A non-stackable entry with the same source was overwritten in place.
    Replaced,
    /// A stackable entry with the same source gained one instance.
    Stacked,
}

/// Multi-key store of modifier entries.
#[derive(Clone, Debug, Default)]
pub struct ModifierStore {
    properties: Interner<PropertyPath>,
    sources: Interner<SourceId>,
    slots: HashMap<(PropertyId, EntityId), Vec<StoredEntry>>,
    scope_properties: HashMap<EntityId, Vec<PropertyId>>,
    source_properties: HashMap<(SourceKey, EntityId), Vec<PropertyId>>,
}

impl ModifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== interning =====

    /// Returns the id of `path`, interning it on first use.
    pub fn intern_property(&mut self, path: &PropertyPath) -> PropertyId {
        PropertyId(self.properties.intern(path))
    }

    /// Returns the id of `path` if it was ever interned.
    pub fn property_id(&self, path: &str) -> Option<PropertyId> {
        self.properties.get(path).map(PropertyId)
    }

    pub fn property_path(&self, id: PropertyId) -> &PropertyPath {
        self.properties.resolve(id.0)
    }

    /// Number of distinct property paths ever interned.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    fn source_key(&self, source: &str) -> Option<SourceKey> {
        self.sources.get(source).map(SourceKey)
    }

    // ===== mutation =====

    /// Registers `directives` from `source` under `(property, scope)`.
    ///
    /// A non-stackable add over an existing entry of the same source replaces
    /// the directives in place, keeping the entry's position. A stackable add
    /// increments the entry's instance count instead.
    pub fn add(
        &mut self,
        property: PropertyId,
        source: &SourceId,
        directives: Arc<[Directive]>,
        scope: EntityId,
        stackable: bool,
    ) -> AddOutcome {
        let key = SourceKey(self.sources.intern(source));
        let slot = self.slots.entry((property, scope)).or_default();

        if let Some(entry) = slot.iter_mut().find(|entry| entry.source == key) {
            if stackable {
                entry.count += 1;
                return AddOutcome::Stacked;
            }
            entry.directives = directives;
            entry.stackable = false;
            entry.count = 1;
            return AddOutcome::Replaced;
        }

        if slot.is_empty() {
            self.scope_properties.entry(scope).or_default().push(property);
        }
        slot.push(StoredEntry {
            source: key,
            directives,
            stackable,
            count: 1,
        });
        self.source_properties
            .entry((key, scope))
            .or_default()
            .push(property);
        AddOutcome::Inserted
    }

    /// Restores an entry with an explicit instance count (used on restore).
    ///
    /// Returns `false` if `(property, source, scope)` already held an entry,
    /// which a well-formed snapshot never does.
    pub(crate) fn restore(
        &mut self,
        property: PropertyId,
        source: &SourceId,
        directives: Arc<[Directive]>,
        scope: EntityId,
        stackable: bool,
        count: u32,
    ) -> bool {
        if self.add(property, source, directives, scope, stackable) != AddOutcome::Inserted {
            return false;
        }
        if let Some(entry) = self
            .slots
            .get_mut(&(property, scope))
            .and_then(|slot| slot.last_mut())
        {
            entry.count = count.max(1);
        }
        true
    }

    /// Removes `source`'s entry under `(property, scope)`.
    ///
    /// Stackable removal drops one instance and deletes the entry when the
    /// last instance goes; non-stackable removal deletes the entry outright.
    /// Returns whether anything changed.
    pub fn remove(
        &mut self,
        property: PropertyId,
        source: &str,
        scope: EntityId,
        stackable: bool,
    ) -> bool {
        let Some(key) = self.source_key(source) else {
            return false;
        };
        self.remove_keyed(property, key, scope, stackable)
    }

    fn remove_keyed(
        &mut self,
        property: PropertyId,
        key: SourceKey,
        scope: EntityId,
        stackable: bool,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(&(property, scope)) else {
            return false;
        };
        let Some(position) = slot.iter().position(|entry| entry.source == key) else {
            return false;
        };

        if stackable && slot[position].count > 1 {
            slot[position].count -= 1;
            return true;
        }

        slot.remove(position);
        if slot.is_empty() {
            self.slots.remove(&(property, scope));
            if let Some(properties) = self.scope_properties.get_mut(&scope) {
                properties.retain(|p| *p != property);
                if properties.is_empty() {
                    self.scope_properties.remove(&scope);
                }
            }
        }
        if let Some(properties) = self.source_properties.get_mut(&(key, scope)) {
            properties.retain(|p| *p != property);
            if properties.is_empty() {
                self.source_properties.remove(&(key, scope));
            }
        }
        true
    }

    /// Removes every entry `source` holds on `scope`.
    ///
    /// Returns the properties that changed, in the scope's property order
    /// (which survives a snapshot round trip). Calling it again returns an
    /// empty list.
    pub fn remove_all(&mut self, source: &str, scope: EntityId, stackable: bool) -> Vec<PropertyId> {
        let Some(key) = self.source_key(source) else {
            return Vec::new();
        };
        let Some(held) = self.source_properties.get(&(key, scope)) else {
            return Vec::new();
        };
        let properties: Vec<PropertyId> = self
            .properties_of(scope)
            .iter()
            .copied()
            .filter(|property| held.contains(property))
            .collect();
        properties
            .into_iter()
            .filter(|&property| self.remove_keyed(property, key, scope, stackable))
            .collect()
    }

    /// Drops everything registered on `scope`. Returns the affected properties.
    pub fn clear_scope(&mut self, scope: EntityId) -> Vec<PropertyId> {
        let Some(properties) = self.scope_properties.remove(&scope) else {
            return Vec::new();
        };
        for property in &properties {
            self.slots.remove(&(*property, scope));
        }
        self.source_properties.retain(|(_, s), _| *s != scope);
        properties
    }

    // ===== queries =====

    pub fn has(&self, property: &str, source: &str, scope: EntityId) -> bool {
        let (Some(property), Some(key)) = (self.property_id(property), self.source_key(source))
        else {
            return false;
        };
        self.source_properties
            .get(&(key, scope))
            .is_some_and(|properties| properties.contains(&property))
    }

    pub fn has_any(&self, source: &str, scope: EntityId) -> bool {
        self.source_key(source)
            .is_some_and(|key| self.source_properties.contains_key(&(key, scope)))
    }

    /// Entries under `(property, scope)` in registration order.
    ///
    /// With `stackable` set, an entry with several instances is repeated once
    /// per instance.
    pub fn modifiers(&self, property: PropertyId, scope: EntityId, stackable: bool) -> Vec<Modifier<'_>> {
        let Some(slot) = self.slots.get(&(property, scope)) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(slot.len());
        for entry in slot {
            let view = Modifier {
                source: self.sources.resolve(entry.source.0),
                directives: &entry.directives,
                stackable: entry.stackable,
                count: entry.count,
            };
            let repeats = if stackable { entry.count } else { 1 };
            out.extend(std::iter::repeat_n(view, repeats as usize));
        }
        out
    }

    /// Every property registered on `scope`, in first-registration order,
    /// with its entries.
    pub fn all_modifiers(
        &self,
        scope: EntityId,
        stackable: bool,
    ) -> Vec<(PropertyId, Vec<Modifier<'_>>)> {
        self.properties_of(scope)
            .iter()
            .map(|&property| (property, self.modifiers(property, scope, stackable)))
            .collect()
    }

    /// Directives to fold for `(property, scope)`: registration order, each
    /// entry repeated once per stacked instance.
    pub fn directives(
        &self,
        property: PropertyId,
        scope: EntityId,
    ) -> impl Iterator<Item = &Directive> + '_ {
        self.slots
            .get(&(property, scope))
            .into_iter()
            .flatten()
            .flat_map(|entry| {
                std::iter::repeat_n(entry, entry.count as usize)
                    .flat_map(|entry| entry.directives.iter())
            })
    }

    pub fn properties_of(&self, scope: EntityId) -> &[PropertyId] {
        self.scope_properties
            .get(&scope)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every scope holding at least one entry, ascending.
    pub fn scopes(&self) -> Vec<EntityId> {
        let mut scopes: Vec<_> = self.scope_properties.keys().copied().collect();
        scopes.sort_unstable();
        scopes
    }

    /// Total number of entries (stacked instances count once).
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

//! In-memory world facts backed by an ordered map.
//!
//! Hosts that keep their entity data elsewhere implement the oracle traits
//! directly; `WorldTable` serves tools, tests and headless replays.
use std::collections::BTreeMap;

use super::{IdentityOracle, OwnershipOracle};
use crate::types::{ClassList, EntityId, PlayerId};

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct EntityRecord {
    classes: Option<ClassList>,
    owner: Option<PlayerId>,
}

/// Ordered table of entity identities and owners.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldTable {
    entities: BTreeMap<EntityId, EntityRecord>,
}

impl WorldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) an entity with an identity and an owner.
    pub fn insert(&mut self, entity: EntityId, classes: ClassList, owner: Option<PlayerId>) {
        self.entities.insert(
            entity,
            EntityRecord {
                classes: Some(classes),
                owner,
            },
        );
    }

    /// Registers an entity that has no identity (and is therefore not modifiable).
    pub fn insert_anonymous(&mut self, entity: EntityId, owner: Option<PlayerId>) {
        self.entities.insert(
            entity,
            EntityRecord {
                classes: None,
                owner,
            },
        );
    }

    pub fn set_owner(&mut self, entity: EntityId, owner: Option<PlayerId>) {
        self.entities.entry(entity).or_default().owner = owner;
    }

    pub fn remove(&mut self, entity: EntityId) -> bool {
        self.entities.remove(&entity).is_some()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl IdentityOracle for WorldTable {
    fn classes(&self, entity: EntityId) -> Option<&ClassList> {
        self.entities.get(&entity)?.classes.as_ref()
    }
}

impl OwnershipOracle for WorldTable {
    fn owner(&self, entity: EntityId) -> Option<PlayerId> {
        self.entities.get(&entity)?.owner
    }

    fn entities_of(&self, player: PlayerId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, record)| record.owner == Some(player))
            .map(|(entity, _)| *entity)
            .collect()
    }
}

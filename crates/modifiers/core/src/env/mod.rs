//! Traits describing read-only world facts the engine consults.
//!
//! The engine never owns entities. It asks the world which classes an entity
//! carries and which player owns it. Either facility may be absent for a
//! given entity (or altogether): absence is an ordinary answer, not an error.
//! The [`Env`] aggregate bundles the oracles so the engine can be driven by
//! any concrete world implementation.
mod table;

pub use table::WorldTable;

use crate::types::{ClassList, EntityId, PlayerId};

/// Access to entity identities (class tags).
pub trait IdentityOracle {
    /// Returns the entity's class tags, or `None` when the entity has no
    /// identity and is therefore not modifiable.
    fn classes(&self, entity: EntityId) -> Option<&ClassList>;
}

/// Access to entity ownership.
pub trait OwnershipOracle {
    /// Returns the entity's owner, or `None` when the entity cannot be owned.
    fn owner(&self, entity: EntityId) -> Option<PlayerId>;

    /// Returns every entity currently owned by `player`, in ascending id order.
    fn entities_of(&self, player: PlayerId) -> Vec<EntityId>;
}

/// Aggregates the read-only oracles required by the resolution engine.
pub struct Env<'a, I, O>
where
    I: IdentityOracle + ?Sized,
    O: OwnershipOracle + ?Sized,
{
    identity: Option<&'a I>,
    ownership: Option<&'a O>,
}

impl<I, O> Clone for Env<'_, I, O>
where
    I: IdentityOracle + ?Sized,
    O: OwnershipOracle + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for Env<'_, I, O>
where
    I: IdentityOracle + ?Sized,
    O: OwnershipOracle + ?Sized,
{
}

pub type WorldEnv<'a> = Env<'a, dyn IdentityOracle + 'a, dyn OwnershipOracle + 'a>;

impl<'a, I, O> Env<'a, I, O>
where
    I: IdentityOracle + ?Sized,
    O: OwnershipOracle + ?Sized,
{
    pub fn new(identity: Option<&'a I>, ownership: Option<&'a O>) -> Self {
        Self {
            identity,
            ownership,
        }
    }

    pub fn with_all(identity: &'a I, ownership: &'a O) -> Self {
        Self::new(Some(identity), Some(ownership))
    }

    pub fn empty() -> Self {
        Self {
            identity: None,
            ownership: None,
        }
    }

    /// Class tags of `entity`; `None` if there is no identity facility at all
    /// or the entity has no identity.
    pub fn classes(&self, entity: EntityId) -> Option<&'a ClassList> {
        self.identity?.classes(entity)
    }

    /// Owner of `entity`, with the unowned sentinel folded into `None`.
    pub fn owner(&self, entity: EntityId) -> Option<PlayerId> {
        self.ownership?
            .owner(entity)
            .filter(|player| player.is_valid())
    }

    /// Entities owned by `player`, or `None` when ownership is not tracked.
    pub fn entities_of(&self, player: PlayerId) -> Option<Vec<EntityId>> {
        self.ownership.map(|ownership| ownership.entities_of(player))
    }
}

impl<'a, I, O> Env<'a, I, O>
where
    I: IdentityOracle + 'a,
    O: OwnershipOracle + 'a,
{
    /// Converts this environment into a trait-object based `WorldEnv` (borrows self).
    pub fn as_world_env(&self) -> WorldEnv<'a> {
        let identity: Option<&'a dyn IdentityOracle> = self.identity.map(|identity| identity as _);
        let ownership: Option<&'a dyn OwnershipOracle> =
            self.ownership.map(|ownership| ownership as _);
        Env::new(identity, ownership)
    }
}

//! Player-scope membership index.
//!
//! For every player-scope entity, records which entities resolved which
//! property through it. A change to a player-wide modifier then invalidates
//! exactly those entities instead of sweeping all of the player's units.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::store::PropertyId;
use crate::types::{EntityId, PlayerId};

#[derive(Clone, Debug)]
struct Bucket {
    player: PlayerId,
    tracked: HashMap<PropertyId, BTreeSet<EntityId>>,
}

/// Buckets keyed by player-scope entity, plus the player → scope mapping.
#[derive(Clone, Debug, Default)]
pub struct PlayerScopeIndex {
    scopes: BTreeMap<PlayerId, EntityId>,
    buckets: HashMap<EntityId, Bucket>,
}

impl PlayerScopeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `scope` the player-scope of `player`.
    ///
    /// Returns the scope previously registered for `player`, if it differs.
    /// The previous bucket is left in place; callers retire it through
    /// [`Self::unregister`].
    pub fn register(&mut self, player: PlayerId, scope: EntityId) -> Option<EntityId> {
        self.buckets
            .entry(scope)
            .and_modify(|bucket| bucket.player = player)
            .or_insert_with(|| Bucket {
                player,
                tracked: HashMap::new(),
            });
        self.scopes
            .insert(player, scope)
            .filter(|previous| *previous != scope)
    }

    /// Removes the bucket of `scope`, returning its player and every entity
    /// it tracked, grouped per property (entities ascending, properties in
    /// ascending id order).
    pub fn unregister(
        &mut self,
        scope: EntityId,
    ) -> Option<(PlayerId, Vec<(PropertyId, BTreeSet<EntityId>)>)> {
        let bucket = self.buckets.remove(&scope)?;
        if self.scopes.get(&bucket.player) == Some(&scope) {
            self.scopes.remove(&bucket.player);
        }
        let mut tracked: Vec<_> = bucket.tracked.into_iter().collect();
        tracked.sort_unstable_by_key(|(property, _)| *property);
        Some((bucket.player, tracked))
    }

    pub fn scope_of(&self, player: PlayerId) -> Option<EntityId> {
        self.scopes.get(&player).copied()
    }

    pub fn player_of(&self, scope: EntityId) -> Option<PlayerId> {
        self.buckets.get(&scope).map(|bucket| bucket.player)
    }

    pub fn is_player_scope(&self, scope: EntityId) -> bool {
        self.buckets.contains_key(&scope)
    }

    /// Notes that `entity` resolved `property` through `scope`.
    pub fn record(&mut self, scope: EntityId, property: PropertyId, entity: EntityId) {
        if let Some(bucket) = self.buckets.get_mut(&scope) {
            bucket.tracked.entry(property).or_default().insert(entity);
        }
    }

    /// Takes (and clears) the entities recorded for `(scope, property)`.
    pub fn take_tracked(&mut self, scope: EntityId, property: PropertyId) -> BTreeSet<EntityId> {
        self.buckets
            .get_mut(&scope)
            .and_then(|bucket| bucket.tracked.remove(&property))
            .unwrap_or_default()
    }

    /// Removes `entity` from every record of `scope`.
    pub fn forget(&mut self, scope: EntityId, entity: EntityId) {
        if let Some(bucket) = self.buckets.get_mut(&scope) {
            bucket.tracked.retain(|_, entities| {
                entities.remove(&entity);
                !entities.is_empty()
            });
        }
    }

    /// Removes `entity` from every bucket.
    pub fn forget_everywhere(&mut self, entity: EntityId) {
        for bucket in self.buckets.values_mut() {
            bucket.tracked.retain(|_, entities| {
                entities.remove(&entity);
                !entities.is_empty()
            });
        }
    }

    /// Registered `(player, scope)` pairs, ascending by player.
    pub fn known_player_scopes(&self) -> Vec<(PlayerId, EntityId)> {
        self.scopes
            .iter()
            .map(|(player, scope)| (*player, *scope))
            .collect()
    }

    pub fn clear_records(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.tracked.clear();
        }
    }
}

//! The resolution engine.
//!
//! [`ModifiersManager`] owns the modifier store, the value cache and the
//! player-scope membership index, and keeps the three consistent: every
//! mutation invalidates exactly the cache rows that depended on it before the
//! call returns, and queues a [`Notice`] for the consumers.
//!
//! Resolution order for an entity is fixed:
//!
//! ```text
//! raw ─► owner's player-scope directives ─► entity-local directives ─► cached
//! ```
//!
//! Within a scope, directives fold in registration order.
mod resolve;

pub(crate) use resolve::{fold_scopes, scope_summary};

use std::collections::{BTreeSet, HashMap};
use std::iter;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::{PlayerScopeIndex, ValueCache};
use crate::config::EngineConfig;
use crate::env::{Env, IdentityOracle, OwnershipOracle};
use crate::modification::{Directive, ModificationSummary};
use crate::notify::{ComponentId, Notice};
use crate::store::{Modifier, ModifierStore, PropertyId};
use crate::types::{ClassList, EntityId, PlayerId, PropertyPath, SourceId};

/// One instance per running simulation, owned by the simulation world.
#[derive(Clone, Debug, Default)]
pub struct ModifiersManager {
    pub(crate) config: EngineConfig,
    pub(crate) store: ModifierStore,
    pub(crate) cache: ValueCache,
    pub(crate) players: PlayerScopeIndex,
    tombstones: BTreeSet<EntityId>,
    notices: Vec<Notice>,
}

impl ModifiersManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ModifierStore {
        &self.store
    }

    // ===== producer API =====

    /// Registers `directives` from `source` on `scope` for `property`.
    ///
    /// A non-stackable add replaces an existing entry of the same source; a
    /// stackable add stacks one more instance. Returns `false` if the scope is
    /// invalid or was destroyed during this step, in which case nothing
    /// happens.
    pub fn add_modifier(
        &mut self,
        property: impl Into<PropertyPath>,
        source: impl Into<SourceId>,
        directives: impl Into<Arc<[Directive]>>,
        scope: EntityId,
        stackable: bool,
    ) -> bool {
        let source = source.into();
        if !self.accepts(scope, &source) {
            return false;
        }
        self.add_accepted(&property.into(), &source, directives.into(), scope, stackable);
        true
    }

    /// Batch form of [`Self::add_modifier`]: one entry (and one invalidation)
    /// per property. Returns the number of properties registered.
    pub fn add_modifiers(
        &mut self,
        source: impl Into<SourceId>,
        modifications: impl IntoIterator<Item = (PropertyPath, Arc<[Directive]>)>,
        scope: EntityId,
        stackable: bool,
    ) -> usize {
        let source = source.into();
        if !self.accepts(scope, &source) {
            return 0;
        }
        let mut added = 0;
        for (property, directives) in modifications {
            self.add_accepted(&property, &source, directives, scope, stackable);
            added += 1;
        }
        added
    }

    fn add_accepted(
        &mut self,
        property: &PropertyPath,
        source: &SourceId,
        directives: Arc<[Directive]>,
        scope: EntityId,
        stackable: bool,
    ) {
        let id = self.store.intern_property(property);
        let outcome = self.store.add(id, source, directives, scope, stackable);
        trace!(
            target: "modifiers::store",
            %property,
            %source,
            %scope,
            ?outcome,
            "Modifier added"
        );
        self.modifiers_changed(id, scope);
    }

    fn accepts(&self, scope: EntityId, source: &SourceId) -> bool {
        if !scope.is_valid() {
            debug!(target: "modifiers::store", %source, "Ignoring modifier for invalid scope");
            return false;
        }
        if self.tombstones.contains(&scope) {
            debug!(
                target: "modifiers::store",
                %source,
                %scope,
                "Ignoring modifier for destroyed scope"
            );
            return false;
        }
        true
    }

    /// Removes `source`'s entry for `property` on `scope`.
    ///
    /// Stackable removal drops one instance. Returns whether anything changed;
    /// only then are caches invalidated and a notice queued.
    pub fn remove_modifier(&mut self, property: &str, source: &str, scope: EntityId, stackable: bool) -> bool {
        let Some(id) = self.store.property_id(property) else {
            return false;
        };
        if !self.store.remove(id, source, scope, stackable) {
            return false;
        }
        trace!(target: "modifiers::store", property, source, %scope, "Modifier removed");
        self.modifiers_changed(id, scope);
        true
    }

    /// Removes every entry `source` holds on `scope`. Idempotent: a second
    /// call changes nothing and returns 0.
    pub fn remove_all_modifiers(&mut self, source: &str, scope: EntityId, stackable: bool) -> usize {
        let removed = self.store.remove_all(source, scope, stackable);
        if !removed.is_empty() {
            debug!(
                target: "modifiers::store",
                source,
                %scope,
                properties = removed.len(),
                "Removed all modifiers of source"
            );
        }
        for &id in &removed {
            self.modifiers_changed(id, scope);
        }
        removed.len()
    }

    pub fn has_modifier(&self, property: &str, source: &str, scope: EntityId) -> bool {
        self.store.has(property, source, scope)
    }

    pub fn has_any_modifier(&self, source: &str, scope: EntityId) -> bool {
        self.store.has_any(source, scope)
    }

    /// Entries for `property` on `scope`, in registration order. With
    /// `stackable`, stacked entries repeat once per instance.
    pub fn get_modifiers(&self, property: &str, scope: EntityId, stackable: bool) -> Vec<Modifier<'_>> {
        self.store
            .property_id(property)
            .map(|id| self.store.modifiers(id, scope, stackable))
            .unwrap_or_default()
    }

    /// Every property with entries on `scope`, in first-registration order.
    pub fn get_all_modifiers(&self, scope: EntityId, stackable: bool) -> Vec<(&PropertyPath, Vec<Modifier<'_>>)> {
        self.store
            .all_modifiers(scope, stackable)
            .into_iter()
            .map(|(id, modifiers)| (self.store.property_path(id), modifiers))
            .collect()
    }

    // ===== invalidation =====

    fn modifiers_changed(&mut self, id: PropertyId, scope: EntityId) {
        let property = self.store.property_path(id).clone();
        match self.players.player_of(scope) {
            Some(player) => {
                let tracked = self.invalidate_player_scope(id, scope);
                self.notices.push(Notice::Player {
                    player,
                    property,
                    tracked,
                });
            }
            None => {
                self.cache.invalidate(id, scope);
                self.notices.push(Notice::Entity {
                    entity: scope,
                    property,
                });
            }
        }
    }

    /// Drops the rows of every entity that resolved `id` through `scope`, then
    /// the scope's own row. Returns the entities that were tracked.
    fn invalidate_player_scope(&mut self, id: PropertyId, scope: EntityId) -> Vec<EntityId> {
        let tracked: Vec<_> = self.players.take_tracked(scope, id).into_iter().collect();
        for &entity in &tracked {
            self.cache.invalidate(id, entity);
        }
        self.cache.invalidate(id, scope);
        debug!(
            target: "modifiers::engine",
            %scope,
            entities = tracked.len(),
            "Invalidated player-scope dependants"
        );
        tracked
    }

    /// Drops cached values of `property` for `scope` (and, for a player
    /// scope, for every entity that resolved it through that scope).
    pub fn invalidate(&mut self, property: &str, scope: EntityId) {
        let Some(id) = self.store.property_id(property) else {
            return;
        };
        if self.players.is_player_scope(scope) {
            self.invalidate_player_scope(id, scope);
        } else {
            self.cache.invalidate(id, scope);
        }
    }

    /// Drops every cached property of `scope`. Returns the number of rows dropped.
    pub fn invalidate_all(&mut self, scope: EntityId) -> usize {
        self.cache.invalidate_all(scope)
    }

    // ===== resolution =====

    /// Effective value of `property` for `entity`, given its template value `raw`.
    ///
    /// Entities without an identity are not modifiable and get `raw` back.
    pub fn apply_modifiers<I, O>(&mut self, property: &str, raw: f64, entity: EntityId, env: &Env<'_, I, O>) -> f64
    where
        I: IdentityOracle + ?Sized,
        O: OwnershipOracle + ?Sized,
    {
        // Never registered anywhere: nothing can modify it and nothing needs
        // to invalidate it later.
        let Some(id) = self.store.property_id(property) else {
            return raw;
        };
        if let Some(value) = self.cache.get(id, entity, raw) {
            trace!(target: "modifiers::engine", property, %entity, raw, value, "Cache hit");
            return value;
        }

        let Some(classes) = env.classes(entity) else {
            return raw;
        };

        let player_scope = env.owner(entity).and_then(|player| {
            let scope = self.players.scope_of(player);
            if scope.is_none() {
                warn!(
                    target: "modifiers::engine",
                    %entity,
                    %player,
                    "Owner has no player scope; resolving entity-local modifiers only"
                );
            }
            scope
        });
        // A player entity owned by its own player resolves through itself once.
        let player_scope = player_scope.filter(|&scope| scope != entity);
        if let Some(scope) = player_scope {
            self.players.record(scope, id, entity);
        }

        let value = fold_scopes(&self.store, id, player_scope.into_iter().chain(iter::once(entity)), classes, raw);
        if !self.tombstones.contains(&entity) {
            self.cache.insert(id, entity, raw, value);
        }
        trace!(target: "modifiers::engine", property, %entity, raw, value, "Cache miss");
        value
    }

    /// Hypothetical value of `property` for a template with `classes` owned by
    /// `player`: player-wide modifiers only, no cache involvement.
    ///
    /// A template without an identity returns `raw`. The fold is the same one
    /// [`Self::apply_modifiers`] runs for the player scope.
    pub fn apply_template_modifiers(
        &self,
        property: &str,
        raw: f64,
        classes: Option<&ClassList>,
        player: PlayerId,
    ) -> f64 {
        let Some(classes) = classes else {
            return raw;
        };
        let (Some(id), Some(scope)) = (self.store.property_id(property), self.players.scope_of(player)) else {
            return raw;
        };
        fold_scopes(&self.store, id, [scope], classes, raw)
    }

    /// [`Self::apply_template_modifiers`] rounded to
    /// [`EngineConfig::template_precision`] decimals, for presenting
    /// hypothetical values.
    pub fn template_data_value(
        &self,
        property: &str,
        raw: f64,
        classes: Option<&ClassList>,
        player: PlayerId,
    ) -> f64 {
        self.config
            .round_template_value(self.apply_template_modifiers(property, raw, classes, player))
    }

    // ===== lifecycle =====

    /// Handles `entity` moving from player `from` to player `to`.
    ///
    /// Drops the entity's cached values and queues one notice per consuming
    /// component whose properties resolve differently under the new owner.
    pub fn on_ownership_changed<I, O>(&mut self, entity: EntityId, from: PlayerId, to: PlayerId, env: &Env<'_, I, O>)
    where
        I: IdentityOracle + ?Sized,
        O: OwnershipOracle + ?Sized,
    {
        self.cache.invalidate_all(entity);
        let old_scope = from
            .is_valid()
            .then(|| self.players.scope_of(from))
            .flatten();
        if let Some(scope) = old_scope {
            self.players.forget(scope, entity);
        }
        if !to.is_valid() {
            return;
        }
        let Some(classes) = env.classes(entity) else {
            return;
        };
        let new_scope = self.players.scope_of(to);

        let mut candidates: Vec<PropertyId> = Vec::new();
        for scope in [old_scope, new_scope].into_iter().flatten() {
            for &property in self.store.properties_of(scope) {
                if !candidates.contains(&property) {
                    candidates.push(property);
                }
            }
        }

        let summary = |scope: Option<EntityId>, property: PropertyId| {
            scope.map_or(ModificationSummary::IDENTITY, |scope| {
                scope_summary(&self.store, property, scope, classes)
            })
        };
        let separator = self.config.component_separator;
        let mut grouped: Vec<(ComponentId, Vec<PropertyPath>)> = Vec::new();
        for property in candidates {
            if summary(old_scope, property) == summary(new_scope, property) {
                continue;
            }
            let path = self.store.property_path(property).clone();
            let component = ComponentId::of(&path, separator);
            match grouped.iter_mut().find(|(c, _)| *c == component) {
                Some((_, paths)) => paths.push(path),
                None => grouped.push((component, vec![path])),
            }
        }

        debug!(
            target: "modifiers::engine",
            %entity,
            %from,
            %to,
            components = grouped.len(),
            "Ownership changed"
        );
        for (component, properties) in grouped {
            self.notices.push(Notice::Ownership {
                entity,
                component,
                properties,
            });
        }
    }

    /// Handles the player-scope entity of `player` changing from `from` to
    /// `to` (either may be [`EntityId::INVALID`]).
    ///
    /// Retiring a scope invalidates every value that was resolved through it.
    pub fn on_player_entity_changed(&mut self, player: PlayerId, from: EntityId, to: EntityId) {
        if to.is_valid() {
            self.players.register(player, to);
            debug!(target: "modifiers::engine", %player, scope = %to, "Player scope registered");
        }
        if from.is_valid() && from != to {
            self.retire_player_scope(from);
        }
    }

    fn retire_player_scope(&mut self, scope: EntityId) -> Option<(PlayerId, HashMap<PropertyId, Vec<EntityId>>)> {
        let (player, tracked) = self.players.unregister(scope)?;
        let mut dependants = HashMap::with_capacity(tracked.len());
        for (property, entities) in tracked {
            for &entity in &entities {
                self.cache.invalidate(property, entity);
            }
            dependants.insert(property, entities.into_iter().collect());
        }
        self.cache.invalidate_all(scope);
        debug!(target: "modifiers::engine", %player, %scope, "Player scope retired");
        Some((player, dependants))
    }

    /// Drops everything registered on `entity` and ignores further mutations
    /// on it until [`Self::finish_step`].
    pub fn on_entity_destroyed(&mut self, entity: EntityId) {
        if !entity.is_valid() || self.tombstones.contains(&entity) {
            return;
        }
        let removed = self.store.clear_scope(entity);
        let retired = self.retire_player_scope(entity);
        self.cache.invalidate_all(entity);
        self.players.forget_everywhere(entity);
        self.tombstones.insert(entity);

        if let Some((player, mut dependants)) = retired {
            for id in &removed {
                self.notices.push(Notice::Player {
                    player,
                    property: self.store.property_path(*id).clone(),
                    tracked: dependants.remove(id).unwrap_or_default(),
                });
            }
        }
        debug!(
            target: "modifiers::engine",
            %entity,
            properties = removed.len(),
            "Entity destroyed"
        );
    }

    /// Ends the current simulation step: destroyed scopes accept mutations
    /// again (entity ids are not reused within a step).
    pub fn finish_step(&mut self) {
        self.tombstones.clear();
    }

    pub fn is_destroyed(&self, entity: EntityId) -> bool {
        self.tombstones.contains(&entity)
    }

    // ===== notices and players =====

    /// Takes every queued notice, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn pending_notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn player_scope(&self, player: PlayerId) -> Option<EntityId> {
        self.players.scope_of(player)
    }

    /// Registered `(player, scope)` pairs, ascending by player.
    pub fn known_player_scopes(&self) -> Vec<(PlayerId, EntityId)> {
        self.players.known_player_scopes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::WorldTable;

    const HP: &str = "Health/Max";

    fn world() -> WorldTable {
        let mut world = WorldTable::new();
        world.insert(EntityId(10), ClassList::parse("Unit Infantry"), Some(PlayerId(1)));
        world.insert(EntityId(11), ClassList::parse("Unit Cavalry"), Some(PlayerId(1)));
        world
    }

    fn manager() -> ModifiersManager {
        let mut manager = ModifiersManager::new(EngineConfig::default());
        manager.on_player_entity_changed(PlayerId(1), EntityId::INVALID, EntityId(2));
        manager
    }

    #[test]
    fn player_scope_folds_before_local() {
        let world = world();
        let env = Env::with_all(&world, &world);
        let mut manager = manager();

        manager.add_modifier(HP, "local", vec![Directive::multiply("Unit", 2.0)], EntityId(10), false);
        manager.add_modifier(HP, "tech", vec![Directive::add("Unit", 10.0)], EntityId(2), false);

        // (100 + 10) × 2, not 100 × 2 + 10
        assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 220.0);
    }

    #[test]
    fn cached_values_are_invalidated_by_player_changes() {
        let world = world();
        let env = Env::with_all(&world, &world);
        let mut manager = manager();

        manager.add_modifier(HP, "tech", vec![Directive::add("Unit", 10.0)], EntityId(2), false);
        assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 110.0);
        assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(11), &env), 110.0);

        manager.add_modifier(HP, "tech", vec![Directive::add("Infantry", 5.0)], EntityId(2), false);
        assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 105.0);
        assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(11), &env), 100.0);
    }

    #[test]
    fn unidentified_entities_are_not_modifiable() {
        let mut world = world();
        world.insert_anonymous(EntityId(30), Some(PlayerId(1)));
        let env = Env::with_all(&world, &world);
        let mut manager = manager();

        manager.add_modifier(HP, "tech", vec![Directive::add("Unit", 10.0)], EntityId(2), false);
        assert_eq!(manager.apply_modifiers(HP, 50.0, EntityId(30), &env), 50.0);
    }

    #[test]
    fn destroyed_scope_ignores_mutations_until_step_ends() {
        let mut manager = manager();
        manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 1.0)], EntityId(10), false);
        manager.on_entity_destroyed(EntityId(10));

        assert!(!manager.has_any_modifier("aura", EntityId(10)));
        assert!(!manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 1.0)], EntityId(10), false));
        assert!(!manager.has_any_modifier("aura", EntityId(10)));

        manager.finish_step();
        assert!(manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 1.0)], EntityId(10), false));
    }

    #[test]
    fn notices_name_scope_kind() {
        let mut manager = manager();
        manager.add_modifier(HP, "tech", vec![Directive::add("Unit", 1.0)], EntityId(2), false);
        manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 1.0)], EntityId(10), false);
        // Removing something that is not there queues nothing.
        manager.remove_modifier(HP, "missing", EntityId(10), false);

        let notices = manager.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(matches!(notices[0], Notice::Player { player: PlayerId(1), .. }));
        assert!(matches!(notices[1], Notice::Entity { entity: EntityId(10), .. }));
        assert!(manager.pending_notices().is_empty());
    }

    #[test]
    fn template_data_values_round_representation_noise() {
        let mut manager = manager();
        manager.add_modifier(HP, "tech", vec![Directive::multiply("Unit", 1.1)], EntityId(2), false);
        let classes = ClassList::parse("Unit");
        assert_eq!(manager.apply_template_modifiers(HP, 3.0, Some(&classes), PlayerId(1)), 3.0 * 1.1);
        assert_eq!(manager.template_data_value(HP, 3.0, Some(&classes), PlayerId(1)), 3.3);
        assert_eq!(manager.template_data_value(HP, 3.0, None, PlayerId(1)), 3.0);
        assert_eq!(manager.template_data_value(HP, 3.0, Some(&classes), PlayerId(7)), 3.0);
    }

    #[test]
    fn template_resolution_keeps_large_values_finite() {
        let mut manager = manager();
        manager.add_modifier("Cost/Food", "tech", vec![Directive::multiply("Unit", 1.0)], EntityId(2), false);
        let classes = ClassList::parse("Unit");

        assert_eq!(manager.apply_template_modifiers("Cost/Food", 1e301, Some(&classes), PlayerId(1)), 1e301);
        assert_eq!(manager.template_data_value("Cost/Food", 1e301, Some(&classes), PlayerId(1)), 1e301);
        assert_eq!(
            manager.apply_template_modifiers("Cost/Food", f64::INFINITY, Some(&classes), PlayerId(1)),
            f64::INFINITY
        );
        assert!(
            manager
                .template_data_value("Cost/Food", f64::NAN, Some(&classes), PlayerId(1))
                .is_nan()
        );
    }

    #[test]
    fn template_and_entity_resolution_agree() {
        let world = world();
        let env = Env::with_all(&world, &world);
        let mut manager = manager();
        manager.add_modifier(HP, "tech", vec![Directive::multiply("Unit", 1.1)], EntityId(2), false);

        let infantry = ClassList::parse("Unit Infantry");
        assert_eq!(
            manager.apply_template_modifiers(HP, 3.0, Some(&infantry), PlayerId(1)),
            manager.apply_modifiers(HP, 3.0, EntityId(10), &env)
        );
    }

    #[test]
    fn identity_folds_keep_the_sign_of_zero() {
        let world = world();
        let env = Env::with_all(&world, &world);
        let mut manager = manager();
        manager.add_modifier(HP, "walls", vec![Directive::add("Structure", 5.0)], EntityId(2), false);

        let positive = manager.apply_modifiers(HP, 0.0, EntityId(10), &env);
        let negative = manager.apply_modifiers(HP, -0.0, EntityId(10), &env);
        assert!(positive.is_sign_positive());
        assert!(negative.is_sign_negative());
    }

    #[test]
    fn player_entity_owned_by_its_player_folds_once() {
        let mut world = world();
        world.insert(EntityId(2), ClassList::parse("Player"), Some(PlayerId(1)));
        let env = Env::with_all(&world, &world);
        let mut manager = manager();

        manager.add_modifier(
            "Player/MaxPopulation",
            "aura/wonder",
            vec![Directive::add("Player", 10.0)],
            EntityId(2),
            false,
        );
        assert_eq!(manager.apply_modifiers("Player/MaxPopulation", 100.0, EntityId(2), &env), 110.0);
        // Cached path gives the same answer.
        assert_eq!(manager.apply_modifiers("Player/MaxPopulation", 100.0, EntityId(2), &env), 110.0);
        assert_eq!(manager.view().apply_modifiers("Player/MaxPopulation", 100.0, EntityId(2), &env), 110.0);
    }
}

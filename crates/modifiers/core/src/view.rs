//! Read-only resolution for readers outside the simulation thread.
//!
//! The manager's cache is rewritten during invalidation, so other threads (a
//! UI building tooltips, an AI planning ahead) never borrow the manager.
//! They take a [`ModifierView`]: a frozen copy of the store that resolves
//! without caching.
use std::collections::BTreeMap;
use std::iter;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{ModifiersManager, fold_scopes};
use crate::env::{Env, IdentityOracle, OwnershipOracle};
use crate::store::{Modifier, ModifierStore};
use crate::types::{ClassList, EntityId, PlayerId};

/// Frozen, shareable copy of a manager's modifiers.
#[derive(Clone, Debug)]
pub struct ModifierView {
    store: Arc<ModifierStore>,
    player_scopes: BTreeMap<PlayerId, EntityId>,
    config: EngineConfig,
}

impl ModifiersManager {
    /// Copies the current store into a view.
    pub fn view(&self) -> ModifierView {
        ModifierView {
            store: Arc::new(self.store.clone()),
            player_scopes: self.players.known_player_scopes().into_iter().collect(),
            config: self.config.clone(),
        }
    }
}

impl ModifierView {
    /// Same result as [`ModifiersManager::apply_modifiers`] at the moment the
    /// view was taken.
    pub fn apply_modifiers<I, O>(&self, property: &str, raw: f64, entity: EntityId, env: &Env<'_, I, O>) -> f64
    where
        I: IdentityOracle + ?Sized,
        O: OwnershipOracle + ?Sized,
    {
        let Some(id) = self.store.property_id(property) else {
            return raw;
        };
        let Some(classes) = env.classes(entity) else {
            return raw;
        };
        let player_scope = env
            .owner(entity)
            .and_then(|player| self.player_scopes.get(&player).copied())
            .filter(|&scope| scope != entity);
        fold_scopes(&self.store, id, player_scope.into_iter().chain(iter::once(entity)), classes, raw)
    }

    /// Same result as [`ModifiersManager::apply_template_modifiers`].
    pub fn apply_template_modifiers(&self, property: &str, raw: f64, classes: Option<&ClassList>, player: PlayerId) -> f64 {
        let Some(classes) = classes else {
            return raw;
        };
        let (Some(id), Some(&scope)) = (self.store.property_id(property), self.player_scopes.get(&player)) else {
            return raw;
        };
        fold_scopes(&self.store, id, [scope], classes, raw)
    }

    /// Same result as [`ModifiersManager::template_data_value`].
    pub fn template_data_value(&self, property: &str, raw: f64, classes: Option<&ClassList>, player: PlayerId) -> f64 {
        self.config
            .round_template_value(self.apply_template_modifiers(property, raw, classes, player))
    }

    pub fn has_modifier(&self, property: &str, source: &str, scope: EntityId) -> bool {
        self.store.has(property, source, scope)
    }

    pub fn get_modifiers(&self, property: &str, scope: EntityId) -> Vec<Modifier<'_>> {
        self.store
            .property_id(property)
            .map(|id| self.store.modifiers(id, scope, false))
            .unwrap_or_default()
    }
}

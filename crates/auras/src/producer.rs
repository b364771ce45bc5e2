//! Per-emitter aura bookkeeping.
//!
//! Every aura keeps the entities it currently targets. Entities enter and
//! leave through range updates, garrison and turret changes or formation
//! membership; each entry registers (or removes) the aura's derived
//! modifiers on the target. Global auras skip the per-entity modifiers and
//! register once per affected player at player scope instead.
//!
//! [`Auras::clean`] is the full reset: everything is removed, the affected
//! players and tech gate are recomputed, and the aura is re-applied. It runs
//! whenever ownership, diplomacy, research or defeat could change the answer.
use modifiers_core::{
    AuraKind, AuraTemplate, ClassMatch, DerivedModifications, EntityId, ModifiersManager, PlayerId,
    SourceId,
};

use crate::error::AuraError;
use crate::world::{AuraWorld, RangeQueryId, Relations};

/// Runtime state of one aura, reset on every clean.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuraStatus {
    /// Entities the aura currently covers, in arrival order.
    pub targets: Vec<EntityId>,
    /// Whether the required technology (if any) was researched at the last clean.
    pub is_applied: bool,
    pub range_query: Option<RangeQueryId>,
    pub affected_players: Vec<PlayerId>,
}

#[derive(Clone, Debug)]
struct Aura {
    name: String,
    template: AuraTemplate,
    filter: ClassMatch,
    derived: DerivedModifications,
    source: SourceId,
    status: AuraStatus,
}

/// The auras carried by one emitter entity.
#[derive(Clone, Debug)]
pub struct Auras {
    emitter: EntityId,
    auras: Vec<Aura>,
}

impl Auras {
    /// Builds the emitter's auras in listing order. Call [`Self::clean`] once
    /// the emitter is placed in the world to start applying them.
    pub fn new(
        emitter: EntityId,
        auras: impl IntoIterator<Item = (String, AuraTemplate)>,
    ) -> Result<Self, AuraError> {
        let mut built: Vec<Aura> = Vec::new();
        for (name, template) in auras {
            if built.iter().any(|aura| aura.name == name) {
                return Err(AuraError::DuplicateAura { name });
            }
            if template.kind == AuraKind::Range
                && !template.radius.is_some_and(|radius| radius.is_finite() && radius >= 0.0)
            {
                return Err(AuraError::MissingRadius { name });
            }
            let base = SourceId::from(format!("aura/{name}"));
            let source = if template.stackable {
                base.stacked_for(emitter)
            } else {
                base
            };
            built.push(Aura {
                filter: template.target_filter(),
                derived: template.derive_modifications(),
                source,
                status: AuraStatus::default(),
                template,
                name,
            });
        }
        Ok(Self {
            emitter,
            auras: built,
        })
    }

    /// Builds from a whitespace separated list of template names.
    pub fn from_names<'t>(
        emitter: EntityId,
        names: &str,
        lookup: impl Fn(&str) -> Option<&'t AuraTemplate>,
    ) -> Result<Self, AuraError> {
        let mut auras = Vec::new();
        for name in names.split_whitespace() {
            let template = lookup(name).ok_or_else(|| AuraError::UnknownAura { name: name.to_owned() })?;
            auras.push((name.to_owned(), template.clone()));
        }
        Self::new(emitter, auras)
    }

    pub fn emitter(&self) -> EntityId {
        self.emitter
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.auras.iter().map(|aura| aura.name.as_str())
    }

    pub fn template(&self, name: &str) -> Option<&AuraTemplate> {
        self.get(name).map(|aura| &aura.template)
    }

    pub fn status(&self, name: &str) -> Option<&AuraStatus> {
        self.get(name).map(|aura| &aura.status)
    }

    /// Source id under which the aura's modifiers are registered.
    pub fn source(&self, name: &str) -> Option<&SourceId> {
        self.get(name).map(|aura| &aura.source)
    }

    pub fn affected_entities(&self, name: &str) -> Option<&[EntityId]> {
        self.get(name).map(|aura| &aura.status.targets[..])
    }

    pub fn affected_players(&self, name: &str) -> Option<&[PlayerId]> {
        self.get(name).map(|aura| &aura.status.affected_players[..])
    }

    /// Radius of a range aura; `None` for every other kind.
    pub fn range(&self, name: &str) -> Option<f64> {
        self.get(name)
            .filter(|aura| aura.template.kind == AuraKind::Range)
            .and_then(|aura| aura.template.radius)
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.get(name).is_some_and(|aura| aura.status.is_applied)
    }

    pub fn has_kind(&self, kind: AuraKind) -> bool {
        self.auras.iter().any(|aura| aura.template.kind == kind)
    }

    fn get(&self, name: &str) -> Option<&Aura> {
        self.auras.iter().find(|aura| aura.name == name)
    }

    /// Removes every effect, recomputes affected players and tech gates, and
    /// re-applies.
    pub fn clean<W: AuraWorld + ?Sized>(&mut self, manager: &mut ModifiersManager, world: &mut W) {
        let emitter = self.emitter;
        let mut previous_targets = Vec::with_capacity(self.auras.len());
        for aura in &mut self.auras {
            let targets = aura.status.targets.clone();
            if aura.template.kind == AuraKind::Global {
                aura.remove_template(manager, &*world);
            }
            aura.remove(manager, &*world, &targets);
            if let Some(query) = aura.status.range_query.take() {
                world.destroy_range_query(query);
            }
            previous_targets.push(targets);
        }

        for (aura, targets) in self.auras.iter_mut().zip(previous_targets) {
            aura.status = AuraStatus {
                affected_players: affected_players(emitter, &aura.template, &*world),
                is_applied: can_apply(emitter, &aura.template, &*world),
                ..AuraStatus::default()
            };
            if aura.status.affected_players.is_empty() {
                continue;
            }
            let players = aura.status.affected_players.clone();
            match aura.template.kind {
                AuraKind::Global => aura.apply_template(manager, &*world, &players),
                AuraKind::Player => {
                    let scopes: Vec<EntityId> = players
                        .iter()
                        .filter_map(|&player| world.player_entity(player))
                        .collect();
                    aura.apply(manager, &*world, &scopes);
                }
                AuraKind::Range => {
                    if let (true, Some(radius)) = (aura.status.is_applied, aura.template.radius) {
                        aura.status.range_query = Some(world.create_range_query(emitter, radius, &players));
                    }
                }
                _ => aura.apply(manager, &*world, &targets),
            }
        }

        tracing::debug!(target: "auras", emitter = emitter.0, auras = self.auras.len(), "cleaned auras");
    }

    /// Entities entered or left the radius of the range aura owning `query`.
    pub fn on_range_update<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        query: RangeQueryId,
        added: &[EntityId],
        removed: &[EntityId],
    ) {
        for aura in self
            .auras
            .iter_mut()
            .filter(|aura| aura.status.range_query == Some(query))
        {
            aura.apply(manager, world, added);
            aura.remove(manager, world, removed);
        }
    }

    pub fn on_garrisoned_units_changed<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        added: &[EntityId],
        removed: &[EntityId],
    ) {
        self.apply_kind(manager, world, AuraKind::GarrisonedUnits, added);
        self.remove_kind(manager, world, AuraKind::GarrisonedUnits, removed);
    }

    pub fn on_turrets_changed<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        added: &[EntityId],
        removed: &[EntityId],
    ) {
        self.apply_kind(manager, world, AuraKind::TurretedUnits, added);
        self.remove_kind(manager, world, AuraKind::TurretedUnits, removed);
    }

    pub fn apply_formation_aura<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        members: &[EntityId],
    ) {
        self.apply_kind(manager, world, AuraKind::Formation, members);
    }

    pub fn remove_formation_aura<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        members: &[EntityId],
    ) {
        self.remove_kind(manager, world, AuraKind::Formation, members);
    }

    pub fn apply_garrison_aura<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        structure: EntityId,
    ) {
        self.apply_kind(manager, world, AuraKind::Garrison, &[structure]);
    }

    pub fn remove_garrison_aura<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        structure: EntityId,
    ) {
        self.remove_kind(manager, world, AuraKind::Garrison, &[structure]);
    }

    /// The emitter moved from `old_holder` into `holder`; either may be
    /// [`EntityId::INVALID`].
    pub fn on_garrisoned_state_changed<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        holder: EntityId,
        old_holder: EntityId,
    ) {
        if !self.has_kind(AuraKind::Garrison) {
            return;
        }
        if holder != EntityId::INVALID {
            self.apply_garrison_aura(manager, world, holder);
        }
        if old_holder != EntityId::INVALID {
            self.remove_garrison_aura(manager, world, old_holder);
        }
    }

    pub fn on_ownership_changed<W: AuraWorld + ?Sized>(&mut self, manager: &mut ModifiersManager, world: &mut W) {
        self.clean(manager, world);
    }

    /// Re-cleans when either party is the emitter's player or owner.
    pub fn on_diplomacy_changed<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &mut W,
        player: PlayerId,
        other: PlayerId,
    ) {
        if self.belongs_to(&*world, player) || self.belongs_to(&*world, other) {
            self.clean(manager, world);
        }
    }

    /// Re-cleans when the emitter's player finished a technology one of its
    /// auras waits on.
    pub fn on_research_finished<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &mut W,
        player: PlayerId,
        technology: &str,
    ) {
        if !self.belongs_to(&*world, player) {
            return;
        }
        let gated = self
            .auras
            .iter()
            .any(|aura| aura.template.required_technology.as_deref() == Some(technology));
        if gated {
            self.clean(manager, world);
        }
    }

    /// Re-cleans when the emitter is the defeated player's entity or one of
    /// its auras affects that player.
    pub fn on_player_defeated<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &mut W,
        player: PlayerId,
    ) {
        let is_player_entity = world.player_of_entity(self.emitter) == Some(player);
        let affects_player = self
            .auras
            .iter()
            .any(|aura| aura.status.affected_players.contains(&player));
        if is_player_entity || affects_player {
            self.clean(manager, world);
        }
    }

    fn belongs_to<W: AuraWorld + ?Sized>(&self, world: &W, player: PlayerId) -> bool {
        world.player_of_entity(self.emitter) == Some(player) || world.owner(self.emitter) == Some(player)
    }

    fn apply_kind<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        kind: AuraKind,
        entities: &[EntityId],
    ) {
        for aura in self.auras.iter_mut().filter(|aura| aura.template.kind == kind) {
            aura.apply(manager, world, entities);
        }
    }

    fn remove_kind<W: AuraWorld + ?Sized>(
        &mut self,
        manager: &mut ModifiersManager,
        world: &W,
        kind: AuraKind,
        entities: &[EntityId],
    ) {
        for aura in self.auras.iter_mut().filter(|aura| aura.template.kind == kind) {
            aura.remove(manager, world, entities);
        }
    }
}

impl Aura {
    fn valid_targets<W: AuraWorld + ?Sized>(&self, world: &W, entities: &[EntityId]) -> Vec<EntityId> {
        entities
            .iter()
            .copied()
            .filter(|&entity| world.classes(entity).is_some_and(|classes| self.filter.matches(classes)))
            .collect()
    }

    fn apply<W: AuraWorld + ?Sized>(&mut self, manager: &mut ModifiersManager, world: &W, entities: &[EntityId]) {
        let valid = self.valid_targets(world, entities);
        if valid.is_empty() {
            return;
        }
        self.status.targets.extend_from_slice(&valid);
        // Global auras live at player scope; targets are bookkeeping only.
        if !self.status.is_applied || self.template.kind == AuraKind::Global {
            return;
        }
        for &entity in &valid {
            manager.add_modifiers(self.source.clone(), self.derived.iter(), entity, false);
        }
        tracing::trace!(target: "auras", aura = %self.name, targets = valid.len(), "applied aura");
    }

    fn remove<W: AuraWorld + ?Sized>(&mut self, manager: &mut ModifiersManager, world: &W, entities: &[EntityId]) {
        let valid = self.valid_targets(world, entities);
        if valid.is_empty() {
            return;
        }
        self.status.targets.retain(|target| !valid.contains(target));
        if !self.status.is_applied || self.template.kind == AuraKind::Global {
            return;
        }
        // Every listed entity, so a target whose classes changed since it
        // entered still loses the modifiers.
        for &entity in entities {
            for path in self.derived.paths() {
                manager.remove_modifier(path.as_str(), self.source.as_str(), entity, false);
            }
        }
        tracing::trace!(target: "auras", aura = %self.name, targets = valid.len(), "removed aura");
    }

    fn apply_template<W: AuraWorld + ?Sized>(&self, manager: &mut ModifiersManager, world: &W, players: &[PlayerId]) {
        if !self.status.is_applied {
            return;
        }
        for &player in players {
            let Some(scope) = world.player_entity(player) else {
                continue;
            };
            manager.add_modifiers(self.source.clone(), self.derived.iter(), scope, false);
        }
    }

    fn remove_template<W: AuraWorld + ?Sized>(&self, manager: &mut ModifiersManager, world: &W) {
        if !self.status.is_applied {
            return;
        }
        for &player in &self.status.affected_players {
            let Some(scope) = world.player_entity(player) else {
                continue;
            };
            for path in self.derived.paths() {
                manager.remove_modifier(path.as_str(), self.source.as_str(), scope, false);
            }
        }
    }
}

/// The emitter's player: itself when it is a player entity, else its owner.
fn emitter_player<W: AuraWorld + ?Sized>(emitter: EntityId, world: &W) -> Option<PlayerId> {
    world
        .player_of_entity(emitter)
        .or_else(|| world.owner(emitter))
        .filter(|player| player.is_valid())
}

fn affected_players<W: AuraWorld + ?Sized>(emitter: EntityId, template: &AuraTemplate, world: &W) -> Vec<PlayerId> {
    let Some(player) = emitter_player(emitter, world) else {
        return Vec::new();
    };
    if world.is_defeated(player) {
        return Vec::new();
    }
    let mask = Relations::from_affected(&template.affected_players);
    world
        .players()
        .into_iter()
        .filter(|&other| !world.is_defeated(other))
        .filter(|&other| {
            (mask.contains(Relations::PLAYER) && other == player) || world.relations(player, other).intersects(mask)
        })
        .collect()
}

fn can_apply<W: AuraWorld + ?Sized>(emitter: EntityId, template: &AuraTemplate, world: &W) -> bool {
    let Some(technology) = template.required_technology.as_deref() else {
        return true;
    };
    world
        .owner(emitter)
        .filter(|player| player.is_valid())
        .is_some_and(|owner| world.is_researched(owner, technology))
}

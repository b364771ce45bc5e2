//! Data-defined modification sources: technologies and auras.
//!
//! A template names the classes it affects and a list of per-property
//! modifications. [`ModificationTemplate::derive_modifications`] turns that
//! into the per-property directive lists the manager stores.
//!
//! Template-level `affects` entries are alternatives; the classes inside one
//! entry must all be present. A modification's own `affects` is appended to
//! every alternative, so `affects: ["Infantry", "Cavalry"]` with a
//! modification restricted to `Ranged` yields `Infantry+Ranged Cavalry+Ranged`.
use std::sync::Arc;

use crate::modification::{ClassMatch, Directive, Operation};
use crate::types::PropertyPath;

/// One entry of a template's `modifications` list.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModificationSpec {
    pub value: PropertyPath,
    pub operation: Operation,
    /// Whitespace-separated classes that must additionally be present.
    #[cfg_attr(feature = "serde", serde(default))]
    pub affects: Option<String>,
}

impl ModificationSpec {
    pub fn new(value: impl Into<PropertyPath>, operation: Operation) -> Self {
        Self {
            value: value.into(),
            operation,
            affects: None,
        }
    }

    pub fn restricted_to(mut self, affects: impl Into<String>) -> Self {
        self.affects = Some(affects.into());
        self
    }
}

/// A technology, or the modification part of an aura.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModificationTemplate {
    #[cfg_attr(feature = "serde", serde(default))]
    pub affects: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifications: Vec<ModificationSpec>,
}

impl ModificationTemplate {
    pub fn new(affects: impl IntoIterator<Item = impl Into<String>>, modifications: Vec<ModificationSpec>) -> Self {
        Self {
            affects: affects.into_iter().map(Into::into).collect(),
            modifications,
        }
    }

    /// Per-property directive lists, properties in first-mention order.
    pub fn derive_modifications(&self) -> DerivedModifications {
        let base: Vec<Vec<&str>> = if self.affects.is_empty() {
            vec![Vec::new()]
        } else {
            self.affects
                .iter()
                .map(|alternative| alternative.split_whitespace().collect())
                .collect()
        };

        let mut grouped: Vec<(PropertyPath, Vec<Directive>)> = Vec::new();
        for spec in &self.modifications {
            let extra: Vec<&str> = spec
                .affects
                .as_deref()
                .map(|affects| affects.split_whitespace().collect())
                .unwrap_or_default();
            let conjunctions: Vec<Vec<&str>> = base
                .iter()
                .map(|alternative| alternative.iter().chain(&extra).copied().collect())
                .collect();
            let directive = Directive::new(ClassMatch::from_conjunctions(&conjunctions), spec.operation);

            match grouped.iter_mut().find(|(path, _)| *path == spec.value) {
                Some((_, directives)) => directives.push(directive),
                None => grouped.push((spec.value.clone(), vec![directive])),
            }
        }
        DerivedModifications::from_grouped(grouped)
    }
}

/// Frozen per-property directive lists, ready to hand to
/// [`crate::ModifiersManager::add_modifiers`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedModifications {
    entries: Vec<(PropertyPath, Arc<[Directive]>)>,
}

impl DerivedModifications {
    fn from_grouped(grouped: Vec<(PropertyPath, Vec<Directive>)>) -> Self {
        Self {
            entries: grouped
                .into_iter()
                .map(|(path, directives)| (path, Arc::from(directives)))
                .collect(),
        }
    }

    /// Concatenates several derivations; lists for a shared property are
    /// joined in argument order.
    pub fn merge<'a>(all: impl IntoIterator<Item = &'a DerivedModifications>) -> Self {
        let mut grouped: Vec<(PropertyPath, Vec<Directive>)> = Vec::new();
        for derived in all {
            for (path, directives) in &derived.entries {
                match grouped.iter_mut().find(|(p, _)| p == path) {
                    Some((_, existing)) => existing.extend(directives.iter().cloned()),
                    None => grouped.push((path.clone(), directives.to_vec())),
                }
            }
        }
        Self::from_grouped(grouped)
    }

    pub fn get(&self, path: &str) -> Option<&[Directive]> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_str() == path)
            .map(|(_, directives)| &directives[..])
    }

    pub fn paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.entries.iter().map(|(path, _)| path)
    }

    /// Cheap clones of every `(path, directives)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyPath, Arc<[Directive]>)> + '_ {
        self.entries
            .iter()
            .map(|(path, directives)| (path.clone(), Arc::clone(directives)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an aura selects its targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "camelCase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum AuraKind {
    /// Entities inside a radius around the emitter.
    Range,
    /// Every entity of the affected players, applied at player scope.
    Global,
    /// The player-scope entities of the affected players.
    Player,
    /// The structure the emitter is garrisoned in.
    Garrison,
    /// Units garrisoned inside the emitter.
    GarrisonedUnits,
    /// Units turreted on the emitter.
    TurretedUnits,
    /// Members of the emitter's formation.
    Formation,
}

/// Diplomatic relation selecting the players an aura affects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AffectedPlayer {
    /// The emitter's own player.
    Player,
    Ally,
    MutualAlly,
    Neutral,
    Enemy,
}

/// A data-defined aura.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AuraTemplate {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: AuraKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub affects: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default = "AuraTemplate::default_affected_players"))]
    pub affected_players: Vec<AffectedPlayer>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifications: Vec<ModificationSpec>,
    /// Only meaningful for [`AuraKind::Range`].
    #[cfg_attr(feature = "serde", serde(default))]
    pub radius: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required_technology: Option<String>,
    /// Instances from different emitters stack on one target.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stackable: bool,
}

impl AuraTemplate {
    pub fn new(kind: AuraKind) -> Self {
        Self {
            kind,
            affects: Vec::new(),
            affected_players: Self::default_affected_players(),
            modifications: Vec::new(),
            radius: None,
            required_technology: None,
            stackable: false,
        }
    }

    pub fn default_affected_players() -> Vec<AffectedPlayer> {
        vec![AffectedPlayer::Player]
    }

    /// Class filter for candidate targets.
    ///
    /// Each `affects` entry is one alternative whose classes are separated by
    /// `+` or whitespace. An aura with no `affects` targets nothing.
    pub fn target_filter(&self) -> ClassMatch {
        ClassMatch::from_alternatives(self.affects.iter().map(String::as_str))
    }

    pub fn derive_modifications(&self) -> DerivedModifications {
        ModificationTemplate {
            affects: self.affects.clone(),
            modifications: self.modifications.clone(),
        }
        .derive_modifications()
    }
}

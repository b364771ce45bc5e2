use std::collections::BTreeMap;

use modifiers_core::{AuraTemplate, DerivedModifications, ModificationTemplate};

/// Named technology and aura templates.
///
/// Names iterate in sorted order so every participant derives the same
/// sequence of modifiers from the same data set.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateRegistry {
    technologies: BTreeMap<String, ModificationTemplate>,
    auras: BTreeMap<String, AuraTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous template registered under `name`, if any.
    pub fn add_technology(&mut self, name: impl Into<String>, template: ModificationTemplate) -> Option<ModificationTemplate> {
        self.technologies.insert(name.into(), template)
    }

    pub fn add_aura(&mut self, name: impl Into<String>, template: AuraTemplate) -> Option<AuraTemplate> {
        self.auras.insert(name.into(), template)
    }

    pub fn technology(&self, name: &str) -> Option<&ModificationTemplate> {
        self.technologies.get(name)
    }

    pub fn aura(&self, name: &str) -> Option<&AuraTemplate> {
        self.auras.get(name)
    }

    pub fn has_technology(&self, name: &str) -> bool {
        self.technologies.contains_key(name)
    }

    pub fn has_aura(&self, name: &str) -> bool {
        self.auras.contains_key(name)
    }

    pub fn technology_names(&self) -> impl Iterator<Item = &str> {
        self.technologies.keys().map(String::as_str)
    }

    pub fn aura_names(&self) -> impl Iterator<Item = &str> {
        self.auras.keys().map(String::as_str)
    }

    /// Derived per-property directives of a technology.
    pub fn technology_modifications(&self, name: &str) -> Option<DerivedModifications> {
        self.technology(name).map(ModificationTemplate::derive_modifications)
    }

    pub fn aura_modifications(&self, name: &str) -> Option<DerivedModifications> {
        self.aura(name).map(AuraTemplate::derive_modifications)
    }

    pub fn len(&self) -> usize {
        self.technologies.len() + self.auras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty() && self.auras.is_empty()
    }
}

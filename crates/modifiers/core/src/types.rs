//! Identifier types shared by the store, the cache and the producers.
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for any simulated entity, including player-scope entities.
///
/// Entity ids double as scope handles: modifiers attach to an entity id, and a
/// player-wide modifier attaches to the entity that represents that player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved identifier meaning "no entity".
    pub const INVALID: Self = Self(0);

    /// Reserved identifier for the world/system entity.
    pub const SYSTEM: Self = Self(1);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Player identifier as used by ownership and diplomacy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerId(pub i32);

impl PlayerId {
    /// Owner value for unowned entities.
    pub const INVALID: Self = Self(-1);

    /// The nature player.
    pub const GAIA: Self = Self(0);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// Stable key naming one templated attribute, e.g. `Attack/Ranged/Pierce`.
///
/// The engine treats the path as opaque. The only structure it relies on is
/// the leading segment, which names the component consuming the value and is
/// used to group change notifications.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PropertyPath(Arc<str>);

impl PropertyPath {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading segment of the path, up to (not including) `separator`.
    pub fn component(&self, separator: char) -> &str {
        self.0.split(separator).next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PropertyPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PropertyPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Identifier of the origin of a modifier: a technology, an aura, an upgrade.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a per-emitter id so that several emitters of the same stackable
    /// source never collapse into one store entry.
    pub fn stacked_for(&self, emitter: EntityId) -> Self {
        Self::new(format!("{}{}", self.0, emitter.0))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Class tags carried by an entity's identity, e.g. `Unit Infantry Melee`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn new(classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(classes.into_iter().map(Into::into).collect())
    }

    /// Parses a whitespace-separated class string.
    pub fn parse(classes: &str) -> Self {
        Self::new(classes.split_whitespace())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_is_leading_segment() {
        let path = PropertyPath::from("Attack/Ranged/Pierce");
        assert_eq!(path.component('/'), "Attack");

        let flat = PropertyPath::from("Vision");
        assert_eq!(flat.component('/'), "Vision");
    }

    #[test]
    fn stacked_source_is_suffixed_with_emitter() {
        let source = SourceId::from("aura/heal");
        assert_eq!(source.stacked_for(EntityId(42)).as_str(), "aura/heal42");
    }

    #[test]
    fn class_list_parses_whitespace() {
        let classes = ClassList::parse("  Unit\tInfantry   Melee ");
        assert!(classes.contains("Infantry"));
        assert!(!classes.contains("Cavalry"));
        assert_eq!(classes.to_string(), "Unit Infantry Melee");
    }
}

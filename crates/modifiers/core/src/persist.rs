//! Save/restore of the modifier store.
//!
//! Only store contents and the player → scope mapping are persisted. The
//! value cache and the membership index start empty after a restore and
//! refill lazily.
//!
//! Snapshot order is canonical: scopes ascending, then each scope's properties
//! in first-registration order, then each property's entries in registration
//! order. Replaying a snapshot in that order reproduces every fold order, so
//! two participants holding equal snapshots resolve every value identically.
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::ModifiersManager;
use crate::error::{EngineError, ErrorSeverity};
use crate::modification::Directive;
use crate::types::{EntityId, PlayerId, PropertyPath, SourceId};

/// One persisted store entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotEntry {
    pub property: PropertyPath,
    pub source: SourceId,
    pub scope: EntityId,
    pub directives: Vec<Directive>,
    pub stackable: bool,
    /// Stacked instances; 1 unless `stackable`.
    pub count: u32,
}

/// Persisted state of a [`ModifiersManager`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub known_player_scopes: Vec<(PlayerId, EntityId)>,
}

/// Errors raised while encoding, decoding or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[cfg(feature = "serde")]
    #[error("failed to encode store snapshot")]
    Encode(#[source] bincode::Error),

    #[cfg(feature = "serde")]
    #[error("failed to decode store snapshot")]
    Decode(#[source] bincode::Error),

    #[error("{player} is listed with more than one scope")]
    DuplicatePlayer { player: PlayerId },

    #[error("scope {scope} is listed for more than one player")]
    DuplicateScope { scope: EntityId },

    #[error("entry for `{property}` from `{origin}` has an invalid scope")]
    InvalidScope { property: PropertyPath, origin: SourceId },

    #[error("entry for `{property}` from `{origin}` on {scope} appears twice")]
    DuplicateEntry {
        property: PropertyPath,
        origin: SourceId,
        scope: EntityId,
    },
}

impl EngineError for PersistError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            #[cfg(feature = "serde")]
            Self::Encode(_) => "PERSIST_ENCODE",
            #[cfg(feature = "serde")]
            Self::Decode(_) => "PERSIST_DECODE",
            Self::DuplicatePlayer { .. } => "PERSIST_DUPLICATE_PLAYER",
            Self::DuplicateScope { .. } => "PERSIST_DUPLICATE_SCOPE",
            Self::InvalidScope { .. } => "PERSIST_INVALID_SCOPE",
            Self::DuplicateEntry { .. } => "PERSIST_DUPLICATE_ENTRY",
        }
    }
}

impl StoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.known_player_scopes.is_empty()
    }

    /// Distinct scopes holding entries, ascending.
    pub fn scopes(&self) -> Vec<EntityId> {
        let scopes: BTreeSet<_> = self.entries.iter().map(|entry| entry.scope).collect();
        scopes.into_iter().collect()
    }

    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        bincode::serialize(self).map_err(PersistError::Encode)
    }

    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        bincode::deserialize(bytes).map_err(PersistError::Decode)
    }

    /// SHA-256 over the canonical encoding. Participants of a lockstep game
    /// compare these to detect divergence.
    #[cfg(feature = "serde")]
    pub fn state_hash(&self) -> Result<[u8; 32], PersistError> {
        use sha2::{Digest, Sha256};

        let bytes = self.to_bytes()?;
        Ok(Sha256::digest(&bytes).into())
    }
}

impl ModifiersManager {
    /// Canonical snapshot of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let store = &self.store;
        let mut entries = Vec::with_capacity(store.len());
        for scope in store.scopes() {
            for &property in store.properties_of(scope) {
                for modifier in store.modifiers(property, scope, false) {
                    entries.push(SnapshotEntry {
                        property: store.property_path(property).clone(),
                        source: modifier.source.clone(),
                        scope,
                        directives: modifier.directives.to_vec(),
                        stackable: modifier.stackable,
                        count: modifier.count,
                    });
                }
            }
        }
        StoreSnapshot {
            entries,
            known_player_scopes: self.players.known_player_scopes(),
        }
    }

    /// Rebuilds a manager from `snapshot`, with empty caches and no pending
    /// notices.
    pub fn restore(config: EngineConfig, snapshot: StoreSnapshot) -> Result<Self, PersistError> {
        let mut manager = Self::new(config);

        let mut seen_scopes = BTreeSet::new();
        for &(player, scope) in &snapshot.known_player_scopes {
            if manager.players.scope_of(player).is_some() {
                return Err(PersistError::DuplicatePlayer { player });
            }
            if !seen_scopes.insert(scope) {
                return Err(PersistError::DuplicateScope { scope });
            }
            manager.players.register(player, scope);
        }

        let restored = snapshot.entries.len();
        for entry in snapshot.entries {
            if !entry.scope.is_valid() {
                return Err(PersistError::InvalidScope {
                    property: entry.property,
                    origin: entry.source,
                });
            }
            let id = manager.store.intern_property(&entry.property);
            let directives: Arc<[Directive]> = Arc::from(entry.directives);
            if !manager
                .store
                .restore(id, &entry.source, directives, entry.scope, entry.stackable, entry.count)
            {
                return Err(PersistError::DuplicateEntry {
                    property: entry.property,
                    origin: entry.source,
                    scope: entry.scope,
                });
            }
        }

        debug!(
            target: "modifiers::store",
            entries = restored,
            players = snapshot.known_player_scopes.len(),
            "Store restored"
        );
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> ModifiersManager {
        let mut manager = ModifiersManager::new(EngineConfig::default());
        manager.on_player_entity_changed(PlayerId(1), EntityId::INVALID, EntityId(2));
        manager.add_modifier("Health/Max", "b", vec![Directive::add("Unit", 1.0)], EntityId(9), false);
        manager.add_modifier("Cost/Food", "a", vec![Directive::add("Unit", 1.0)], EntityId(9), false);
        manager.add_modifier("Health/Max", "tech", vec![Directive::add("Unit", 5.0)], EntityId(2), false);
        manager.add_modifier("Health/Max", "heal", vec![Directive::add("Unit", 2.0)], EntityId(9), true);
        manager.add_modifier("Health/Max", "heal", vec![Directive::add("Unit", 2.0)], EntityId(9), true);
        manager
    }

    #[test]
    fn snapshot_order_is_canonical() {
        let snapshot = populated().snapshot();
        let order: Vec<_> = snapshot
            .entries
            .iter()
            .map(|entry| (entry.scope.0, entry.property.as_str(), entry.source.as_str(), entry.count))
            .collect();
        assert_eq!(
            order,
            vec![
                (2, "Health/Max", "tech", 1),
                (9, "Health/Max", "b", 1),
                (9, "Health/Max", "heal", 2),
                (9, "Cost/Food", "a", 1),
            ]
        );
        assert_eq!(snapshot.known_player_scopes, vec![(PlayerId(1), EntityId(2))]);
        assert_eq!(snapshot.scopes(), vec![EntityId(2), EntityId(9)]);
    }

    #[test]
    fn restore_reproduces_snapshot() {
        let snapshot = populated().snapshot();
        let restored = ModifiersManager::restore(EngineConfig::default(), snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.pending_notices().is_empty());
        assert_eq!(restored.player_scope(PlayerId(1)), Some(EntityId(2)));
    }

    #[test]
    fn restore_rejects_malformed_snapshots() {
        let duplicate_player = StoreSnapshot {
            entries: Vec::new(),
            known_player_scopes: vec![(PlayerId(1), EntityId(2)), (PlayerId(1), EntityId(3))],
        };
        let err = ModifiersManager::restore(EngineConfig::default(), duplicate_player).unwrap_err();
        assert!(matches!(err, PersistError::DuplicatePlayer { player: PlayerId(1) }));
        assert_eq!(err.severity(), ErrorSeverity::Validation);

        let mut duplicate_entry = populated().snapshot();
        let first = duplicate_entry.entries[0].clone();
        duplicate_entry.entries.push(first);
        let err = ModifiersManager::restore(EngineConfig::default(), duplicate_entry).unwrap_err();
        assert_eq!(err.error_code(), "PERSIST_DUPLICATE_ENTRY");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn state_hash_tracks_content() {
        let snapshot = populated().snapshot();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(StoreSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let hash = snapshot.state_hash().unwrap();
        assert_eq!(hash, populated().snapshot().state_hash().unwrap());

        let mut changed = populated();
        changed.remove_modifier("Cost/Food", "a", EntityId(9), false);
        let other = changed.snapshot().state_hash().unwrap();
        assert_ne!(hex::encode(hash), hex::encode(other));

        assert!(StoreSnapshot::from_bytes(&[0xff, 0xff]).is_err());
    }
}

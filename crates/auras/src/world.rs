//! World facts an aura needs beyond identity and ownership.
use bitflags::bitflags;
use modifiers_core::{AffectedPlayer, EntityId, IdentityOracle, OwnershipOracle, PlayerId};

bitflags! {
    /// Diplomatic relations one player holds towards another.
    ///
    /// `PLAYER` is never returned by [`DiplomacyOracle::relations`]; it only
    /// appears in aura masks, meaning "the emitter's own player".
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Relations: u8 {
        const PLAYER      = 1 << 0;
        const ALLY        = 1 << 1;
        const MUTUAL_ALLY = 1 << 2;
        const NEUTRAL     = 1 << 3;
        const ENEMY       = 1 << 4;
    }
}

impl From<AffectedPlayer> for Relations {
    fn from(player: AffectedPlayer) -> Self {
        match player {
            AffectedPlayer::Player => Self::PLAYER,
            AffectedPlayer::Ally => Self::ALLY,
            AffectedPlayer::MutualAlly => Self::MUTUAL_ALLY,
            AffectedPlayer::Neutral => Self::NEUTRAL,
            AffectedPlayer::Enemy => Self::ENEMY,
        }
    }
}

impl Relations {
    pub fn from_affected(players: &[AffectedPlayer]) -> Self {
        players.iter().fold(Self::empty(), |mask, &player| mask | player.into())
    }
}

/// Players, their scope entities and diplomacy.
pub trait DiplomacyOracle {
    /// Every player id in ascending order, including defeated ones.
    fn players(&self) -> Vec<PlayerId>;

    /// The player-scope entity of `player`.
    fn player_entity(&self, player: PlayerId) -> Option<EntityId>;

    /// The player `entity` represents, if it is a player-scope entity.
    fn player_of_entity(&self, entity: EntityId) -> Option<PlayerId>;

    fn is_defeated(&self, player: PlayerId) -> bool;

    /// Relations `player` holds towards `other`.
    fn relations(&self, player: PlayerId, other: PlayerId) -> Relations;
}

pub trait TechnologyOracle {
    fn is_researched(&self, player: PlayerId, technology: &str) -> bool;
}

/// Handle of an active range query owned by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeQueryId(pub u32);

/// Active range queries reporting entities entering and leaving a radius.
pub trait RangeQueries {
    /// Starts reporting entities of `players` within `radius` of `emitter`.
    /// Updates arrive through [`crate::Auras::on_range_update`].
    fn create_range_query(&mut self, emitter: EntityId, radius: f64, players: &[PlayerId]) -> RangeQueryId;

    fn destroy_range_query(&mut self, query: RangeQueryId);
}

/// Everything an emitter consults while maintaining its auras.
pub trait AuraWorld: IdentityOracle + OwnershipOracle + DiplomacyOracle + TechnologyOracle + RangeQueries {}

impl<T> AuraWorld for T where T: IdentityOracle + OwnershipOracle + DiplomacyOracle + TechnologyOracle + RangeQueries {}

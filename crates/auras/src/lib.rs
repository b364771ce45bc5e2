//! Aura producer for the modifier engine.
//!
//! An emitter entity carries a set of named auras. Each aura decides which
//! entities (or player scopes) it currently affects and keeps the matching
//! modifiers registered in the [`ModifiersManager`](modifiers_core::ModifiersManager)
//! while its required technology is researched. World facts and range
//! queries come from an [`AuraWorld`] implementation.
mod error;
mod producer;
mod world;

pub use error::AuraError;
pub use producer::{AuraStatus, Auras};
pub use world::{AuraWorld, DiplomacyOracle, RangeQueries, RangeQueryId, Relations, TechnologyOracle};

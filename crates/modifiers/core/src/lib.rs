//! Deterministic modifier resolution and caching for an entity simulation.
//!
//! `modifiers-core` lets many independent sources (technologies, auras,
//! player-wide bonuses) change the effective value of any templated attribute
//! without the consumer knowing which sources are active. All mutation and
//! resolution flows through [`engine::ModifiersManager`]; consumers learn about
//! changes through [`notify::NotificationRouter`].
pub mod cache;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod modification;
pub mod notify;
pub mod persist;
pub mod store;
pub mod templates;
pub mod types;
pub mod view;

pub use cache::{PlayerScopeIndex, ValueCache};
pub use config::EngineConfig;
pub use engine::ModifiersManager;
pub use env::{Env, IdentityOracle, OwnershipOracle, WorldEnv, WorldTable};
pub use error::{EngineError, ErrorSeverity};
pub use modification::{
    ClassMatch, ClassTerm, Directive, ModificationSummary, Operation, OperationKind,
    apply_modifications, summarize,
};
pub use notify::{
    ComponentId, Notice, NotificationRouter, NotifyError, TemplateListener, TemplateModification,
    ValueListener, ValueModification,
};
pub use persist::{PersistError, SnapshotEntry, StoreSnapshot};
pub use store::{AddOutcome, Modifier, ModifierStore, PropertyId};
pub use templates::{
    AffectedPlayer, AuraKind, AuraTemplate, DerivedModifications, ModificationSpec,
    ModificationTemplate,
};
pub use types::{ClassList, EntityId, PlayerId, PropertyPath, SourceId};
pub use view::ModifierView;

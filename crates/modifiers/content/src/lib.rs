//! Data-driven content for the modifier engine.
//!
//! Technologies and auras are authored as RON files, the engine configuration
//! as TOML. This crate turns those files into the `modifiers-core` template
//! types and keeps them in a [`TemplateRegistry`] keyed by template name.
pub mod registry;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use registry::TemplateRegistry;

#[cfg(feature = "loaders")]
pub use loaders::{
    AuraLoader, ConfigLoader, ContentFactory, LoadResult, TechnologyLoader, load_template_registry,
};

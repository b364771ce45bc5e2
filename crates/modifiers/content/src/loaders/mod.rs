//! File-based content loaders.
//!
//! Engine configuration is TOML; technology and aura templates are RON, one
//! template per file, named by the file stem.

mod auras;
mod config;
mod factory;
mod registry;
mod technologies;

pub use auras::AuraLoader;
pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use registry::load_template_registry;
pub use technologies::TechnologyLoader;

use std::path::Path;

/// Result type for content loading operations.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper to read file contents with a better error message.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

//! Content factory for loading everything the engine needs from one directory.

use std::path::{Path, PathBuf};

use modifiers_core::EngineConfig;

use crate::loaders::{ConfigLoader, LoadResult, load_template_registry};
use crate::registry::TemplateRegistry;

/// Content factory that loads engine content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── templates/
///     ├── technologies/
///     └── auras/
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load engine configuration from `config.toml`, or the defaults when
    /// the file does not exist.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load technology and aura templates from `templates/`.
    pub fn load_templates(&self) -> LoadResult<TemplateRegistry> {
        load_template_registry(&self.data_dir.join("templates"))
    }
}

//! Engine configuration loader.

use std::path::Path;

use modifiers_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load engine configuration from a TOML file.
    ///
    /// Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        if config.max_dispatch_rounds == 0 {
            anyhow::bail!("max_dispatch_rounds must be at least 1");
        }
        Ok(config)
    }
}

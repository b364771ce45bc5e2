//! Technology template loader.

use std::path::Path;

use modifiers_core::ModificationTemplate;

use crate::loaders::{LoadResult, read_file};

/// Loader for a single technology template from a RON file.
///
/// ```ron
/// (
///     affects: ["Infantry", "Cavalry Melee"],
///     modifications: [
///         (value: "Health/Max", operation: add(10.0)),
///         (value: "Attack/Ranged/Pierce", operation: multiply(1.2), affects: Some("Ranged")),
///     ],
/// )
/// ```
pub struct TechnologyLoader;

impl TechnologyLoader {
    pub fn load(path: &Path) -> LoadResult<ModificationTemplate> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| e.context(format!("in {}", path.display())))
    }

    pub fn parse(content: &str) -> LoadResult<ModificationTemplate> {
        ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse technology RON: {}", e))
    }
}

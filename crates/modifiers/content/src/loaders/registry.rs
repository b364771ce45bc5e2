//! Template directory loader.

use std::path::{Path, PathBuf};

use crate::loaders::{AuraLoader, LoadResult, TechnologyLoader};
use crate::registry::TemplateRegistry;

/// Loads every template under a content directory.
///
/// Expected directory structure:
/// ```text
/// templates/
///   ├── technologies/
///   │     ├── armor_infantry_01.ron
///   │     └── phase_town.ron
///   └── auras/
///         └── heal.ron
/// ```
///
/// Either subdirectory may be absent. Files are read in sorted order and
/// named by their stem.
pub fn load_template_registry(dir: &Path) -> LoadResult<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();

    for (name, path) in ron_files(&dir.join("technologies"))? {
        let template = TechnologyLoader::load(&path)?;
        registry.add_technology(name, template);
    }
    for (name, path) in ron_files(&dir.join("auras"))? {
        let template = AuraLoader::load(&path)?;
        registry.add_aura(name, template);
    }

    tracing::debug!(
        target: "modifiers::content",
        dir = %dir.display(),
        templates = registry.len(),
        "loaded template registry"
    );
    Ok(registry)
}

fn ron_files(dir: &Path) -> LoadResult<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            anyhow::bail!("Template file name is not valid UTF-8: {}", path.display());
        };
        files.push((name.to_owned(), path));
    }
    files.sort();
    Ok(files)
}

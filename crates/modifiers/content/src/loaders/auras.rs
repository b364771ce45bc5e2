//! Aura template loader.

use std::path::Path;

use modifiers_core::{AuraKind, AuraTemplate};

use crate::loaders::{LoadResult, read_file};

/// Loader for a single aura template from a RON file.
///
/// ```ron
/// (
///     type: range,
///     radius: Some(30.0),
///     affects: ["Unit"],
///     affectedPlayers: [Ally],
///     modifications: [(value: "Health/RegenRate", operation: add(1.0))],
/// )
/// ```
pub struct AuraLoader;

impl AuraLoader {
    pub fn load(path: &Path) -> LoadResult<AuraTemplate> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| e.context(format!("in {}", path.display())))
    }

    pub fn parse(content: &str) -> LoadResult<AuraTemplate> {
        let template: AuraTemplate =
            ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse aura RON: {}", e))?;
        validate(&template)?;
        Ok(template)
    }
}

fn validate(template: &AuraTemplate) -> LoadResult<()> {
    match (template.kind, template.radius) {
        (AuraKind::Range, None) => anyhow::bail!("range aura needs a radius"),
        (AuraKind::Range, Some(radius)) if !(radius.is_finite() && radius >= 0.0) => {
            anyhow::bail!("range aura radius must be a finite non-negative number, got {radius}")
        }
        _ => Ok(()),
    }
}

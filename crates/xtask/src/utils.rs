//! Utility functions for xtask commands

use std::path::Path;

use anyhow::{Context, Result};
use modifiers_core::{Directive, EngineConfig, ModifiersManager, StoreSnapshot};

/// Reads a snapshot file and checks that it restores cleanly.
pub fn load_snapshot(path: &Path) -> Result<(StoreSnapshot, usize)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read store file: {}", path.display()))?;
    let snapshot = StoreSnapshot::from_bytes(&bytes)
        .with_context(|| format!("Failed to decode store file: {}", path.display()))?;
    ModifiersManager::restore(EngineConfig::default(), snapshot.clone())
        .with_context(|| format!("Store file does not restore: {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = snapshot.entries.len(), "loaded store");
    Ok((snapshot, bytes.len()))
}

pub fn state_hash(snapshot: &StoreSnapshot) -> Result<String> {
    let hash = snapshot.state_hash().context("Failed to hash store")?;
    Ok(hex::encode(hash))
}

pub fn format_directive(directive: &Directive) -> String {
    format!(
        "{} {}({})",
        directive.affects,
        directive.operation.kind(),
        directive.operation.amount()
    )
}

pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

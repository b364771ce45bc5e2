//! Read and inspect persisted modifier stores
//!
//! Decodes a bincode store snapshot and displays its contents.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use modifiers_core::{EntityId, StoreSnapshot};

use crate::utils::{format_bytes, format_directive, load_snapshot, state_hash};

/// Read and inspect a persisted modifier store
#[derive(Parser)]
pub struct ReadStore {
    /// Store file written by `StoreSnapshot::to_bytes`
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Only show entries of this scope entity
    #[arg(short, long, value_name = "ENTITY")]
    scope: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Summary view (entry counts per scope, player scopes, hash)
    Summary,
    /// Full JSON output
    Json,
    /// Pretty-printed debug format
    Debug,
}

impl ReadStore {
    pub fn execute(self) -> Result<()> {
        let (mut snapshot, size) = load_snapshot(&self.file)?;
        let hash = state_hash(&snapshot)?;
        if let Some(scope) = self.scope {
            snapshot.entries.retain(|entry| entry.scope == EntityId(scope));
        }

        println!("{} {}", style("Store File:").bold().cyan(), self.file.display());
        println!("{} {}", style("File Size:").bold().cyan(), format_bytes(size));
        println!("{} {}", style("State Hash:").bold().cyan(), hash);
        println!();

        match self.format {
            OutputFormat::Summary => print_summary(&snapshot),
            OutputFormat::Json => print_json(&snapshot)?,
            OutputFormat::Debug => print_debug(&snapshot),
        }

        Ok(())
    }
}

fn print_summary(snapshot: &StoreSnapshot) {
    println!("{}", style("=== Modifier Store Summary ===").bold().green());
    println!();

    println!("{}", style("Player Scopes:").bold().yellow());
    if snapshot.known_player_scopes.is_empty() {
        println!("  (none)");
    }
    for (player, scope) in &snapshot.known_player_scopes {
        println!("  {} -> entity {}", player, scope);
    }
    println!();

    let mut by_scope: BTreeMap<EntityId, Vec<_>> = BTreeMap::new();
    for entry in &snapshot.entries {
        by_scope.entry(entry.scope).or_default().push(entry);
    }

    println!(
        "{} {} entries across {} scopes",
        style("Entries:").bold().yellow(),
        snapshot.entries.len(),
        by_scope.len()
    );
    for (scope, entries) in &by_scope {
        println!("  {}", style(format!("Scope {}", scope)).bold());
        for entry in entries {
            let stack = if entry.stackable {
                format!(" x{}", entry.count)
            } else {
                String::new()
            };
            println!("    {} <- {}{}", entry.property, entry.source, stack);
            for directive in &entry.directives {
                println!("      {}", format_directive(directive));
            }
        }
    }
    println!();
}

fn print_json(snapshot: &StoreSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize store to JSON")?;
    println!("{}", json);
    Ok(())
}

fn print_debug(snapshot: &StoreSnapshot) {
    println!("{:#?}", snapshot);
}

//! Compare two persisted stores
//!
//! Participants of a lockstep game hash their stores every turn; when the
//! hashes disagree this points at the first entry that differs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use console::style;
use modifiers_core::SnapshotEntry;

use crate::utils::{format_directive, load_snapshot, state_hash};

/// Compare two participants' stores to locate an out-of-sync
#[derive(Parser)]
pub struct CompareStores {
    #[arg(value_name = "A")]
    a: PathBuf,

    #[arg(value_name = "B")]
    b: PathBuf,
}

impl CompareStores {
    pub fn execute(self) -> Result<()> {
        let (a, _) = load_snapshot(&self.a)?;
        let (b, _) = load_snapshot(&self.b)?;
        let (hash_a, hash_b) = (state_hash(&a)?, state_hash(&b)?);

        println!("{} {}  {}", style("A:").bold().cyan(), hash_a, self.a.display());
        println!("{} {}  {}", style("B:").bold().cyan(), hash_b, self.b.display());
        println!();

        if hash_a == hash_b {
            println!("{}", style("Stores are identical").bold().green());
            return Ok(());
        }

        if a.known_player_scopes != b.known_player_scopes {
            println!("{}", style("Player scopes differ:").bold().red());
            println!("  A: {:?}", a.known_player_scopes);
            println!("  B: {:?}", b.known_player_scopes);
            println!();
        }

        let position = a
            .entries
            .iter()
            .zip(&b.entries)
            .position(|(left, right)| left != right)
            .unwrap_or(a.entries.len().min(b.entries.len()));
        if position < a.entries.len() || position < b.entries.len() {
            println!("{} {}", style("First differing entry:").bold().red(), position);
            print_entry("A", a.entries.get(position));
            print_entry("B", b.entries.get(position));
        }

        anyhow::bail!(
            "stores differ ({} vs {} entries)",
            a.entries.len(),
            b.entries.len()
        )
    }
}

fn print_entry(label: &str, entry: Option<&SnapshotEntry>) {
    let Some(entry) = entry else {
        println!("  {}: (missing)", label);
        return;
    };
    println!(
        "  {}: scope {} {} <- {} (stackable: {}, count: {})",
        label, entry.scope, entry.property, entry.source, entry.stackable, entry.count
    );
    for directive in &entry.directives {
        println!("       {}", format_directive(directive));
    }
}

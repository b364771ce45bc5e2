//! Load and report a content directory
//!
//! Catches template typos before a game does: every technology and aura file
//! is parsed, derived, and listed with the properties it touches.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use modifiers_content::ContentFactory;
use modifiers_core::PropertyPath;

/// Load a content directory and report its templates
#[derive(Parser)]
pub struct CheckContent {
    /// Directory holding `config.toml` and `templates/`
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Print the loaded registry as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

impl CheckContent {
    pub fn execute(self) -> Result<()> {
        let factory = ContentFactory::new(&self.dir);
        let config = factory.load_config()?;
        let registry = factory.load_templates()?;

        if self.json {
            let json = serde_json::to_string_pretty(&registry).context("Failed to serialize templates to JSON")?;
            println!("{}", json);
            return Ok(());
        }

        println!("{} {}", style("Content Dir:").bold().cyan(), self.dir.display());
        println!("{} {:?}", style("Config:").bold().cyan(), config);
        println!();

        println!("{}", style("Technologies:").bold().yellow());
        for name in registry.technology_names() {
            let paths = registry
                .technology_modifications(name)
                .map(|derived| derived.paths().map(PropertyPath::to_string).collect::<Vec<_>>())
                .unwrap_or_default();
            println!("  {} -> {}", name, paths.join(", "));
        }
        println!();

        println!("{}", style("Auras:").bold().yellow());
        for name in registry.aura_names() {
            let Some(aura) = registry.aura(name) else {
                continue;
            };
            let radius = aura.radius.map(|r| format!(" radius {}", r)).unwrap_or_default();
            println!("  {} ({}{})", name, aura.kind, radius);
        }
        println!();

        println!(
            "{} {} templates",
            style("Loaded").bold().green(),
            registry.len()
        );
        Ok(())
    }
}

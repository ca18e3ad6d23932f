//! Command handlers for the dvhcheck CLI.

use anyhow::{Context, Result};

use dvhcheck::aliases::AliasRegistry;
use dvhcheck::config::Config;
use dvhcheck::protocol::ProtocolLibrary;
use dvhcheck::providers::{PlanFileSet, PlanProvider};
use dvhcheck::snapshot::SnapshotInbox;

pub mod aliases;
pub mod check;
pub mod plans;
pub mod protocols;
pub mod roi_match;

/// Shared handles most commands need: config plus the loaded protocol
/// library and alias registry.
pub struct Workspace {
    pub config: Config,
    pub library: ProtocolLibrary,
    pub registry: AliasRegistry,
}

pub fn load_workspace() -> Result<Workspace> {
    let config = Config::load()?;
    let library = ProtocolLibrary::load(&config.protocol_dir)
        .context("Failed to load protocol library")?;
    let registry =
        AliasRegistry::load(&config.aliases_file).context("Failed to load alias registry")?;
    Ok(Workspace {
        config,
        library,
        registry,
    })
}

/// Look up one plan's file triple by identifier, with a helpful error
/// listing what the inbox actually holds.
pub fn find_plan(config: &Config, plan_id: &str) -> Result<PlanFileSet> {
    let plans = SnapshotInbox::new(&config.inbox_dir)
        .list_plans()
        .context("Failed to scan plan inbox")?;
    match plans.get(plan_id) {
        Some(files) => Ok(files.clone()),
        None => {
            let available: Vec<String> = plans.keys().cloned().collect();
            anyhow::bail!(
                "Plan '{}' not found in {}. Available: {}",
                plan_id,
                config.inbox_dir.display(),
                if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                }
            )
        }
    }
}

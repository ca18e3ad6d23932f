//! Plan inbox listing.

use anyhow::{Context, Result};

use dvhcheck::providers::PlanProvider;
use dvhcheck::snapshot::SnapshotInbox;

use super::load_workspace;

pub fn cmd_plans() -> Result<()> {
    let workspace = load_workspace()?;
    let plans = SnapshotInbox::new(&workspace.config.inbox_dir)
        .list_plans()
        .context("Failed to scan plan inbox")?;

    if plans.is_empty() {
        println!(
            "No plan snapshots found in {}",
            workspace.config.inbox_dir.display()
        );
        return Ok(());
    }
    for plan_id in plans.keys() {
        println!("{}", plan_id);
    }
    Ok(())
}

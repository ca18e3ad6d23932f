//! Protocol listing commands.

use anyhow::Result;
use colored::Colorize;

use super::load_workspace;

/// List every loaded protocol with its fractionation schemes.
pub fn cmd_protocols() -> Result<()> {
    let workspace = load_workspace()?;
    let names = workspace.library.protocol_names();
    if names.is_empty() {
        println!(
            "No protocols found in {}",
            workspace.config.protocol_dir.display()
        );
        return Ok(());
    }

    for name in names {
        let fractionations = workspace.library.fractionations(&name);
        let schemes: Vec<String> = fractionations.iter().map(|fx| format!("{}fx", fx)).collect();
        println!("{}  {}", name.bold(), schemes.join(", ").dimmed());
    }
    Ok(())
}

/// Show the template ROIs and constraint text for one
/// protocol+fractionation.
pub fn cmd_rois(protocol: &str, fx: &str) -> Result<()> {
    let workspace = load_workspace()?;
    let rois = workspace.library.rois(protocol, fx);
    if rois.is_empty() {
        anyhow::bail!("No constraints loaded for {} at {}fx", protocol, fx);
    }

    println!("{}", format!("{} ({}fx)", protocol, fx).bold());
    for roi in rois {
        println!("{}", roi);
        for constraint in workspace.library.constraints(protocol, fx, &roi) {
            println!("  {}", constraint);
        }
    }
    Ok(())
}

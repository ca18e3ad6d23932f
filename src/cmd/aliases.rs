//! Alias registry management commands.

use anyhow::Result;
use colored::Colorize;

use dvhcheck::ui;

use super::load_workspace;

pub fn cmd_list() -> Result<()> {
    let workspace = load_workspace()?;
    let templates = workspace.registry.template_rois();
    if templates.is_empty() {
        println!("Alias registry is empty");
        return Ok(());
    }

    for template in templates {
        let aliases = workspace.registry.aliases(&template);
        if aliases.is_empty() {
            println!("{}", template.bold());
        } else {
            println!("{}  {}", template.bold(), aliases.join(", ").dimmed());
        }
    }
    Ok(())
}

pub fn cmd_add(template: &str, aliases: Vec<String>) -> Result<()> {
    let mut workspace = load_workspace()?;
    if workspace
        .registry
        .template_rois()
        .iter()
        .any(|t| t == template)
    {
        anyhow::bail!("Template ROI '{}' already exists", template);
    }

    workspace.registry.add_template(template, aliases);
    workspace.registry.save()?;
    ui::success(&format!("Added template ROI '{}'", template));
    Ok(())
}

pub fn cmd_remove(template: &str) -> Result<()> {
    let mut workspace = load_workspace()?;
    if !workspace
        .registry
        .template_rois()
        .iter()
        .any(|t| t == template)
    {
        anyhow::bail!("Template ROI '{}' not found", template);
    }

    workspace.registry.remove_template(template);
    workspace.registry.save()?;
    ui::success(&format!("Removed template ROI '{}'", template));
    Ok(())
}

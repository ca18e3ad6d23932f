//! ROI matching preview.
//!
//! Resolves a plan's structure names against a protocol's template ROIs
//! without computing any DVHs, so a physicist can inspect (and fix) the
//! mapping before running a full check.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Select;

use dvhcheck::providers::StructureProvider;
use dvhcheck::resolver::RoiResolver;
use dvhcheck::snapshot::SnapshotStructures;

use super::{find_plan, load_workspace};

pub fn cmd_match(plan_id: &str, protocol: &str, fx: &str, interactive: bool) -> Result<()> {
    let workspace = load_workspace()?;
    let template_rois = workspace.library.rois(protocol, fx);
    if template_rois.is_empty() {
        anyhow::bail!("No constraints loaded for {} at {}fx", protocol, fx);
    }

    let files = find_plan(&workspace.config, plan_id)?;
    let plan_rois = SnapshotStructures
        .parse_structures(&files.structure_file)
        .context("Failed to list plan structures")?
        .into_iter()
        .map(|s| s.name)
        .collect::<Vec<_>>();

    let tuning = workspace.config.matching.tuning();
    let resolver = RoiResolver::new(&workspace.registry).with_tuning(
        tuning.weight_simple,
        tuning.weight_partial,
        tuning.score_threshold,
    );
    let mut mapping = resolver.match_all(&template_rois, &plan_rois);

    print_mapping(&mapping, &resolver);

    if interactive {
        remap_interactively(&mut mapping, &plan_rois)?;
        print_mapping(&mapping, &resolver);
        print_override_flags(plan_id, protocol, fx, &mapping);
    }
    Ok(())
}

fn print_mapping(mapping: &BTreeMap<String, Option<String>>, resolver: &RoiResolver) {
    for (template, assigned) in mapping {
        match assigned {
            Some(plan_roi) => {
                let score = resolver.resolve(plan_roi).score;
                println!(
                    "{:<24} {} {:<24} {}",
                    template,
                    "→".dimmed(),
                    plan_roi,
                    format!("({:.2})", score).dimmed()
                );
            }
            None => {
                println!("{:<24} {} {}", template, "→".dimmed(), "(unmatched)".yellow());
            }
        }
    }
}

fn remap_interactively(
    mapping: &mut BTreeMap<String, Option<String>>,
    plan_rois: &[String],
) -> Result<()> {
    loop {
        let templates: Vec<String> = mapping.keys().cloned().collect();
        let mut items: Vec<String> = templates
            .iter()
            .map(|t| {
                format!(
                    "{} → {}",
                    t,
                    mapping[t].as_deref().unwrap_or("(unmatched)")
                )
            })
            .collect();
        items.push("Done".to_string());

        let choice = Select::new()
            .with_prompt("Template ROI to remap")
            .items(&items)
            .default(items.len() - 1)
            .interact()?;
        if choice == items.len() - 1 {
            return Ok(());
        }

        let mut roi_items = vec!["(unmatched)".to_string()];
        roi_items.extend(plan_rois.iter().cloned());
        let pick = Select::new()
            .with_prompt(format!("Plan ROI for {}", templates[choice]))
            .items(&roi_items)
            .default(0)
            .interact()?;

        let assigned = if pick == 0 {
            None
        } else {
            Some(roi_items[pick].clone())
        };
        mapping.insert(templates[choice].clone(), assigned);
    }
}

fn print_override_flags(
    plan_id: &str,
    protocol: &str,
    fx: &str,
    mapping: &BTreeMap<String, Option<String>>,
) {
    let flags: Vec<String> = mapping
        .iter()
        .filter_map(|(template, assigned)| {
            assigned
                .as_ref()
                .map(|roi| format!("--override '{}={}'", template, roi))
        })
        .collect();
    if flags.is_empty() {
        return;
    }
    println!();
    println!("To evaluate with this mapping:");
    println!(
        "  dvhcheck check '{}' --protocol {} --fx {} {}",
        plan_id,
        protocol,
        fx,
        flags.join(" ")
    );
}

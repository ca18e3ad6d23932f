//! Full scorecard evaluation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use dvhcheck::constraint::MAX_DOSE_VOLUME;
use dvhcheck::engine::{EvaluationSession, Verdict};
use dvhcheck::report::{format_scorecard, ScoreReport};
use dvhcheck::snapshot::{SnapshotDvhs, SnapshotStructures};
use dvhcheck::ui;

use super::{find_plan, load_workspace};

pub fn cmd_check(
    plan_id: &str,
    protocol: &str,
    fx: &str,
    overrides: &[String],
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let workspace = load_workspace()?;
    let files = find_plan(&workspace.config, plan_id)?;

    let structures = SnapshotStructures;
    let dvhs = SnapshotDvhs;
    let mut session = EvaluationSession::new(
        &workspace.library,
        &workspace.registry,
        &structures,
        &dvhs,
        workspace.config.matching.tuning(),
        protocol,
        fx,
    )?;

    let spinner = evaluation_spinner();
    let mut warnings = session.select_plan(plan_id, files)?;
    for mapping in overrides {
        let (template, plan_roi) = parse_override(mapping)?;
        warnings.extend(session.set_override(template, Some(plan_roi.to_string())));
    }
    spinner.finish_and_clear();

    for warning in &warnings {
        ui::warn(warning);
    }

    if json {
        let report = ScoreReport::from_session(&session);
        let rendered = serde_json::to_string_pretty(&report)?;
        return emit(&rendered, output);
    }

    // File output stays plain.
    if output.is_some() {
        colored::control::set_override(false);
    }
    let lines = vec![
        format!(
            "{}  {}",
            format!("{} ({}fx)", protocol, fx).bold(),
            plan_id.dimmed()
        ),
        format!("Point dose defined as {}cc", MAX_DOSE_VOLUME),
        String::new(),
        format_scorecard(session.rows()),
        String::new(),
        summary_line(&session),
    ];
    let result = emit(&lines.join("\n"), output);
    if output.is_some() {
        colored::control::unset_override();
    }
    result
}

fn parse_override(mapping: &str) -> Result<(&str, &str)> {
    mapping
        .split_once('=')
        .map(|(template, roi)| (template.trim(), roi.trim()))
        .filter(|(template, roi)| !template.is_empty() && !roi.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Override must be TEMPLATE=PLAN_ROI, got '{}'", mapping))
}

fn summary_line(session: &EvaluationSession) -> String {
    let rows = session.rows();
    let passed = rows
        .iter()
        .filter(|r| r.verdict == Some(Verdict::Pass))
        .count();
    let failed = rows
        .iter()
        .filter(|r| r.verdict == Some(Verdict::Fail))
        .count();
    let unresolved = rows.len() - passed - failed;

    let mut parts = vec![
        format!("{} passed", passed).green().to_string(),
        format!("{} failed", failed).red().to_string(),
    ];
    if unresolved > 0 {
        parts.push(format!("{} unresolved", unresolved).yellow().to_string());
    }
    parts.join(", ")
}

fn evaluation_spinner() -> ProgressBar {
    if ui::is_quiet() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message("Computing DVHs...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ui::success(&format!("Wrote {}", path.display()));
            Ok(())
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

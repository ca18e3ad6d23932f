//! Scorecard rendering and export.
//!
//! Provides the text table printed by the check command and the
//! serializable report behind `--json`.

use colored::Colorize;
use serde::Serialize;

use crate::constraint::Scale;
use crate::engine::{EvaluationSession, ScoreRow, Verdict};
use crate::utc_now_iso;

const HEADERS: [&str; 9] = [
    "Template ROI",
    "Plan ROI",
    "Volume (cc)",
    "Min (Gy)",
    "Mean (Gy)",
    "Max (Gy)",
    "Constraint",
    "Value",
    "Result",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn table_cells(row: &ScoreRow) -> [String; 9] {
    [
        row.template_roi.clone(),
        row.plan_roi.clone().unwrap_or_default(),
        cell(row.volume),
        cell(row.min_dose),
        cell(row.mean_dose),
        cell(row.max_dose),
        row.constraint_text(),
        cell(row.value),
        row.verdict.map(|v| v.to_string()).unwrap_or_default(),
    ]
}

/// Format the active row set as an aligned text table. Verdict cells are
/// colorized after padding so widths stay stable.
pub fn format_scorecard(rows: &[ScoreRow]) -> String {
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    let cells: Vec<[String; 9]> = rows.iter().map(table_cells).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.len());
        }
    }

    let mut lines = Vec::new();
    lines.push(format_line(&HEADERS.map(String::from), &widths, |s| {
        s.bold().to_string()
    }));
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for (row, cells) in rows.iter().zip(&cells) {
        let verdict = row.verdict;
        lines.push(format_line(cells, &widths, |s| match verdict {
            Some(Verdict::Pass) if s.trim() == "Pass" => s.green().to_string(),
            Some(Verdict::Fail) if s.trim() == "Fail" => s.red().bold().to_string(),
            _ => s.to_string(),
        }));
    }
    lines.join("\n")
}

fn format_line(cells: &[String; 9], widths: &[usize], paint: impl Fn(&str) -> String) -> String {
    cells
        .iter()
        .enumerate()
        .map(|(i, value)| paint(&format!("{:<width$}", value, width = widths[i])))
        .collect::<Vec<_>>()
        .join(" │ ")
}

/// Serializable scorecard for `--json` export.
#[derive(Debug, Serialize)]
pub struct ScoreReport {
    pub generated_at: String,
    pub protocol: String,
    pub fractionation: String,
    pub plan: Option<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub template_roi: String,
    pub plan_roi: Option<String>,
    pub structure_key: Option<String>,
    pub volume: Option<f64>,
    pub min_dose: Option<f64>,
    pub mean_dose: Option<f64>,
    pub max_dose: Option<f64>,
    pub constraint: String,
    pub label: String,
    pub operator: String,
    pub threshold: String,
    pub threshold_value: f64,
    pub relative_threshold: bool,
    pub calc: String,
    pub value: Option<f64>,
    pub pass_fail: Option<String>,
    pub overridden: bool,
}

impl ScoreReport {
    pub fn from_session(session: &EvaluationSession) -> Self {
        Self {
            generated_at: utc_now_iso(),
            protocol: session.protocol().to_string(),
            fractionation: session.fractionation().to_string(),
            plan: session.plan_id().map(String::from),
            rows: session.rows().iter().map(ReportRow::from_row).collect(),
        }
    }
}

impl ReportRow {
    fn from_row(row: &ScoreRow) -> Self {
        Self {
            template_roi: row.template_roi.clone(),
            plan_roi: row.plan_roi.clone(),
            structure_key: row.structure_key.clone(),
            volume: row.volume,
            min_dose: row.min_dose,
            mean_dose: row.mean_dose,
            max_dose: row.max_dose,
            constraint: row.constraint_text(),
            label: row.constraint.label.clone(),
            operator: row.constraint.operator.to_string(),
            threshold: row.constraint.threshold.clone(),
            threshold_value: row.constraint.threshold_value,
            relative_threshold: row.constraint.threshold_scale == Scale::Relative,
            calc: row.constraint.metric.family().to_string(),
            value: row.value,
            pass_fail: row.verdict.map(|v| v.to_string()),
            overridden: row.overridden,
        }
    }
}

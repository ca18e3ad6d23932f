//! Protocol constraint repository.
//!
//! Loads every `.scp` file from a protocol directory into an immutable
//! in-memory table keyed by protocol name and fractionation. The file
//! format is a two-level indentation grammar: an unindented line opens a
//! ROI block, each following indented line is a `<label> <threshold>`
//! pair. File names encode the protocol and fraction count, e.g.
//! `TG101_3fx.scp`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::constraint::{Constraint, RoiType};
use crate::error::ParseError;

/// Constraints for one protocol+fractionation, keyed by template ROI.
/// A repeated ROI header within one file overwrites the earlier block.
type RoiConstraints = BTreeMap<String, Vec<Constraint>>;

/// One (template ROI, constraint) pair as seeded into a scorecard row.
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub template_roi: String,
    pub constraint: Constraint,
}

/// In-memory table of every loaded protocol. Built once at startup and
/// replaced wholesale on an explicit reload.
#[derive(Debug, Default)]
pub struct ProtocolLibrary {
    data: BTreeMap<String, BTreeMap<String, RoiConstraints>>,
}

impl ProtocolLibrary {
    /// Load every `.scp` file under `dir`. Any file that violates the
    /// grammar aborts the whole load; no partial protocol is registered.
    pub fn load(dir: &Path) -> Result<Self> {
        let file_name_re = Regex::new(r"^(?P<name>.+)_(?P<fx>\d+)fx$").unwrap();

        let mut data: BTreeMap<String, BTreeMap<String, RoiConstraints>> = BTreeMap::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read protocol directory {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("scp") {
                continue;
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid protocol filename"))?;
            let caps = file_name_re.captures(stem).ok_or_else(|| ParseError::BadFileName {
                name: stem.to_string(),
            })?;

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read protocol file {}", path.display()))?;
            let constraints = parse_protocol_file(&content)
                .with_context(|| format!("Failed to parse protocol file {}", path.display()))?;

            data.entry(caps["name"].to_string())
                .or_default()
                .insert(caps["fx"].to_string(), constraints);
        }

        Ok(Self { data })
    }

    /// Sorted names of every loaded protocol.
    pub fn protocol_names(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Sorted fraction counts (as strings) available for a protocol.
    pub fn fractionations(&self, protocol: &str) -> Vec<String> {
        self.data
            .get(protocol)
            .map(|fx| fx.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sorted template ROI names required by a protocol+fractionation.
    pub fn rois(&self, protocol: &str, fractionation: &str) -> Vec<String> {
        self.roi_table(protocol, fractionation)
            .map(|rois| rois.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Constraints for one template ROI, in file order.
    pub fn constraints(&self, protocol: &str, fractionation: &str, roi: &str) -> &[Constraint] {
        self.roi_table(protocol, fractionation)
            .and_then(|rois| rois.get(roi))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flattened (template ROI, constraint) pairs, ROI-major, then
    /// constraint order. This is the direct source for building a
    /// scorecard row set.
    pub fn column_data(&self, protocol: &str, fractionation: &str) -> Vec<ConstraintRow> {
        let Some(rois) = self.roi_table(protocol, fractionation) else {
            return Vec::new();
        };
        rois.iter()
            .flat_map(|(roi, constraints)| {
                constraints.iter().map(move |c| ConstraintRow {
                    template_roi: roi.clone(),
                    constraint: c.clone(),
                })
            })
            .collect()
    }

    pub fn has_protocol(&self, protocol: &str) -> bool {
        self.data.contains_key(protocol)
    }

    fn roi_table(&self, protocol: &str, fractionation: &str) -> Option<&RoiConstraints> {
        self.data.get(protocol)?.get(fractionation)
    }
}

/// Parse one protocol file body.
///
/// An unindented line names a template ROI; its role (OAR vs PTV) follows
/// from the name. Each indented line under it declares one constraint.
pub fn parse_protocol_file(content: &str) -> Result<RoiConstraints, ParseError> {
    let mut rois: RoiConstraints = BTreeMap::new();
    let mut current: Option<(String, RoiType)> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with([' ', '\t']) {
            let roi = line.trim().to_string();
            let roi_type = RoiType::from_template_roi(&roi);
            rois.insert(roi.clone(), Vec::new());
            current = Some((roi, roi_type));
            continue;
        }

        let Some((roi, roi_type)) = &current else {
            return Err(ParseError::OrphanConstraint { line: line_no });
        };

        let mut parts = line.split_whitespace();
        let (Some(label), Some(threshold), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::BadConstraintLine { line: line_no });
        };

        let constraint = Constraint::parse(label, threshold, *roi_type)?;
        rois.entry(roi.clone()).or_default().push(constraint);
    }

    Ok(rois)
}

//! Scorecard evaluation engine.
//!
//! One [`EvaluationSession`] owns everything scoped to the current plan
//! selection: the active row set, the manual override map, and the DVH
//! cache. All three are invalidated together by the selection
//! transitions, never piecemeal. Rows move `Unmatched → Matched →
//! Computed`; a DVH failure drops a single row back to `Matched` and
//! leaves its siblings alone.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use anyhow::Result;

use crate::aliases::AliasRegistry;
use crate::constraint::{Constraint, Metric, Operator};
use crate::matching::MatchTuning;
use crate::protocol::ProtocolLibrary;
use crate::providers::{
    DoseUnits, Dvh, DvhProvider, PlanFileSet, StructureEntry, StructureProvider, VolumeUnits,
};
use crate::resolver::RoiResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

/// Row lifecycle state, derived from which fields are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Unmatched,
    Matched,
    Computed,
}

/// One scorecard row: a (template ROI, constraint) pair plus everything
/// matching and evaluation have filled in so far.
#[derive(Debug)]
pub struct ScoreRow {
    pub template_roi: String,
    pub plan_roi: Option<String>,
    pub structure_key: Option<String>,
    pub volume: Option<f64>,
    pub min_dose: Option<f64>,
    pub mean_dose: Option<f64>,
    pub max_dose: Option<f64>,
    pub constraint: Constraint,
    pub value: Option<f64>,
    pub verdict: Option<Verdict>,
    /// Set when a manual override governs this row's match.
    pub overridden: bool,
}

impl ScoreRow {
    /// A fresh row for a (template ROI, constraint) pair, untouched by
    /// matching or computation.
    pub fn seed(template_roi: String, constraint: Constraint) -> Self {
        Self {
            template_roi,
            plan_roi: None,
            structure_key: None,
            volume: None,
            min_dose: None,
            mean_dose: None,
            max_dose: None,
            constraint,
            value: None,
            verdict: None,
            overridden: false,
        }
    }

    pub fn state(&self) -> RowState {
        if self.plan_roi.is_none() {
            RowState::Unmatched
        } else if self.value.is_none() {
            RowState::Matched
        } else {
            RowState::Computed
        }
    }

    /// Human-readable constraint rendering, e.g. `V_20 > 10`.
    pub fn constraint_text(&self) -> String {
        self.constraint.to_string()
    }

    fn clear_results(&mut self) {
        self.volume = None;
        self.min_dose = None;
        self.mean_dose = None;
        self.max_dose = None;
        self.value = None;
        self.verdict = None;
    }
}

/// Compute a row's numeric result from its DVH.
pub fn compute_constraint_value(constraint: &Constraint, dvh: &dyn Dvh) -> Result<f64> {
    match constraint.metric {
        Metric::DoseAtVolume(input) => dvh.dose_at_volume(input.value, VolumeUnits::Cc),
        Metric::VolumeAtDose(input) => dvh.volume_at_dose(input.value, DoseUnits::Gy),
        Metric::MeanDose => Ok(dvh.mean_dose()),
        Metric::MaxVolumeAtDose(input) => {
            let at_dose = dvh.volume_at_dose(input.value, DoseUnits::Gy)?;
            Ok(dvh.volume() - at_dose)
        }
    }
}

/// Strict inequality in both directions; a value exactly at the
/// threshold fails.
pub fn derive_pass_fail(value: f64, operator: Operator, threshold: f64) -> Verdict {
    let pass = match operator {
        Operator::Less => value < threshold,
        Operator::Greater => value > threshold,
    };
    if pass {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// All mutable state for one protocol/fractionation/plan selection.
pub struct EvaluationSession<'a> {
    library: &'a ProtocolLibrary,
    registry: &'a AliasRegistry,
    structure_provider: &'a dyn StructureProvider,
    dvh_provider: &'a dyn DvhProvider,
    tuning: MatchTuning,
    protocol: String,
    fractionation: String,
    plan: Option<(String, PlanFileSet)>,
    structures: Vec<StructureEntry>,
    rows: Vec<ScoreRow>,
    overrides: BTreeMap<String, String>,
    dvh_cache: HashMap<String, Box<dyn Dvh>>,
}

impl<'a> EvaluationSession<'a> {
    pub fn new(
        library: &'a ProtocolLibrary,
        registry: &'a AliasRegistry,
        structure_provider: &'a dyn StructureProvider,
        dvh_provider: &'a dyn DvhProvider,
        tuning: MatchTuning,
        protocol: &str,
        fractionation: &str,
    ) -> Result<Self> {
        if !library.has_protocol(protocol) {
            anyhow::bail!("Unknown protocol: {}", protocol);
        }
        if !library
            .fractionations(protocol)
            .iter()
            .any(|fx| fx == fractionation)
        {
            anyhow::bail!("Protocol {} has no {}fx variant", protocol, fractionation);
        }

        let mut session = Self {
            library,
            registry,
            structure_provider,
            dvh_provider,
            tuning,
            protocol: protocol.to_string(),
            fractionation: fractionation.to_string(),
            plan: None,
            structures: Vec::new(),
            rows: Vec::new(),
            overrides: BTreeMap::new(),
            dvh_cache: HashMap::new(),
        };
        session.rebuild_rows();
        Ok(session)
    }

    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn fractionation(&self) -> &str {
        &self.fractionation
    }

    pub fn plan_id(&self) -> Option<&str> {
        self.plan.as_ref().map(|(id, _)| id.as_str())
    }

    /// Plan ROI names from the current structure set.
    pub fn plan_roi_names(&self) -> Vec<String> {
        self.structures.iter().map(|s| s.name.clone()).collect()
    }

    /// Switch protocols. Keeps the current fractionation when the new
    /// protocol offers it, otherwise falls back to the first available.
    pub fn select_protocol(&mut self, protocol: &str) -> Result<Vec<String>> {
        if !self.library.has_protocol(protocol) {
            anyhow::bail!("Unknown protocol: {}", protocol);
        }
        let fractionations = self.library.fractionations(protocol);
        if !fractionations.iter().any(|fx| *fx == self.fractionation) {
            let Some(first) = fractionations.first() else {
                anyhow::bail!("Protocol {} declares no fractionations", protocol);
            };
            self.fractionation = first.clone();
        }
        self.protocol = protocol.to_string();
        self.reset_and_evaluate()
    }

    pub fn select_fractionation(&mut self, fractionation: &str) -> Result<Vec<String>> {
        if !self
            .library
            .fractionations(&self.protocol)
            .iter()
            .any(|fx| fx == fractionation)
        {
            anyhow::bail!(
                "Protocol {} has no {}fx variant",
                self.protocol,
                fractionation
            );
        }
        self.fractionation = fractionation.to_string();
        self.reset_and_evaluate()
    }

    /// Switch plans. Clears the override map and DVH cache, refreshes the
    /// structure list, and evaluates the rebuilt row set.
    pub fn select_plan(&mut self, plan_id: &str, files: PlanFileSet) -> Result<Vec<String>> {
        self.overrides.clear();
        self.plan = Some((plan_id.to_string(), files));
        self.refresh_structures()?;
        self.reset_and_evaluate()
    }

    /// Re-read the plan's structure list and re-resolve. Overrides
    /// survive this; only a plan change clears them.
    pub fn refresh_plan_structures(&mut self) -> Result<Vec<String>> {
        self.refresh_structures()?;
        self.reset_and_evaluate()
    }

    /// Record or clear a manual override for a template ROI, then
    /// re-resolve and recompute. Cached DVHs are reused.
    pub fn set_override(&mut self, template_roi: &str, plan_roi: Option<String>) -> Vec<String> {
        match plan_roi {
            Some(roi) => {
                self.overrides.insert(template_roi.to_string(), roi);
            }
            None => {
                self.overrides.remove(template_roi);
            }
        }
        self.rematch();
        self.compute_all()
    }

    /// Remove one row from the active set. The constraint repository is
    /// untouched; a later rebuild restores the full set.
    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        if index >= self.rows.len() {
            anyhow::bail!("No row at index {}", index);
        }
        self.rows.remove(index);
        Ok(())
    }

    /// Rebuild the row set and recompute everything from scratch.
    pub fn recompute(&mut self) -> Result<Vec<String>> {
        self.reset_and_evaluate()
    }

    fn reset_and_evaluate(&mut self) -> Result<Vec<String>> {
        self.dvh_cache.clear();
        self.rebuild_rows();
        self.rematch();
        Ok(self.compute_all())
    }

    fn rebuild_rows(&mut self) {
        self.rows = self
            .library
            .column_data(&self.protocol, &self.fractionation)
            .into_iter()
            .map(|seed| ScoreRow::seed(seed.template_roi, seed.constraint))
            .collect();
    }

    fn refresh_structures(&mut self) -> Result<()> {
        let Some((_, files)) = &self.plan else {
            self.structures.clear();
            return Ok(());
        };
        self.structures = self
            .structure_provider
            .parse_structures(&files.structure_file)?;
        Ok(())
    }

    fn rematch(&mut self) {
        for row in &mut self.rows {
            row.plan_roi = None;
            row.structure_key = None;
            row.overridden = false;
            row.clear_results();
        }
        if self.plan.is_none() {
            return;
        }

        let plan_names = self.plan_roi_names();
        let key_by_name: HashMap<&str, &str> = self
            .structures
            .iter()
            .map(|s| (s.name.as_str(), s.key.as_str()))
            .collect();

        // Required templates come from the active rows, so deleted rows
        // no longer claim a plan ROI.
        let mut templates: Vec<String> = Vec::new();
        for row in &self.rows {
            if !templates.contains(&row.template_roi) {
                templates.push(row.template_roi.clone());
            }
        }

        let resolver = RoiResolver::new(self.registry).with_tuning(
            self.tuning.weight_simple,
            self.tuning.weight_partial,
            self.tuning.score_threshold,
        );
        let matches = resolver.match_all(&templates, &plan_names);

        for row in &mut self.rows {
            let auto = matches.get(&row.template_roi).cloned().flatten();
            let (chosen, overridden) = match self.overrides.get(&row.template_roi) {
                // An override naming a vanished plan ROI leaves the row
                // unmatched; the entry is retained so it re-applies if
                // the name reappears.
                Some(roi) if key_by_name.contains_key(roi.as_str()) => (Some(roi.clone()), true),
                Some(_) => (None, true),
                None => (auto, false),
            };

            row.structure_key = chosen
                .as_deref()
                .and_then(|name| key_by_name.get(name))
                .map(|key| key.to_string());
            row.plan_roi = chosen;
            row.overridden = overridden;
        }
    }

    fn compute_all(&mut self) -> Vec<String> {
        let Some((_, files)) = &self.plan else {
            return Vec::new();
        };
        let structure_file = files.structure_file.clone();
        let dose_file = files.dose_file.clone();

        let mut warnings = Vec::new();
        let mut failed_keys: HashSet<String> = HashSet::new();

        for i in 0..self.rows.len() {
            let Some(key) = self.rows[i].structure_key.clone() else {
                continue;
            };
            if failed_keys.contains(&key) {
                continue;
            }

            if !self.dvh_cache.contains_key(&key) {
                match self
                    .dvh_provider
                    .compute_dvh(&structure_file, &dose_file, &key)
                {
                    Ok(dvh) => {
                        self.dvh_cache.insert(key.clone(), dvh);
                    }
                    Err(err) => {
                        warnings.push(format!(
                            "DVH failed for {} (key {}): {:#}",
                            self.rows[i].template_roi, key, err
                        ));
                        failed_keys.insert(key);
                        continue;
                    }
                }
            }

            let Some(dvh) = self.dvh_cache.get(&key) else {
                continue;
            };
            let row = &mut self.rows[i];
            row.volume = Some(dvh.volume());
            row.min_dose = Some(dvh.min_dose());
            row.mean_dose = Some(dvh.mean_dose());
            row.max_dose = Some(dvh.max_dose());

            match compute_constraint_value(&row.constraint, dvh.as_ref()) {
                Ok(value) => {
                    row.value = Some(value);
                    row.verdict = Some(derive_pass_fail(
                        value,
                        row.constraint.operator,
                        row.constraint.threshold_value,
                    ));
                }
                Err(err) => {
                    warnings.push(format!(
                        "Constraint {} failed for {}: {:#}",
                        row.constraint, row.template_roi, err
                    ));
                    row.clear_results();
                }
            }
        }

        warnings
    }
}

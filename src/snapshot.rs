//! Snapshot-backed plan collaborators.
//!
//! A snapshot is a per-plan JSON export produced on the planning-system
//! side: the plan identifier, the structure list, and each structure's
//! DVH statistics plus cumulative dose/volume curve samples. One export
//! carries all three plan roles, so [`SnapshotInbox::list_plans`] hands
//! back the same path for the structure, dose, and plan slots of the
//! file triple.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::providers::{
    DoseUnits, Dvh, DvhProvider, PlanFileSet, PlanProvider, StructureEntry, StructureProvider,
    VolumeUnits,
};

#[derive(Debug, Deserialize)]
struct PlanSnapshot {
    plan: String,
    structures: Vec<StructureSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
struct StructureSnapshot {
    key: String,
    name: String,
    #[serde(rename = "type")]
    roi_type: String,
    volume: f64,
    min_dose: f64,
    mean_dose: f64,
    max_dose: f64,
    curve: CurveSnapshot,
}

/// Cumulative DVH samples: `volume_cc[i]` receives at least `dose_gy[i]`.
#[derive(Debug, Clone, Deserialize)]
struct CurveSnapshot {
    dose_gy: Vec<f64>,
    volume_cc: Vec<f64>,
}

fn load_snapshot(path: &Path) -> Result<PlanSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan snapshot {}", path.display()))?;
    let snapshot: PlanSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse plan snapshot {}", path.display()))?;

    for structure in &snapshot.structures {
        let curve = &structure.curve;
        if curve.dose_gy.is_empty() || curve.dose_gy.len() != curve.volume_cc.len() {
            anyhow::bail!(
                "Snapshot {} has a malformed curve for structure {}",
                path.display(),
                structure.name
            );
        }
    }
    Ok(snapshot)
}

/// Scans a directory of `.json` snapshot exports.
pub struct SnapshotInbox {
    dir: PathBuf,
}

impl SnapshotInbox {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl PlanProvider for SnapshotInbox {
    fn list_plans(&self) -> Result<BTreeMap<String, PlanFileSet>> {
        let pattern = self.dir.join("*.json");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Inbox path is not valid UTF-8"))?;

        let mut plans = BTreeMap::new();
        for entry in glob::glob(pattern).context("Failed to scan snapshot inbox")? {
            let path = entry?;
            let snapshot = load_snapshot(&path)?;
            plans.insert(
                snapshot.plan,
                PlanFileSet {
                    structure_file: path.clone(),
                    dose_file: path.clone(),
                    plan_file: path,
                },
            );
        }
        Ok(plans)
    }
}

/// Structure listing over snapshot exports. Marker entries are excluded.
pub struct SnapshotStructures;

impl StructureProvider for SnapshotStructures {
    fn parse_structures(&self, structure_file: &Path) -> Result<Vec<StructureEntry>> {
        let snapshot = load_snapshot(structure_file)?;
        Ok(snapshot
            .structures
            .into_iter()
            .filter(|s| !s.roi_type.eq_ignore_ascii_case("marker"))
            .map(|s| StructureEntry {
                key: s.key,
                name: s.name,
                roi_type: s.roi_type,
            })
            .collect())
    }
}

/// DVH provider over snapshot exports.
pub struct SnapshotDvhs;

impl DvhProvider for SnapshotDvhs {
    fn compute_dvh(
        &self,
        structure_file: &Path,
        _dose_file: &Path,
        structure_key: &str,
    ) -> Result<Box<dyn Dvh>> {
        let snapshot = load_snapshot(structure_file)?;
        let structure = snapshot
            .structures
            .into_iter()
            .find(|s| s.key == structure_key)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Structure key {} not present in {}",
                    structure_key,
                    structure_file.display()
                )
            })?;
        Ok(Box::new(SnapshotDvh { structure }))
    }
}

struct SnapshotDvh {
    structure: StructureSnapshot,
}

impl SnapshotDvh {
    fn curve(&self) -> (&[f64], &[f64]) {
        (
            &self.structure.curve.dose_gy,
            &self.structure.curve.volume_cc,
        )
    }
}

impl Dvh for SnapshotDvh {
    fn volume(&self) -> f64 {
        self.structure.volume
    }

    fn min_dose(&self) -> f64 {
        self.structure.min_dose
    }

    fn mean_dose(&self) -> f64 {
        self.structure.mean_dose
    }

    fn max_dose(&self) -> f64 {
        self.structure.max_dose
    }

    fn dose_at_volume(&self, volume: f64, units: VolumeUnits) -> Result<f64> {
        if units != VolumeUnits::Cc {
            anyhow::bail!("Snapshot curves only answer absolute (cc) volume queries");
        }
        let (doses, volumes) = self.curve();

        // Cumulative volume is non-increasing in dose; walk to the first
        // sample at or below the requested volume and interpolate back.
        if volume >= volumes[0] {
            return Ok(doses[0]);
        }
        for i in 1..volumes.len() {
            if volumes[i] <= volume {
                return Ok(interpolate(
                    volumes[i - 1],
                    volumes[i],
                    doses[i - 1],
                    doses[i],
                    volume,
                ));
            }
        }
        Ok(*doses.last().unwrap_or(&0.0))
    }

    fn volume_at_dose(&self, dose: f64, units: DoseUnits) -> Result<f64> {
        if units != DoseUnits::Gy {
            anyhow::bail!("Snapshot curves only answer absolute (Gy) dose queries");
        }
        let (doses, volumes) = self.curve();

        if dose <= doses[0] {
            return Ok(volumes[0]);
        }
        for i in 1..doses.len() {
            if doses[i] >= dose {
                return Ok(interpolate(
                    doses[i - 1],
                    doses[i],
                    volumes[i - 1],
                    volumes[i],
                    dose,
                ));
            }
        }
        // Beyond the last sample nothing receives the dose.
        Ok(0.0)
    }
}

fn interpolate(x0: f64, x1: f64, y0: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

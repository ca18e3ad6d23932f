//! Collaborator interfaces consumed by the evaluation engine.
//!
//! Plan discovery, structure-set parsing, and DVH computation are the
//! business of external systems; the engine only depends on these traits.
//! `snapshot` provides a JSON-export-backed implementation, and tests use
//! in-memory fakes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// The file triple associated with one plan, pre-validated as complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFileSet {
    pub structure_file: PathBuf,
    pub dose_file: PathBuf,
    pub plan_file: PathBuf,
}

/// One anatomical structure in a plan's structure set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEntry {
    /// Opaque key the dose system identifies the structure by.
    pub key: String,
    pub name: String,
    pub roi_type: String,
}

/// Enumerates the plans available for checking.
pub trait PlanProvider {
    /// Plan identifier → file triple, sorted by identifier.
    fn list_plans(&self) -> Result<BTreeMap<String, PlanFileSet>>;
}

/// Lists the anatomical structures in a structure file. Non-anatomical
/// marker entries are already excluded.
pub trait StructureProvider {
    fn parse_structures(&self, structure_file: &Path) -> Result<Vec<StructureEntry>>;
}

/// Dose units accepted by [`Dvh::volume_at_dose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseUnits {
    Gy,
    Percent,
}

/// Volume units accepted by [`Dvh::dose_at_volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeUnits {
    Cc,
    Percent,
}

/// Dose-volume histogram for one structure under one dose distribution.
pub trait Dvh {
    /// Total structure volume in cc.
    fn volume(&self) -> f64;
    fn min_dose(&self) -> f64;
    fn mean_dose(&self) -> f64;
    fn max_dose(&self) -> f64;
    /// Minimum dose received by the hottest `volume` of the structure.
    fn dose_at_volume(&self, volume: f64, units: VolumeUnits) -> Result<f64>;
    /// Volume receiving at least `dose`.
    fn volume_at_dose(&self, dose: f64, units: DoseUnits) -> Result<f64>;
}

/// Computes the DVH for one structure key.
pub trait DvhProvider {
    fn compute_dvh(
        &self,
        structure_file: &Path,
        dose_file: &Path,
        structure_key: &str,
    ) -> Result<Box<dyn Dvh>>;
}

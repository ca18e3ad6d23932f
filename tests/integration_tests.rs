//! End-to-end tests over a real workspace layout: protocol files, alias
//! registry, and snapshot inbox on disk, driven through the same types
//! the CLI uses.

mod common;

use dvhcheck::aliases::AliasRegistry;
use dvhcheck::engine::{EvaluationSession, RowState, Verdict};
use dvhcheck::matching::MatchTuning;
use dvhcheck::protocol::ProtocolLibrary;
use dvhcheck::providers::PlanProvider;
use dvhcheck::report::ScoreReport;
use dvhcheck::snapshot::{SnapshotDvhs, SnapshotInbox, SnapshotStructures};

struct World {
    _dir: tempfile::TempDir,
    library: ProtocolLibrary,
    registry: AliasRegistry,
    inbox: SnapshotInbox,
}

fn world() -> World {
    let dir = tempfile::tempdir().unwrap();
    let (protocol_dir, aliases_file, inbox_dir) = common::setup_workspace(dir.path());
    World {
        library: ProtocolLibrary::load(&protocol_dir).unwrap(),
        registry: AliasRegistry::load(&aliases_file).unwrap(),
        inbox: SnapshotInbox::new(&inbox_dir),
        _dir: dir,
    }
}

#[test]
fn test_full_scorecard_evaluation() {
    let world = world();
    let plans = world.inbox.list_plans().unwrap();
    let (plan_id, files) = plans.into_iter().next().unwrap();
    assert_eq!(plan_id, "DOE^JANE - SBRT LUL");

    let structures = SnapshotStructures;
    let dvhs = SnapshotDvhs;
    let mut session = EvaluationSession::new(
        &world.library,
        &world.registry,
        &structures,
        &dvhs,
        MatchTuning::default(),
        "TG101",
        "3",
    )
    .unwrap();

    let warnings = session.select_plan(&plan_id, files).unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);

    // ROI-major row order: Lungs, PTV, SpinalCord.
    let rows = session.rows();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.state() == RowState::Computed));

    // Lungs resolve through the "Lung Total" alias.
    let mvs = &rows[0];
    assert_eq!(mvs.template_roi, "Lungs");
    assert_eq!(mvs.plan_roi.as_deref(), Some("Lung Total"));
    assert_eq!(mvs.constraint_text(), "MVS_11.6 < 1500");
    // 3000cc total minus 1300cc at 11.6Gy leaves 1700cc, over the cap.
    assert!((mvs.value.unwrap() - 1700.0).abs() < 1e-9);
    assert_eq!(mvs.verdict, Some(Verdict::Fail));

    let mean = &rows[1];
    assert_eq!(mean.constraint_text(), "Mean > 5");
    assert_eq!(mean.value, Some(6.2));
    assert_eq!(mean.verdict, Some(Verdict::Pass));

    let ptv = &rows[2];
    assert_eq!(ptv.template_roi, "PTV");
    assert_eq!(ptv.plan_roi.as_deref(), Some("PTV_eval"));
    assert_eq!(ptv.constraint_text(), "V_20 < 95%");
    assert_eq!(ptv.constraint.threshold_value, 0.95);
    assert_eq!(ptv.value, Some(0.5));
    assert_eq!(ptv.verdict, Some(Verdict::Pass));

    let d_max = &rows[3];
    assert_eq!(d_max.template_roi, "SpinalCord");
    assert_eq!(d_max.plan_roi.as_deref(), Some("spinal cord"));
    // Dose to the hottest 0.03cc, interpolated between the last two
    // curve samples.
    assert!((d_max.value.unwrap() - 24.25).abs() < 1e-9);
    assert_eq!(d_max.verdict, Some(Verdict::Pass));
    assert_eq!(d_max.volume, Some(30.0));
    assert_eq!(d_max.max_dose, Some(24.3));

    let v18 = &rows[5];
    assert_eq!(v18.constraint_text(), "V_18 > 0.35");
    assert!((v18.value.unwrap() - 4.16).abs() < 1e-9);
    assert_eq!(v18.verdict, Some(Verdict::Pass));
}

#[test]
fn test_marker_structures_never_match() {
    let world = world();
    let plans = world.inbox.list_plans().unwrap();
    let (plan_id, files) = plans.into_iter().next().unwrap();

    let structures = SnapshotStructures;
    let dvhs = SnapshotDvhs;
    let mut session = EvaluationSession::new(
        &world.library,
        &world.registry,
        &structures,
        &dvhs,
        MatchTuning::default(),
        "TG101",
        "3",
    )
    .unwrap();
    session.select_plan(&plan_id, files).unwrap();

    assert!(!session.plan_roi_names().iter().any(|n| n.contains("BB")));
}

#[test]
fn test_json_report_round_trips() {
    let world = world();
    let plans = world.inbox.list_plans().unwrap();
    let (plan_id, files) = plans.into_iter().next().unwrap();

    let structures = SnapshotStructures;
    let dvhs = SnapshotDvhs;
    let mut session = EvaluationSession::new(
        &world.library,
        &world.registry,
        &structures,
        &dvhs,
        MatchTuning::default(),
        "TG101",
        "3",
    )
    .unwrap();
    session.select_plan(&plan_id, files).unwrap();

    let report = ScoreReport::from_session(&session);
    let rendered = serde_json::to_string_pretty(&report).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(parsed["protocol"], "TG101");
    assert_eq!(parsed["fractionation"], "3");
    assert_eq!(parsed["plan"], "DOE^JANE - SBRT LUL");
    assert_eq!(parsed["rows"].as_array().unwrap().len(), 6);
    assert_eq!(parsed["rows"][0]["pass_fail"], "Fail");
    assert_eq!(parsed["rows"][0]["calc"], "MVS");
    assert_eq!(parsed["rows"][2]["relative_threshold"], true);
}

#[test]
fn test_deleting_rows_does_not_touch_the_library() {
    let world = world();
    let plans = world.inbox.list_plans().unwrap();
    let (plan_id, files) = plans.into_iter().next().unwrap();

    let structures = SnapshotStructures;
    let dvhs = SnapshotDvhs;
    let mut session = EvaluationSession::new(
        &world.library,
        &world.registry,
        &structures,
        &dvhs,
        MatchTuning::default(),
        "TG101",
        "3",
    )
    .unwrap();
    session.select_plan(&plan_id, files).unwrap();

    session.delete_row(0).unwrap();
    session.delete_row(0).unwrap();
    assert_eq!(session.rows().len(), 4);
    assert_eq!(world.library.column_data("TG101", "3").len(), 6);

    // Re-selecting the same protocol restores the full row set.
    session.recompute().unwrap();
    assert_eq!(session.rows().len(), 6);
}

#[test]
fn test_alias_registry_persists_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (_, aliases_file, _) = common::setup_workspace(dir.path());

    let mut registry = AliasRegistry::load(&aliases_file).unwrap();
    registry.add_template("Esophagus", vec!["esoph".to_string()]);
    registry.save().unwrap();

    let reloaded = AliasRegistry::load(&aliases_file).unwrap();
    assert_eq!(
        reloaded.template_rois(),
        vec!["Esophagus", "Lungs", "PTV", "SpinalCord"]
    );
    assert_eq!(reloaded.aliases("Esophagus"), ["esoph"]);
    assert_eq!(reloaded.owner_of("esoph"), Some("Esophagus"));
}

//! Common test helpers for integration tests

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

pub const TG101_3FX: &str = "\
SpinalCord
\tD_max 22.5
\tD_0.35 18
\tV_18 0.35
Lungs
\tMVS_11.6 1500
\tMean 5
PTV
\tV_20 95%
";

pub const ALIASES: &str = "SpinalCord\nLungs,Lung Total\nPTV\n";

/// Lay out a full workspace: protocol dir, alias file, and one plan
/// snapshot in the inbox. Returns (protocol_dir, aliases_file, inbox_dir).
pub fn setup_workspace(root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let protocol_dir = root.join("protocols");
    fs::create_dir_all(&protocol_dir).unwrap();
    fs::write(protocol_dir.join("TG101_3fx.scp"), TG101_3FX).unwrap();

    let aliases_file = protocol_dir.join("structure_aliases.csv");
    fs::write(&aliases_file, ALIASES).unwrap();

    let inbox_dir = root.join("inbox");
    fs::create_dir_all(&inbox_dir).unwrap();
    fs::write(
        inbox_dir.join("sbrt_lul.json"),
        serde_json::to_string_pretty(&sample_snapshot()).unwrap(),
    )
    .unwrap();

    (protocol_dir, aliases_file, inbox_dir)
}

pub fn sample_snapshot() -> serde_json::Value {
    json!({
        "plan": "DOE^JANE - SBRT LUL",
        "structures": [
            {
                "key": "2",
                "name": "spinal cord",
                "type": "ORGAN",
                "volume": 30.0,
                "min_dose": 0.5,
                "mean_dose": 8.0,
                "max_dose": 24.3,
                "curve": {
                    "dose_gy": [0.0, 10.0, 20.0, 25.0],
                    "volume_cc": [30.0, 20.0, 0.2, 0.0]
                }
            },
            {
                "key": "4",
                "name": "Lung Total",
                "type": "ORGAN",
                "volume": 3000.0,
                "min_dose": 0.1,
                "mean_dose": 6.2,
                "max_dose": 22.0,
                "curve": {
                    "dose_gy": [0.0, 5.0, 11.6, 20.0],
                    "volume_cc": [3000.0, 2500.0, 1300.0, 100.0]
                }
            },
            {
                "key": "5",
                "name": "PTV_eval",
                "type": "PTV",
                "volume": 35.0,
                "min_dose": 18.5,
                "mean_dose": 21.0,
                "max_dose": 23.5,
                "curve": {
                    "dose_gy": [0.0, 20.0, 22.0],
                    "volume_cc": [35.0, 0.5, 0.0]
                }
            },
            {
                "key": "9",
                "name": "BB marker",
                "type": "MARKER",
                "volume": 0.05,
                "min_dose": 0.0,
                "mean_dose": 0.0,
                "max_dose": 0.0,
                "curve": { "dose_gy": [0.0], "volume_cc": [0.05] }
            }
        ]
    })
}

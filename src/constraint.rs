//! Typed dose/volume constraint model.
//!
//! Protocol files declare constraints as a bare label plus a threshold
//! (e.g. `V_20  10`, `D_max  22%`, `Mean  4.5`). The label encodes the
//! metric family and, where applicable, an embedded numeric input. All of
//! that is parsed exactly once, at load time, into a closed [`Metric`]
//! variant; the comparison operator and units fall out of a pattern match
//! over the variant and the structure's role. Evaluation never re-parses
//! label text.

use std::fmt;

use crate::error::ParseError;

/// Volume of the point-dose hot spot referenced by `max` inputs, in cc.
pub const MAX_DOSE_VOLUME: f64 = 0.03;

/// Structure role. Constraint direction flips between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiType {
    Oar,
    Ptv,
}

impl RoiType {
    /// Derive the role from a template ROI name: anything containing
    /// `PTV` is a target, everything else is an organ at risk.
    pub fn from_template_roi(name: &str) -> Self {
        if name.contains("PTV") {
            RoiType::Ptv
        } else {
            RoiType::Oar
        }
    }
}

impl fmt::Display for RoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoiType::Oar => write!(f, "OAR"),
            RoiType::Ptv => write!(f, "PTV"),
        }
    }
}

/// Comparison direction for the pass verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Less,
    Greater,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Less => write!(f, "<"),
            Operator::Greater => write!(f, ">"),
        }
    }
}

/// Whether a numeric input or threshold is absolute (cc/Gy) or a
/// percentage of the structure/prescription quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Absolute,
    Relative,
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Absolute => write!(f, "absolute"),
            Scale::Relative => write!(f, "relative"),
        }
    }
}

/// Numeric input embedded in a constraint label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricInput {
    pub value: f64,
    pub scale: Scale,
}

/// The closed set of metric families a label can parse to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    /// `D_<x>`: dose received by the hottest `<x>` of the structure.
    /// Output is a dose in Gy.
    DoseAtVolume(MetricInput),
    /// `V_<x>`: volume receiving at least `<x>` dose. Output is a
    /// volume in cc.
    VolumeAtDose(MetricInput),
    /// `MVS_<x>`: structure volume minus the volume receiving at least
    /// `<x>` dose. Output is a volume in cc.
    MaxVolumeAtDose(MetricInput),
    /// `Mean`: the structure's mean dose in Gy.
    MeanDose,
}

impl Metric {
    fn parse(label: &str) -> Result<Self, ParseError> {
        if label == "Mean" {
            return Ok(Metric::MeanDose);
        }

        let Some((family, input)) = label.split_once('_') else {
            return Err(ParseError::UnknownLabel {
                label: label.to_string(),
            });
        };

        let input = parse_input(label, input)?;
        match family {
            "D" => Ok(Metric::DoseAtVolume(input)),
            "V" => Ok(Metric::VolumeAtDose(input)),
            "MVS" => Ok(Metric::MaxVolumeAtDose(input)),
            _ => Err(ParseError::UnknownLabel {
                label: label.to_string(),
            }),
        }
    }

    /// The numeric input, if this family carries one.
    pub fn input(&self) -> Option<MetricInput> {
        match self {
            Metric::DoseAtVolume(input)
            | Metric::VolumeAtDose(input)
            | Metric::MaxVolumeAtDose(input) => Some(*input),
            Metric::MeanDose => None,
        }
    }

    /// Units of the computed result.
    pub fn output_units(&self) -> &'static str {
        match self {
            Metric::DoseAtVolume(_) | Metric::MeanDose => "Gy",
            Metric::VolumeAtDose(_) | Metric::MaxVolumeAtDose(_) => "cc",
        }
    }

    /// Units of the embedded input, `%` when relative.
    pub fn input_units(&self) -> Option<&'static str> {
        let input = self.input()?;
        if input.scale == Scale::Relative {
            return Some("%");
        }
        match self {
            Metric::DoseAtVolume(_) => Some("cc"),
            Metric::VolumeAtDose(_) | Metric::MaxVolumeAtDose(_) => Some("Gy"),
            Metric::MeanDose => None,
        }
    }

    /// Short family code used in tables and reports.
    pub fn family(&self) -> &'static str {
        match self {
            Metric::DoseAtVolume(_) => "Volume",
            Metric::VolumeAtDose(_) => "Dose",
            Metric::MaxVolumeAtDose(_) => "MVS",
            Metric::MeanDose => "Mean",
        }
    }
}

fn parse_input(label: &str, input: &str) -> Result<MetricInput, ParseError> {
    // `max` designates the point-dose hot spot, a fixed absolute volume.
    if input.contains("max") {
        return Ok(MetricInput {
            value: MAX_DOSE_VOLUME,
            scale: Scale::Absolute,
        });
    }

    let scale = if input.contains('%') {
        Scale::Relative
    } else {
        Scale::Absolute
    };
    let value = input
        .replace('%', "")
        .replace('_', "")
        .parse::<f64>()
        .map_err(|_| ParseError::BadInput {
            label: label.to_string(),
        })?;

    Ok(MetricInput { value, scale })
}

/// One scored requirement for one template ROI.
///
/// Raw `label`/`threshold` text is retained for display; everything the
/// evaluation needs is derived here and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub label: String,
    pub threshold: String,
    pub roi_type: RoiType,
    pub metric: Metric,
    pub operator: Operator,
    pub threshold_value: f64,
    pub threshold_scale: Scale,
}

impl Constraint {
    pub fn parse(label: &str, threshold: &str, roi_type: RoiType) -> Result<Self, ParseError> {
        let metric = Metric::parse(label)?;
        let operator = derive_operator(metric, roi_type);

        let threshold_scale = if threshold.contains('%') {
            Scale::Relative
        } else {
            Scale::Absolute
        };
        let mut threshold_value =
            threshold
                .replace('%', "")
                .parse::<f64>()
                .map_err(|_| ParseError::BadThreshold {
                    threshold: threshold.to_string(),
                })?;
        if threshold_scale == Scale::Relative {
            threshold_value /= 100.0;
        }

        Ok(Self {
            label: label.to_string(),
            threshold: threshold.to_string(),
            roi_type,
            metric,
            operator,
            threshold_value,
            threshold_scale,
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.label, self.operator, self.threshold)
    }
}

fn derive_operator(metric: Metric, roi_type: RoiType) -> Operator {
    match (metric, roi_type) {
        (Metric::MaxVolumeAtDose(_), RoiType::Oar) => Operator::Less,
        (Metric::MaxVolumeAtDose(_), RoiType::Ptv) => Operator::Greater,
        (_, RoiType::Oar) => Operator::Greater,
        (_, RoiType::Ptv) => Operator::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_type_from_template_name() {
        assert_eq!(RoiType::from_template_roi("PTV"), RoiType::Ptv);
        assert_eq!(RoiType::from_template_roi("PTV_3mm"), RoiType::Ptv);
        assert_eq!(RoiType::from_template_roi("SpinalCord"), RoiType::Oar);
        assert_eq!(RoiType::from_template_roi("Lungs"), RoiType::Oar);
    }

    #[test]
    fn test_volume_at_dose_label() {
        let c = Constraint::parse("V_20", "10", RoiType::Oar).unwrap();
        assert_eq!(
            c.metric,
            Metric::VolumeAtDose(MetricInput {
                value: 20.0,
                scale: Scale::Absolute
            })
        );
        assert_eq!(c.metric.output_units(), "cc");
        assert_eq!(c.metric.input_units(), Some("Gy"));
        assert_eq!(c.threshold_value, 10.0);
        assert_eq!(c.threshold_scale, Scale::Absolute);
    }

    #[test]
    fn test_dose_at_volume_label() {
        let c = Constraint::parse("D_0.35", "18.0", RoiType::Oar).unwrap();
        assert_eq!(
            c.metric,
            Metric::DoseAtVolume(MetricInput {
                value: 0.35,
                scale: Scale::Absolute
            })
        );
        assert_eq!(c.metric.output_units(), "Gy");
        assert_eq!(c.metric.input_units(), Some("cc"));
    }

    #[test]
    fn test_max_input_is_point_dose_volume() {
        let c = Constraint::parse("D_max", "22", RoiType::Oar).unwrap();
        let input = c.metric.input().unwrap();
        assert_eq!(input.value, MAX_DOSE_VOLUME);
        assert_eq!(input.scale, Scale::Absolute);
    }

    #[test]
    fn test_relative_input_scale() {
        let c = Constraint::parse("V_95%", "0.9", RoiType::Ptv).unwrap();
        let input = c.metric.input().unwrap();
        assert_eq!(input.value, 95.0);
        assert_eq!(input.scale, Scale::Relative);
        assert_eq!(c.metric.input_units(), Some("%"));
    }

    #[test]
    fn test_relative_threshold_divided_by_100() {
        let c = Constraint::parse("V_20", "20%", RoiType::Ptv).unwrap();
        assert_eq!(c.threshold_value, 0.20);
        assert_eq!(c.threshold_scale, Scale::Relative);
    }

    #[test]
    fn test_mean_label() {
        let c = Constraint::parse("Mean", "4.5", RoiType::Oar).unwrap();
        assert_eq!(c.metric, Metric::MeanDose);
        assert!(c.metric.input().is_none());
        assert!(c.metric.input_units().is_none());
        assert_eq!(c.metric.output_units(), "Gy");
    }

    #[test]
    fn test_mvs_label() {
        let c = Constraint::parse("MVS_7.4", "1500", RoiType::Oar).unwrap();
        assert_eq!(
            c.metric,
            Metric::MaxVolumeAtDose(MetricInput {
                value: 7.4,
                scale: Scale::Absolute
            })
        );
        assert_eq!(c.metric.output_units(), "cc");
        assert_eq!(c.metric.family(), "MVS");
    }

    #[test]
    fn test_operator_flips_by_structure_role() {
        // MVS family: < for OAR, > for PTV.
        let oar = Constraint::parse("MVS_7.4", "1500", RoiType::Oar).unwrap();
        let ptv = Constraint::parse("MVS_7.4", "1500", RoiType::Ptv).unwrap();
        assert_eq!(oar.operator, Operator::Less);
        assert_eq!(ptv.operator, Operator::Greater);

        // Every other family: > for OAR, < for PTV.
        for label in ["V_20", "D_max", "Mean"] {
            let oar = Constraint::parse(label, "10", RoiType::Oar).unwrap();
            let ptv = Constraint::parse(label, "10", RoiType::Ptv).unwrap();
            assert_eq!(oar.operator, Operator::Greater, "label {}", label);
            assert_eq!(ptv.operator, Operator::Less, "label {}", label);
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = Constraint::parse("V_12.4", "15%", RoiType::Ptv).unwrap();
        let b = Constraint::parse("V_12.4", "15%", RoiType::Ptv).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        assert!(Constraint::parse("Median", "5", RoiType::Oar).is_err());
        assert!(Constraint::parse("X_20", "5", RoiType::Oar).is_err());
        assert!(Constraint::parse("V20", "5", RoiType::Oar).is_err());
    }

    #[test]
    fn test_non_numeric_input_is_an_error() {
        let err = Constraint::parse("V_high", "5", RoiType::Oar).unwrap_err();
        assert!(err.to_string().contains("V_high"));
    }

    #[test]
    fn test_non_numeric_threshold_is_an_error() {
        assert!(Constraint::parse("V_20", "ten", RoiType::Oar).is_err());
    }

    #[test]
    fn test_display_renders_label_operator_threshold() {
        let c = Constraint::parse("V_20", "10", RoiType::Oar).unwrap();
        assert_eq!(c.to_string(), "V_20 > 10");
        let c = Constraint::parse("D_max", "22%", RoiType::Ptv).unwrap();
        assert_eq!(c.to_string(), "D_max < 22%");
    }
}

//! Parse errors for the protocol and alias file formats.
//!
//! Loading is fail-fast: a file that violates its grammar aborts the load
//! rather than registering a partial result.

use std::fmt;

#[derive(Debug)]
pub enum ParseError {
    /// Constraint label that matches no known metric family.
    UnknownLabel { label: String },
    /// Metric family recognized but the embedded input is not numeric.
    BadInput { label: String },
    /// Threshold text that does not parse as a number.
    BadThreshold { threshold: String },
    /// Indented constraint line encountered before any ROI header.
    OrphanConstraint { line: usize },
    /// Indented line that is not a `<label> <threshold>` pair.
    BadConstraintLine { line: usize },
    /// Protocol file name does not encode `<protocol>_<N>fx`.
    BadFileName { name: String },
    /// Alias file line with an empty template ROI field.
    BadAliasLine { line: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownLabel { label } => {
                write!(f, "Unrecognized constraint label: {}", label)
            }
            ParseError::BadInput { label } => {
                write!(f, "Constraint label has a non-numeric input: {}", label)
            }
            ParseError::BadThreshold { threshold } => {
                write!(f, "Threshold is not a number: {}", threshold)
            }
            ParseError::OrphanConstraint { line } => {
                write!(f, "Line {}: constraint appears before any ROI header", line)
            }
            ParseError::BadConstraintLine { line } => {
                write!(f, "Line {}: expected `<label> <threshold>`", line)
            }
            ParseError::BadFileName { name } => {
                write!(f, "Protocol file name must be `<protocol>_<N>fx`: {}", name)
            }
            ParseError::BadAliasLine { line } => {
                write!(f, "Line {}: empty template ROI field", line)
            }
        }
    }
}

impl std::error::Error for ParseError {}

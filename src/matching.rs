//! Fuzzy ROI name scoring.
//!
//! Clinician-entered ROI names are inconsistent ("Lt Parotid",
//! "parotid_l", "L PAROTID") so candidate names are compared after
//! normalization with two similarity ratios: a whole-string ratio and a
//! best-aligned-substring ratio. The two are weighted and multiplied into
//! a single 0–1 score; the partial term is down-weighted so that a loose
//! substring hit alone cannot outrank a close whole-string match.

use rapidfuzz::fuzz;

/// Weight applied to the whole-string ratio.
pub const WEIGHT_SIMPLE: f64 = 1.0;
/// Weight applied to the best-substring ratio.
pub const WEIGHT_PARTIAL: f64 = 0.6;
/// Combined scores below this are treated as no match at all.
pub const SCORE_THRESHOLD: f64 = 0.3;

/// Weights and score floor applied by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    pub weight_simple: f64,
    pub weight_partial: f64,
    pub score_threshold: f64,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            weight_simple: WEIGHT_SIMPLE,
            weight_partial: WEIGHT_PARTIAL,
            score_threshold: SCORE_THRESHOLD,
        }
    }
}

/// Normalize an ROI name for comparison: strip underscores and spaces,
/// lowercase the rest.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Combined similarity of two ROI names on a 0–1 scale.
///
/// Both component ratios run 0–100; each is scaled by its weight and the
/// products are merged by dividing through 10000. A score of 1.0 requires
/// both ratios at maximum with unit weights.
pub fn combined_score(a: &str, b: &str, weight_simple: f64, weight_partial: f64) -> f64 {
    let a = clean_name(a);
    let b = clean_name(b);

    let simple = fuzz::ratio(a.chars(), b.chars()) * weight_simple;
    let partial = fuzz::partial_ratio(a.chars(), b.chars()) * weight_partial;
    simple * partial / 10_000.0
}

/// Score `query` against every candidate and rank descending.
///
/// The sort is stable, so candidates with equal scores keep their
/// original relative order: first seen wins ties.
pub fn ranked_matches<'a>(
    query: &str,
    candidates: &'a [String],
    weight_simple: f64,
    weight_partial: f64,
) -> Vec<(f64, &'a str)> {
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .map(|c| {
            (
                combined_score(query, c, weight_simple, weight_partial),
                c.as_str(),
            )
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

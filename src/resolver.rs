//! Best-effort resolution of plan ROI names to protocol template ROIs.
//!
//! Each plan ROI is scored against the full vocabulary of template names
//! and accepted aliases; the winning string's owning template claims the
//! plan ROI. Per required template the highest-scoring claimant wins, and
//! anything under the score floor is reported unmatched rather than
//! guessed.

use std::collections::{BTreeMap, HashMap};

use crate::aliases::AliasRegistry;
use crate::matching::{ranked_matches, SCORE_THRESHOLD, WEIGHT_PARTIAL, WEIGHT_SIMPLE};

/// Result of resolving one plan ROI name.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiMatch {
    /// Owning template of the best-scoring vocabulary string, if any.
    pub template_roi: Option<String>,
    pub plan_roi: String,
    pub score: f64,
}

pub struct RoiResolver<'a> {
    registry: &'a AliasRegistry,
    weight_simple: f64,
    weight_partial: f64,
    score_threshold: f64,
}

impl<'a> RoiResolver<'a> {
    pub fn new(registry: &'a AliasRegistry) -> Self {
        Self {
            registry,
            weight_simple: WEIGHT_SIMPLE,
            weight_partial: WEIGHT_PARTIAL,
            score_threshold: SCORE_THRESHOLD,
        }
    }

    /// Override the default weights and score floor.
    pub fn with_tuning(mut self, weight_simple: f64, weight_partial: f64, threshold: f64) -> Self {
        self.weight_simple = weight_simple;
        self.weight_partial = weight_partial;
        self.score_threshold = threshold;
        self
    }

    /// Resolve one plan ROI name to the template owning its best-scoring
    /// vocabulary string. A winner no template owns resolves to no match
    /// with score 0.
    pub fn resolve(&self, plan_roi: &str) -> RoiMatch {
        let vocabulary = self.registry.all_roi_strings();
        let ranked = ranked_matches(
            plan_roi,
            &vocabulary,
            self.weight_simple,
            self.weight_partial,
        );

        let owner = ranked
            .first()
            .and_then(|(score, winner)| {
                self.registry
                    .owner_of(winner)
                    .map(|template| (template.to_string(), *score))
            });

        match owner {
            Some((template, score)) => RoiMatch {
                template_roi: Some(template),
                plan_roi: plan_roi.to_string(),
                score,
            },
            None => RoiMatch {
                template_roi: None,
                plan_roi: plan_roi.to_string(),
                score: 0.0,
            },
        }
    }

    /// Map every required template ROI to its best plan ROI, or `None`
    /// when nothing scores at or above the floor.
    ///
    /// Plan ROIs are grouped by the template they resolve to, so one plan
    /// ROI can never be assigned to two templates; within a group the
    /// maximum score wins, earliest seen on ties.
    pub fn match_all(
        &self,
        template_rois: &[String],
        plan_rois: &[String],
    ) -> BTreeMap<String, Option<String>> {
        let mut grouped: HashMap<String, Vec<(f64, String)>> = HashMap::new();
        for plan_roi in plan_rois {
            let m = self.resolve(plan_roi);
            if let Some(template) = m.template_roi {
                grouped.entry(template).or_default().push((m.score, m.plan_roi));
            }
        }

        let mut matches = BTreeMap::new();
        for template in template_rois {
            let assigned = grouped.get(template).and_then(|claims| {
                let (best_score, best_roi) = claims.iter().fold(
                    (f64::MIN, None),
                    |(top, top_roi), (score, roi)| {
                        if *score > top {
                            (*score, Some(roi))
                        } else {
                            (top, top_roi)
                        }
                    },
                );
                if best_score < self.score_threshold {
                    None
                } else {
                    best_roi.cloned()
                }
            });
            matches.insert(template.clone(), assigned);
        }

        matches
    }
}

//! Context switch cost detector.
//!
//! Compares ratings of sessions that began with a project switch against
//! sessions that continued the previous project. The effect size is the
//! raw rating difference (switched minus consecutive), so a negative value
//! is a cost.

use super::{rated, split_ratings, Candidate, DetectorContext, DetectorOutcome, PatternDetector};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::welch_t_test;
use crate::types::{PatternEvidence, PatternType};

pub struct ContextSwitchDetector;

impl ContextSwitchDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContextSwitchDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for ContextSwitchDetector {
    fn name(&self) -> &str {
        "core.context_switch_cost"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::ContextSwitchCost
    }

    fn detect(&self, rows: &[FeatureRow], _ctx: &DetectorContext) -> DetectorOutcome {
        let rated = rated(rows);
        let (switched, consecutive) = split_ratings(&rated, |row| row.is_context_switch);

        if switched.len() < 2 || consecutive.len() < 2 {
            return DetectorOutcome::abstain(format!(
                "need two rated sessions on each side (switched: {}, consecutive: {})",
                switched.len(),
                consecutive.len()
            ));
        }

        let Some(test) = welch_t_test(&switched, &consecutive) else {
            return DetectorOutcome::abstain("switch comparison is undefined");
        };
        let difference = test.mean_difference();

        let (description, recommendation) = if difference < 0.0 {
            (
                format!(
                    "Switching projects costs {:.2} rating points (mean {:.2} after a switch vs {:.2} when continuing)",
                    -difference, test.mean_a, test.mean_b
                ),
                "Batch work by project and avoid switching mid-block".to_string(),
            )
        } else {
            (
                format!(
                    "Sessions after a project switch rate {:.2} points higher (mean {:.2} vs {:.2} when continuing)",
                    difference, test.mean_a, test.mean_b
                ),
                "Rotating between projects appears to keep you fresh; keep mixing them".to_string(),
            )
        };

        DetectorOutcome::Found(vec![Candidate {
            pattern_type: PatternType::ContextSwitchCost,
            description,
            p_value: test.p_value,
            effect_size: difference,
            supporting_sample_size: test.n_a + test.n_b,
            recommendation,
            evidence: PatternEvidence::ContextSwitch {
                switched_mean: test.mean_a,
                consecutive_mean: test.mean_b,
                switched_sessions: test.n_a,
                consecutive_sessions: test.n_b,
            },
        }])
    }
}

//! Statistical validation of detector candidates.
//!
//! Turns raw [`Candidate`]s into [`PatternResult`]s. A candidate survives
//! only with a finite effect, a p-value below 0.1 (and below the caller's
//! `min_confidence` cut), and at least the minimum supporting sample for its
//! pattern type. Every decision is recorded as a diagnostic.

use super::detectors::{Candidate, DetectorOutcome};
use crate::types::{
    ConfidenceTier, DiagnosticEntry, DiagnosticOutcome, PatternResult, PatternType,
};

/// Minimum `supporting_sample_size` per pattern type.
pub fn minimum_sample(pattern_type: PatternType) -> usize {
    match pattern_type {
        PatternType::PeakProductivity => 10,
        PatternType::DeepWorkWindow => 3,
        PatternType::ContextSwitchCost => 10,
        PatternType::WorkRhythm => 15,
        PatternType::ProjectAffinity => 3,
        PatternType::EnergyCorrelation => 10,
    }
}

/// Validated patterns plus the decision trail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub accepted: Vec<PatternResult>,
    pub diagnostics: Vec<DiagnosticEntry>,
}

/// Check one candidate, returning the rejection reason on failure.
pub fn validate_candidate(
    candidate: Candidate,
    min_confidence: Option<ConfidenceTier>,
) -> Result<PatternResult, String> {
    if !candidate.p_value.is_finite() || !(0.0..=1.0).contains(&candidate.p_value) {
        return Err(format!("invalid p-value {}", candidate.p_value));
    }
    if !candidate.effect_size.is_finite() {
        return Err("effect size is not finite".to_string());
    }

    let required = minimum_sample(candidate.pattern_type);
    if candidate.supporting_sample_size < required {
        return Err(format!(
            "{} supporting sessions, {} required",
            candidate.supporting_sample_size, required
        ));
    }

    let Some(tier) = ConfidenceTier::from_p_value(candidate.p_value) else {
        return Err(format!(
            "not significant (p = {:.4})",
            candidate.p_value
        ));
    };
    if let Some(floor) = min_confidence {
        if tier < floor {
            return Err(format!(
                "confidence {} below requested {}",
                tier.label(),
                floor.label()
            ));
        }
    }

    Ok(PatternResult {
        pattern_type: candidate.pattern_type,
        description: candidate.description,
        p_value: candidate.p_value,
        confidence_tier: tier,
        effect_size: candidate.effect_size,
        supporting_sample_size: candidate.supporting_sample_size,
        recommendation: candidate.recommendation,
        evidence: candidate.evidence,
    })
}

/// Validate every detector outcome, in the order given.
pub fn validate<I>(outcomes: I, min_confidence: Option<ConfidenceTier>) -> Validation
where
    I: IntoIterator<Item = (PatternType, DetectorOutcome)>,
{
    let mut validation = Validation::default();

    for (pattern_type, outcome) in outcomes {
        match outcome {
            DetectorOutcome::Abstained(reason) => {
                tracing::debug!(%pattern_type, %reason, "Detector abstained");
                validation.diagnostics.push(DiagnosticEntry {
                    pattern_type,
                    outcome: DiagnosticOutcome::Abstained { reason },
                });
            }
            DetectorOutcome::Found(candidates) => {
                for candidate in candidates {
                    let entry = match validate_candidate(candidate, min_confidence) {
                        Ok(result) => {
                            let outcome = DiagnosticOutcome::Accepted {
                                p_value: result.p_value,
                                confidence_tier: result.confidence_tier,
                            };
                            validation.accepted.push(result);
                            outcome
                        }
                        Err(reason) => {
                            tracing::debug!(%pattern_type, %reason, "Candidate rejected");
                            DiagnosticOutcome::Rejected { reason }
                        }
                    };
                    validation.diagnostics.push(DiagnosticEntry {
                        pattern_type,
                        outcome: entry,
                    });
                }
            }
        }
    }

    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternEvidence;

    fn candidate(p_value: f64, sample: usize) -> Candidate {
        Candidate {
            pattern_type: PatternType::ContextSwitchCost,
            description: "switching hurts".to_string(),
            p_value,
            effect_size: -1.0,
            supporting_sample_size: sample,
            recommendation: "batch".to_string(),
            evidence: PatternEvidence::ContextSwitch {
                switched_mean: 2.0,
                consecutive_mean: 3.0,
                switched_sessions: sample / 2,
                consecutive_sessions: sample - sample / 2,
            },
        }
    }

    #[test]
    fn test_tiers_assigned() {
        let result = validate_candidate(candidate(0.0004, 20), None).unwrap();
        assert_eq!(result.confidence_tier, ConfidenceTier::VeryHigh);
        let result = validate_candidate(candidate(0.07, 20), None).unwrap();
        assert_eq!(result.confidence_tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_rejections() {
        assert!(validate_candidate(candidate(0.1, 20), None).is_err());
        assert!(validate_candidate(candidate(f64::NAN, 20), None).is_err());
        assert!(validate_candidate(candidate(0.001, 9), None).is_err());

        let mut infinite = candidate(0.001, 20);
        infinite.effect_size = f64::INFINITY;
        assert!(validate_candidate(infinite, None).is_err());

        let err =
            validate_candidate(candidate(0.03, 20), Some(ConfidenceTier::High)).unwrap_err();
        assert!(err.contains("below requested"));
    }

    #[test]
    fn test_diagnostics_cover_every_outcome() {
        let validation = validate(
            vec![
                (
                    PatternType::ContextSwitchCost,
                    DetectorOutcome::Found(vec![candidate(0.2, 20), candidate(0.02, 20)]),
                ),
                (
                    PatternType::WorkRhythm,
                    DetectorOutcome::abstain("too few sessions"),
                ),
            ],
            None,
        );

        assert_eq!(validation.accepted.len(), 1);
        assert_eq!(validation.diagnostics.len(), 3);
        assert!(matches!(
            validation.diagnostics[0].outcome,
            DiagnosticOutcome::Rejected { .. }
        ));
        assert!(matches!(
            validation.diagnostics[1].outcome,
            DiagnosticOutcome::Accepted {
                confidence_tier: ConfidenceTier::Medium,
                ..
            }
        ));
        assert!(matches!(
            validation.diagnostics[2].outcome,
            DiagnosticOutcome::Abstained { .. }
        ));
    }
}

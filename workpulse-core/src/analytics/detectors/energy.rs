//! Energy-productivity correlation.

use super::{Bucket, Candidate, DetectorContext, DetectorOutcome, PatternDetector};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::pearson;
use crate::types::{PatternEvidence, PatternType};

/// Sessions an energy level needs before it can be recommended.
const MIN_LEVEL_SESSIONS: usize = 2;

/// Correlates self-reported energy with productivity ratings.
pub struct EnergyCorrelationDetector;

impl EnergyCorrelationDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnergyCorrelationDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn strength(r: f64) -> &'static str {
    match r.abs() {
        a if a >= 0.7 => "strong",
        a if a >= 0.4 => "moderate",
        _ => "weak",
    }
}

impl PatternDetector for EnergyCorrelationDetector {
    fn name(&self) -> &str {
        "core.energy_correlation"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::EnergyCorrelation
    }

    fn detect(&self, rows: &[FeatureRow], _ctx: &DetectorContext) -> DetectorOutcome {
        let mut energy = Vec::new();
        let mut ratings = Vec::new();
        let mut levels = [Bucket::default(); 6];
        for row in rows {
            if let (Some(level), Some(rating)) = (row.energy_level, row.rating()) {
                energy.push(f64::from(level));
                ratings.push(rating);
                levels[level as usize % levels.len()].add(rating);
            }
        }

        let Some(correlation) = pearson(&energy, &ratings) else {
            return DetectorOutcome::abstain(format!(
                "correlation undefined over {} sessions with energy and rating (too few or no variance)",
                energy.len()
            ));
        };

        let best = levels
            .iter()
            .enumerate()
            .filter(|(_, bucket)| bucket.count >= MIN_LEVEL_SESSIONS)
            .filter_map(|(level, bucket)| bucket.mean().map(|m| (level as u8, m)))
            .fold(None::<(u8, f64)>, |best, (level, m)| match best {
                Some((_, best_mean)) if best_mean >= m => best,
                _ => Some((level, m)),
            });
        let Some((best_energy_level, best_level_mean)) = best else {
            return DetectorOutcome::abstain("no energy level has two rated sessions");
        };

        let direction = if correlation.r >= 0.0 {
            "rises"
        } else {
            "falls"
        };
        let recommendation = if correlation.r >= 0.0 {
            format!(
                "Save hard problems for when your energy is {} or higher; do admin work when it is lower",
                best_energy_level
            )
        } else {
            format!(
                "Your best sessions come at energy {}; don't wait for a high-energy moment to start",
                best_energy_level
            )
        };

        DetectorOutcome::Found(vec![Candidate {
            pattern_type: PatternType::EnergyCorrelation,
            description: format!(
                "Productivity {} with energy ({} correlation, r = {:.2}); energy {} sessions average {:.2}",
                direction,
                strength(correlation.r),
                correlation.r,
                best_energy_level,
                best_level_mean
            ),
            p_value: correlation.p_value,
            effect_size: correlation.r,
            supporting_sample_size: correlation.n,
            recommendation,
            evidence: PatternEvidence::EnergyCorrelation {
                correlation: correlation.r,
                best_energy_level,
                best_level_mean,
            },
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::row;
    use super::*;
    use crate::config::AnalysisConfig;

    fn detect(rows: &[FeatureRow]) -> DetectorOutcome {
        let config = AnalysisConfig::default();
        EnergyCorrelationDetector::new().detect(rows, &DetectorContext { config: &config })
    }

    fn energised(idx: usize, energy: u8, rating: u8) -> FeatureRow {
        let mut r = row(idx, 10, 45.0, Some(rating));
        r.energy_level = Some(energy);
        r
    }

    #[test]
    fn test_positive_correlation() {
        let rows: Vec<FeatureRow> = (0..20)
            .map(|i| {
                let energy = (i % 5) as u8 + 1;
                let rating = if i % 10 == 3 { energy.saturating_sub(1).max(1) } else { energy };
                energised(i, energy, rating)
            })
            .collect();

        let DetectorOutcome::Found(candidates) = detect(&rows) else {
            panic!("expected a correlation");
        };
        let candidate = &candidates[0];
        assert!(candidate.effect_size > 0.9);
        assert!(candidate.p_value < 0.001);
        assert_eq!(candidate.supporting_sample_size, 20);
        match candidate.evidence {
            PatternEvidence::EnergyCorrelation {
                best_energy_level, ..
            } => assert_eq!(best_energy_level, 5),
            ref other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[test]
    fn test_constant_energy_abstains() {
        let rows: Vec<FeatureRow> = (0..20).map(|i| energised(i, 3, (i % 5) as u8 + 1)).collect();
        assert!(matches!(detect(&rows), DetectorOutcome::Abstained(_)));
    }

    #[test]
    fn test_missing_energy_ignored() {
        let mut rows: Vec<FeatureRow> = (0..4).map(|i| energised(i, 2, 2)).collect();
        rows.push(row(4, 10, 45.0, Some(5)));
        assert!(matches!(detect(&rows), DetectorOutcome::Abstained(_)));
    }
}

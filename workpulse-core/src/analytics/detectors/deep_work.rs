//! Deep work window detector.
//!
//! Looks for the session length (in `deep_work_step_minutes` buckets from
//! `deep_work_min_minutes` upwards) and start hour that earn the best
//! ratings, then checks that long sessions really beat short ones.

use super::{
    hour_label, rated, Bucket, Candidate, DetectorContext, DetectorOutcome, PatternDetector,
};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::welch_t_test;
use crate::config::AnalysisConfig;
use crate::types::{PatternEvidence, PatternType};

/// Detector for the most productive long-session length and start time.
pub struct DeepWorkDetector;

impl DeepWorkDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeepWorkDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Duration buckets: one per step from min to max, plus an open-ended last one.
fn bucket_count(config: &AnalysisConfig) -> usize {
    let span = config
        .deep_work_max_minutes
        .saturating_sub(config.deep_work_min_minutes);
    (span / config.deep_work_step_minutes.max(1)) as usize + 1
}

fn bucket_index(minutes: f64, config: &AnalysisConfig, buckets: usize) -> usize {
    let over = (minutes - config.deep_work_min_minutes as f64).max(0.0);
    let idx = (over / config.deep_work_step_minutes.max(1) as f64).floor() as usize;
    idx.min(buckets - 1)
}

fn bucket_lower_bound(idx: usize, config: &AnalysisConfig) -> u32 {
    config.deep_work_min_minutes + idx as u32 * config.deep_work_step_minutes
}

/// Index of the highest mean among buckets with at least `min_count`
/// sessions. Ties keep the earlier (shorter / earlier) bucket.
fn best_bucket(buckets: &[Bucket], min_count: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, bucket) in buckets.iter().enumerate() {
        if bucket.count < min_count {
            continue;
        }
        let Some(mean) = bucket.mean() else { continue };
        match best {
            Some((_, best_mean)) if best_mean >= mean => {}
            _ => best = Some((idx, mean)),
        }
    }
    best.map(|(idx, _)| idx)
}

impl PatternDetector for DeepWorkDetector {
    fn name(&self) -> &str {
        "core.deep_work_window"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::DeepWorkWindow
    }

    fn detect(&self, rows: &[FeatureRow], ctx: &DetectorContext) -> DetectorOutcome {
        let config = ctx.config;
        let threshold = config.deep_work_min_minutes as f64;
        let rated = rated(rows);

        let (long, short): (Vec<_>, Vec<_>) = rated
            .iter()
            .partition(|(row, _)| row.duration_minutes >= threshold);

        if long.len() < 3 {
            return DetectorOutcome::abstain(format!(
                "fewer than three rated sessions of {} minutes or more",
                config.deep_work_min_minutes
            ));
        }
        if short.len() < 2 {
            return DetectorOutcome::abstain("not enough shorter sessions to compare against");
        }

        let count = bucket_count(config);
        let mut by_duration = vec![Bucket::default(); count];
        let mut by_hour = [Bucket::default(); 24];
        for (row, rating) in &long {
            by_duration[bucket_index(row.duration_minutes, config, count)].add(*rating);
            by_hour[row.hour_of_day as usize % 24].add(*rating);
        }

        let Some(duration_idx) = best_bucket(&by_duration, 2).or_else(|| best_bucket(&by_duration, 1))
        else {
            return DetectorOutcome::abstain("no populated duration bucket");
        };
        let Some(best_hour) = best_bucket(&by_hour, 1) else {
            return DetectorOutcome::abstain("no populated start hour");
        };
        let optimal_duration_minutes = bucket_lower_bound(duration_idx, config);
        let best_start_hour = best_hour as u8;

        let long_ratings: Vec<f64> = long.iter().map(|(_, r)| *r).collect();
        let short_ratings: Vec<f64> = short.iter().map(|(_, r)| *r).collect();
        let Some(test) = welch_t_test(&long_ratings, &short_ratings) else {
            return DetectorOutcome::abstain("long/short comparison is undefined");
        };
        if test.mean_difference() <= 0.0 {
            return DetectorOutcome::abstain("long sessions are not rated above short ones");
        }

        tracing::debug!(
            optimal_duration_minutes,
            best_start_hour,
            p_value = test.p_value,
            "Deep work window candidate"
        );

        DetectorOutcome::Found(vec![Candidate {
            pattern_type: PatternType::DeepWorkWindow,
            description: format!(
                "Sessions of {}+ minutes starting around {} are your most productive (mean rating {:.2} vs {:.2} for sessions under {} minutes)",
                optimal_duration_minutes,
                hour_label(best_start_hour),
                test.mean_a,
                test.mean_b,
                config.deep_work_min_minutes
            ),
            p_value: test.p_value,
            effect_size: test.cohens_d,
            supporting_sample_size: test.n_a + test.n_b,
            recommendation: format!(
                "Block {}-minute focus sessions starting at {}",
                optimal_duration_minutes,
                hour_label(best_start_hour)
            ),
            evidence: PatternEvidence::DeepWork {
                optimal_duration_minutes,
                best_start_hour,
                long_mean: test.mean_a,
                short_mean: test.mean_b,
                qualifying_sessions: long.len(),
            },
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::row;
    use super::*;

    fn detect(rows: &[FeatureRow]) -> DetectorOutcome {
        let config = AnalysisConfig::default();
        DeepWorkDetector::new().detect(rows, &DetectorContext { config: &config })
    }

    #[test]
    fn test_bucket_layout() {
        let config = AnalysisConfig::default();
        let count = bucket_count(&config);
        assert_eq!(count, 7);
        assert_eq!(bucket_index(60.0, &config, count), 0);
        assert_eq!(bucket_index(89.9, &config, count), 0);
        assert_eq!(bucket_index(90.0, &config, count), 1);
        assert_eq!(bucket_index(600.0, &config, count), 6);
        assert_eq!(bucket_lower_bound(6, &config), 240);
    }

    #[test]
    fn test_long_morning_sessions_win() {
        let mut rows = Vec::new();
        for i in 0..12 {
            // 90-minute sessions at 9am rate well; 120-minute ones at 2pm less so
            rows.push(row(i * 4, 9, 95.0, Some(if i % 2 == 0 { 5 } else { 4 })));
            rows.push(row(i * 4 + 1, 14, 125.0, Some(4)));
            rows.push(row(i * 4 + 2, 11, 30.0, Some(if i % 2 == 0 { 2 } else { 3 })));
            rows.push(row(i * 4 + 3, 16, 20.0, Some(2)));
        }

        let DetectorOutcome::Found(candidates) = detect(&rows) else {
            panic!("expected a deep work window");
        };
        let candidate = &candidates[0];
        assert!(candidate.p_value < 0.001);
        assert_eq!(candidate.supporting_sample_size, 48);
        match &candidate.evidence {
            PatternEvidence::DeepWork {
                optimal_duration_minutes,
                best_start_hour,
                qualifying_sessions,
                ..
            } => {
                assert_eq!(*optimal_duration_minutes, 90);
                assert_eq!(*best_start_hour, 9);
                assert_eq!(*qualifying_sessions, 24);
            }
            other => panic!("unexpected evidence: {other:?}"),
        }
        assert_eq!(
            candidate.recommendation,
            "Block 90-minute focus sessions starting at 9am"
        );
    }

    #[test]
    fn test_too_few_long_sessions_abstains() {
        let rows = vec![
            row(0, 9, 90.0, Some(5)),
            row(1, 9, 90.0, Some(5)),
            row(2, 10, 30.0, Some(2)),
            row(3, 10, 30.0, Some(3)),
        ];
        assert!(matches!(detect(&rows), DetectorOutcome::Abstained(_)));
    }

    #[test]
    fn test_long_sessions_rated_lower_abstains() {
        let rows: Vec<FeatureRow> = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    row(i, 9, 90.0, Some(2 + (i % 4 == 0) as u8))
                } else {
                    row(i, 10, 30.0, Some(4 + (i % 3 == 0) as u8))
                }
            })
            .collect();
        assert!(matches!(detect(&rows), DetectorOutcome::Abstained(_)));
    }
}

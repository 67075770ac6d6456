//! Project affinity analysis.
//!
//! Finds projects that go noticeably better in a particular part of the day.
//! The per-project scan is public because schedule suggestions are built
//! from the same pairings.

use super::{
    bonferroni, hour_label, rated, split_ratings, Bucket, Candidate, DetectorContext,
    DetectorOutcome, PatternDetector,
};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::{mean, welch_t_test, TwoSampleTest};
use crate::types::{Daypart, PatternEvidence, PatternType};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Rated sessions a project needs before it is considered.
pub const MIN_PROJECT_SESSIONS: usize = 3;
/// Rated sessions a project/daypart pair needs.
pub const MIN_PAIR_SESSIONS: usize = 2;

/// A project's best part of the day, tested against all other sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPairing {
    pub project_id: String,
    pub daypart: Daypart,
    /// Highest-rated hour inside the daypart
    pub best_hour: u8,
    /// Pair mean minus the global mean
    pub lift: f64,
    /// Pair sessions vs every other rated session
    pub test: TwoSampleTest,
}

/// Result of scanning every project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffinityScan {
    /// Project/daypart pairs with enough sessions to be compared
    pub pairs_evaluated: usize,
    /// Best positive pairing per project, ordered by project id
    pub pairings: Vec<ProjectPairing>,
}

/// Find each project's best daypart.
pub fn scan_projects(rows: &[FeatureRow]) -> AffinityScan {
    let rated = rated(rows);
    let Some(global_mean) = mean(&rated.iter().map(|(_, r)| *r).collect::<Vec<_>>()) else {
        return AffinityScan::default();
    };

    let mut by_project: BTreeMap<&str, Vec<(&FeatureRow, f64)>> = BTreeMap::new();
    for (row, rating) in &rated {
        if let Some(project) = row.project_id.as_deref() {
            by_project.entry(project).or_default().push((*row, *rating));
        }
    }

    let mut scan = AffinityScan::default();
    for (project, sessions) in by_project {
        if sessions.len() < MIN_PROJECT_SESSIONS {
            continue;
        }

        let mut buckets: BTreeMap<Daypart, Bucket> = BTreeMap::new();
        for (row, rating) in &sessions {
            buckets
                .entry(Daypart::from_hour(row.hour_of_day))
                .or_default()
                .add(*rating);
        }

        let mut best: Option<(Daypart, f64)> = None;
        for (daypart, bucket) in &buckets {
            if bucket.count < MIN_PAIR_SESSIONS {
                continue;
            }
            scan.pairs_evaluated += 1;
            let Some(lift) = bucket.mean().map(|m| m - global_mean) else {
                continue;
            };
            if lift <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_lift)) if best_lift >= lift => {}
                _ => best = Some((*daypart, lift)),
            }
        }

        let Some((daypart, lift)) = best else {
            continue;
        };
        let in_pair = |row: &FeatureRow| {
            row.project_id.as_deref() == Some(project)
                && Daypart::from_hour(row.hour_of_day) == daypart
        };
        let (pair, rest) = split_ratings(&rated, &in_pair);
        let Some(test) = welch_t_test(&pair, &rest) else {
            continue;
        };

        let mut hours = [Bucket::default(); 24];
        for (row, rating) in sessions.iter().filter(|(row, _)| in_pair(row)) {
            hours[row.hour_of_day as usize % 24].add(*rating);
        }
        let best_hour = hours
            .iter()
            .enumerate()
            .filter_map(|(hour, bucket)| bucket.mean().map(|m| (hour as u8, m)))
            .fold(None::<(u8, f64)>, |best, (hour, m)| match best {
                Some((_, best_mean)) if best_mean >= m => best,
                _ => Some((hour, m)),
            })
            .map_or(0, |(hour, _)| hour);

        scan.pairings.push(ProjectPairing {
            project_id: project.to_string(),
            daypart,
            best_hour,
            lift,
            test,
        });
    }
    scan
}

/// Detector for project/time-of-day affinity.
pub struct ProjectAffinityDetector;

impl ProjectAffinityDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProjectAffinityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for ProjectAffinityDetector {
    fn name(&self) -> &str {
        "core.project_affinity"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::ProjectAffinity
    }

    fn detect(&self, rows: &[FeatureRow], _ctx: &DetectorContext) -> DetectorOutcome {
        let scan = scan_projects(rows);
        if scan.pairs_evaluated == 0 {
            return DetectorOutcome::abstain(format!(
                "no project has {} rated sessions in one part of the day",
                MIN_PAIR_SESSIONS
            ));
        }

        // Strongest lift wins; ties go to the first project id.
        let strongest = scan
            .pairings
            .iter()
            .filter(|p| p.test.mean_difference() > 0.0)
            .fold(None::<&ProjectPairing>, |best, p| match best {
                Some(b) if b.lift.partial_cmp(&p.lift) != Some(Ordering::Less) => Some(b),
                _ => Some(p),
            });
        let Some(pairing) = strongest else {
            return DetectorOutcome::abstain("no project beats its baseline in any part of the day");
        };

        let test = &pairing.test;
        DetectorOutcome::Found(vec![Candidate {
            pattern_type: PatternType::ProjectAffinity,
            description: format!(
                "{} goes best in the {} (mean rating {:.2} vs {:.2} for other sessions)",
                pairing.project_id,
                pairing.daypart.label(),
                test.mean_a,
                test.mean_b
            ),
            p_value: bonferroni(test.p_value, scan.pairs_evaluated),
            effect_size: test.cohens_d,
            supporting_sample_size: test.n_a + test.n_b,
            recommendation: format!(
                "Schedule {} in the {} (around {})",
                pairing.project_id,
                pairing.daypart.label(),
                hour_label(pairing.best_hour)
            ),
            evidence: PatternEvidence::ProjectAffinity {
                project_id: pairing.project_id.clone(),
                daypart: pairing.daypart,
                best_hour: pairing.best_hour,
                pair_mean: test.mean_a,
                baseline_mean: test.mean_b,
            },
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::row;
    use super::*;
    use crate::config::AnalysisConfig;

    fn project_row(idx: usize, project: &str, hour: u8, rating: u8) -> FeatureRow {
        let mut r = row(idx, hour, 50.0, Some(rating));
        r.project_id = Some(project.to_string());
        r
    }

    fn sample() -> Vec<FeatureRow> {
        let mut rows = Vec::new();
        for i in 0..6 {
            let base = i * 4;
            rows.push(project_row(base, "alpha", 9, if i % 2 == 0 { 5 } else { 4 }));
            rows.push(project_row(base + 1, "alpha", 14, 2));
            rows.push(project_row(base + 2, "beta", 10, 3));
            rows.push(project_row(base + 3, "beta", 15, 3));
        }
        rows
    }

    #[test]
    fn test_scan_finds_best_daypart_per_project() {
        let scan = scan_projects(&sample());
        assert_eq!(scan.pairs_evaluated, 4);
        // beta never beats the global mean of 3.125
        assert_eq!(scan.pairings.len(), 1);
        let alpha = &scan.pairings[0];
        assert_eq!(alpha.project_id, "alpha");
        assert_eq!(alpha.daypart, Daypart::Morning);
        assert_eq!(alpha.best_hour, 9);
        assert!((alpha.lift - 1.375).abs() < 1e-12);
    }

    #[test]
    fn test_detector_corrects_for_pairs_evaluated() {
        let config = AnalysisConfig::default();
        let rows = sample();
        let outcome =
            ProjectAffinityDetector::new().detect(&rows, &DetectorContext { config: &config });
        let DetectorOutcome::Found(candidates) = outcome else {
            panic!("expected an affinity");
        };
        let candidate = &candidates[0];
        let raw = scan_projects(&rows).pairings[0].test.p_value;
        assert_eq!(candidate.p_value, (raw * 4.0).min(1.0));
        assert_eq!(candidate.supporting_sample_size, 24);
        assert_eq!(
            candidate.recommendation,
            "Schedule alpha in the morning (around 9am)"
        );
    }

    #[test]
    fn test_small_projects_ignored() {
        let rows = vec![
            project_row(0, "tiny", 9, 5),
            project_row(1, "tiny", 9, 5),
            project_row(2, "other", 14, 2),
        ];
        let scan = scan_projects(&rows);
        assert_eq!(scan.pairs_evaluated, 0);
        assert!(scan.pairings.is_empty());
    }
}

//! Productivity Peak Detector
//!
//! Finds the hours (and the weekday) where self-rated productivity is
//! highest.
//!
//! ## Procedure
//!
//! 1. Mean rating per populated hour of day, forming a sparse curve.
//! 2. Local maxima of that curve. A run of equal means (plateau) counts as a
//!    single peak centred on its middle hour; the ends of the curve count
//!    when they beat their only neighbour.
//! 3. Peaks below `peak_min_prominence` or with fewer than
//!    `min_bucket_sessions` sessions are dropped; at most `max_peaks` remain.
//! 4. Each peak's sessions are compared to every other rated session with
//!    Welch's t-test. The best weekday gets the same treatment.
//! 5. p-values are Bonferroni-corrected over every bucket the search
//!    looked at (populated hours plus eligible weekdays), since the tested
//!    peaks were picked as the best of those buckets.
//!
//! A flat curve (identical means everywhere) yields no peak at all.

use super::{
    bonferroni, day_name, hour_label, hour_range_label, rated, split_ratings, spread, Bucket,
    Candidate, DetectorContext, DetectorOutcome, PatternDetector,
};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::{welch_t_test, TwoSampleTest};
use crate::types::{PatternEvidence, PatternType};
use std::cmp::Ordering;

/// Means closer than this are treated as equal.
const FLAT_TOLERANCE: f64 = 1e-9;

/// A local maximum of a curve, as a run of indices `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePeak {
    pub start: usize,
    pub end: usize,
    /// Height above the higher of the two surrounding bases
    pub prominence: f64,
}

impl CurvePeak {
    /// Middle index of the plateau.
    pub fn center(&self) -> usize {
        (self.start + self.end) / 2
    }
}

/// Locate local maxima with at least `min_prominence`.
pub fn find_peaks(values: &[f64], min_prominence: f64) -> Vec<CurvePeak> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 2 {
        return peaks;
    }

    let mut i = 0;
    while i < n {
        let height = values[i];
        let mut j = i;
        while j + 1 < n && (values[j + 1] - height).abs() <= FLAT_TOLERANCE {
            j += 1;
        }

        let rises_from_left = i == 0 || values[i - 1] < height - FLAT_TOLERANCE;
        let falls_to_right = j == n - 1 || values[j + 1] < height - FLAT_TOLERANCE;
        let spans_curve = i == 0 && j == n - 1;

        if rises_from_left && falls_to_right && !spans_curve {
            let prominence = prominence(values, i, j);
            if prominence + FLAT_TOLERANCE >= min_prominence {
                peaks.push(CurvePeak {
                    start: i,
                    end: j,
                    prominence,
                });
            }
        }
        i = j + 1;
    }
    peaks
}

fn prominence(values: &[f64], start: usize, end: usize) -> f64 {
    let height = values[start];
    let lowest = |acc: Option<f64>, v: &f64| Some(acc.map_or(*v, |a: f64| a.min(*v)));

    // Walk outwards until the curve climbs above the peak (equal heights pass).
    let left_base = values[..start]
        .iter()
        .rev()
        .take_while(|v| **v <= height + FLAT_TOLERANCE)
        .fold(None, lowest);
    let right_base = values[end + 1..]
        .iter()
        .take_while(|v| **v <= height + FLAT_TOLERANCE)
        .fold(None, lowest);

    let base = match (left_base, right_base) {
        (Some(l), Some(r)) => l.max(r),
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (None, None) => height,
    };
    height - base
}

#[derive(Debug, Clone, Copy)]
struct CurvePoint {
    key: u8,
    mean: f64,
    sessions: usize,
}

fn curve(buckets: &[Bucket]) -> Vec<CurvePoint> {
    buckets
        .iter()
        .enumerate()
        .filter_map(|(key, bucket)| {
            bucket.mean().map(|mean| CurvePoint {
                key: key as u8,
                mean,
                sessions: bucket.count,
            })
        })
        .collect()
}

enum PeakFinding {
    Hour {
        peak_hour: u8,
        window_start: u8,
        window_end: u8,
        prominence: f64,
        test: TwoSampleTest,
    },
    Day {
        day: u8,
        test: TwoSampleTest,
    },
}

/// Detector for hourly and weekday productivity peaks.
pub struct PeakProductivityDetector;

impl PeakProductivityDetector {
    pub fn new() -> Self {
        Self
    }

    fn hourly_findings(
        rated: &[(&FeatureRow, f64)],
        points: &[CurvePoint],
        ctx: &DetectorContext,
    ) -> Vec<PeakFinding> {
        let config = ctx.config;
        let means: Vec<f64> = points.iter().map(|p| p.mean).collect();

        let mut peaks: Vec<CurvePeak> = find_peaks(&means, config.peak_min_prominence)
            .into_iter()
            .filter(|peak| {
                points[peak.start..=peak.end]
                    .iter()
                    .map(|p| p.sessions)
                    .sum::<usize>()
                    >= config.min_bucket_sessions
            })
            .collect();

        peaks.sort_by(|a, b| {
            b.prominence
                .partial_cmp(&a.prominence)
                .unwrap_or(Ordering::Equal)
                .then(a.start.cmp(&b.start))
        });
        peaks.truncate(config.max_peaks);

        let mut findings = Vec::new();
        for peak in peaks {
            let hours: Vec<u8> = points[peak.start..=peak.end]
                .iter()
                .map(|p| p.key)
                .collect();
            let (inside, outside) = split_ratings(rated, |row| hours.contains(&row.hour_of_day));

            match welch_t_test(&inside, &outside) {
                Some(test) if test.mean_difference() > 0.0 => findings.push(PeakFinding::Hour {
                    peak_hour: points[peak.center()].key,
                    window_start: hours[0],
                    window_end: hours[hours.len() - 1],
                    prominence: peak.prominence,
                    test,
                }),
                _ => tracing::debug!(
                    start_hour = hours[0],
                    "Hourly peak does not beat the remaining sessions"
                ),
            }
        }
        findings
    }

    /// Best weekday, if any, plus the number of weekdays it was picked from
    /// (0 when the search did not run).
    fn weekday_finding(
        rated: &[(&FeatureRow, f64)],
        points: &[CurvePoint],
        ctx: &DetectorContext,
    ) -> (usize, Option<PeakFinding>) {
        let eligible: Vec<&CurvePoint> = points
            .iter()
            .filter(|p| p.sessions >= ctx.config.min_bucket_sessions)
            .collect();
        if eligible.len() < 2 || spread(eligible.iter().map(|p| p.mean)) <= FLAT_TOLERANCE {
            return (0, None);
        }

        // Ties resolve to the earliest weekday.
        let Some(best) = eligible.iter().copied().fold(None::<&CurvePoint>, |best, p| match best {
            Some(b) if b.mean >= p.mean - FLAT_TOLERANCE => Some(b),
            _ => Some(p),
        }) else {
            return (0, None);
        };

        let (inside, outside) = split_ratings(rated, |row| row.day_of_week == best.key);
        let finding = welch_t_test(&inside, &outside)
            .filter(|test| test.mean_difference() > 0.0)
            .map(|test| PeakFinding::Day {
                day: best.key,
                test,
            });
        (eligible.len(), finding)
    }
}

impl Default for PeakProductivityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for PeakProductivityDetector {
    fn name(&self) -> &str {
        "core.peak_productivity"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::PeakProductivity
    }

    fn detect(&self, rows: &[FeatureRow], ctx: &DetectorContext) -> DetectorOutcome {
        let rated = rated(rows);
        if rated.len() < 4 {
            return DetectorOutcome::abstain("fewer than four rated sessions");
        }

        let mut hourly = [Bucket::default(); 24];
        let mut daily = [Bucket::default(); 7];
        for (row, rating) in &rated {
            hourly[row.hour_of_day as usize % 24].add(*rating);
            daily[row.day_of_week as usize % 7].add(*rating);
        }
        let hour_points = curve(&hourly);
        let day_points = curve(&daily);

        let hourly_flat = spread(hour_points.iter().map(|p| p.mean)) <= FLAT_TOLERANCE;
        let daily_flat = spread(day_points.iter().map(|p| p.mean)) <= FLAT_TOLERANCE;
        if hourly_flat && daily_flat {
            return DetectorOutcome::abstain(
                "ratings are identical across every hour and weekday bucket",
            );
        }

        let (mut findings, hours_examined) = if hourly_flat {
            (Vec::new(), 0)
        } else {
            (
                Self::hourly_findings(&rated, &hour_points, ctx),
                hour_points.len(),
            )
        };
        let (days_examined, day_finding) = Self::weekday_finding(&rated, &day_points, ctx);
        findings.extend(day_finding);

        if findings.is_empty() {
            return DetectorOutcome::abstain("no hour or weekday stands out from its neighbours");
        }

        let tests = (hours_examined + days_examined).max(findings.len());
        tracing::debug!(
            hours_examined,
            days_examined,
            findings = findings.len(),
            "Correcting peak p-values"
        );
        let candidates = findings
            .into_iter()
            .map(|finding| match finding {
                PeakFinding::Hour {
                    peak_hour,
                    window_start,
                    window_end,
                    prominence,
                    test,
                } => {
                    let window = hour_range_label(window_start, window_end);
                    Candidate {
                        pattern_type: PatternType::PeakProductivity,
                        description: format!(
                            "Productivity peaks {} around {} (mean rating {:.2} vs {:.2} at other hours)",
                            window,
                            hour_label(peak_hour),
                            test.mean_a,
                            test.mean_b
                        ),
                        p_value: bonferroni(test.p_value, tests),
                        effect_size: test.cohens_d,
                        supporting_sample_size: test.n_a + test.n_b,
                        recommendation: format!(
                            "Protect {} for your most demanding work",
                            window
                        ),
                        evidence: PatternEvidence::PeakHour {
                            peak_hour,
                            window_start,
                            window_end,
                            prominence,
                            peak_mean: test.mean_a,
                            baseline_mean: test.mean_b,
                        },
                    }
                }
                PeakFinding::Day { day, test } => Candidate {
                    pattern_type: PatternType::PeakProductivity,
                    description: format!(
                        "{}s are your most productive day (mean rating {:.2} vs {:.2} on other days)",
                        day_name(day),
                        test.mean_a,
                        test.mean_b
                    ),
                    p_value: bonferroni(test.p_value, tests),
                    effect_size: test.cohens_d,
                    supporting_sample_size: test.n_a + test.n_b,
                    recommendation: format!("Save demanding work for {}s", day_name(day)),
                    evidence: PatternEvidence::PeakDay {
                        day_of_week: day,
                        day_mean: test.mean_a,
                        baseline_mean: test.mean_b,
                    },
                },
            })
            .collect();

        DetectorOutcome::Found(candidates)
    }
}

//! Personal work rhythm discovery.
//!
//! Clusters sessions on (hour, duration, rating, energy) with k-means to
//! name the rhythms. k-means here is fully deterministic: features are
//! z-scored, centroids are seeded by farthest-point traversal starting from
//! the point nearest the mean, and every tie resolves to the lowest index.
//!
//! Whether rhythms differ in productivity is tested on a second clustering
//! that leaves the rating coordinate out. Ratings shape the profile
//! clusters, so an ANOVA of ratings across those clusters would reject on
//! any data.

use super::{hour_label, Candidate, DetectorContext, DetectorOutcome, PatternDetector};
use crate::analytics::features::FeatureRow;
use crate::analytics::stats::{mean, one_way_anova, population_std_dev};
use crate::types::{Daypart, PatternEvidence, PatternType, RhythmProfile};

const DIMENSIONS: usize = 4;
/// Index of the rating coordinate in a [`Point`].
const RATING: usize = 2;
const MIN_SESSIONS: usize = 15;
/// Silhouette is quadratic; larger inputs are scored on a stride sample.
const SILHOUETTE_SAMPLE: usize = 1000;
const EPSILON: f64 = 1e-12;

type Point = [f64; DIMENSIONS];

/// Z-score every dimension. Constant dimensions contribute nothing; `None`
/// when all of them are constant.
fn standardize(raw: &[Point]) -> Option<Vec<Point>> {
    let mut means = [0.0; DIMENSIONS];
    let mut stds = [0.0; DIMENSIONS];
    for d in 0..DIMENSIONS {
        let column: Vec<f64> = raw.iter().map(|p| p[d]).collect();
        means[d] = mean(&column)?;
        stds[d] = population_std_dev(&column)?;
    }
    if stds.iter().all(|s| *s <= EPSILON) {
        return None;
    }

    Some(
        raw.iter()
            .map(|p| {
                let mut z = [0.0; DIMENSIONS];
                for d in 0..DIMENSIONS {
                    if stds[d] > EPSILON {
                        z[d] = (p[d] - means[d]) / stds[d];
                    }
                }
                z
            })
            .collect(),
    )
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}

fn mean_point<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Option<Point> {
    let mut sum = [0.0; DIMENSIONS];
    let mut count = 0usize;
    for point in points {
        for d in 0..DIMENSIONS {
            sum[d] += point[d];
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for value in &mut sum {
        *value /= count as f64;
    }
    Some(sum)
}

/// Farthest-point seeding. Returns fewer than `k` centroids when the data
/// has fewer than `k` distinct points.
fn seed_centroids(points: &[Point], k: usize) -> Vec<Point> {
    let Some(center) = mean_point(points) else {
        return Vec::new();
    };

    let mut first = 0;
    let mut first_distance = f64::INFINITY;
    for (idx, point) in points.iter().enumerate() {
        let distance = squared_distance(point, &center);
        if distance < first_distance {
            first = idx;
            first_distance = distance;
        }
    }

    let mut centroids = vec![points[first]];
    let mut gaps: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[first]))
        .collect();

    while centroids.len() < k {
        let mut next = 0;
        let mut next_gap = -1.0;
        for (idx, gap) in gaps.iter().enumerate() {
            if *gap > next_gap {
                next = idx;
                next_gap = *gap;
            }
        }
        if next_gap <= EPSILON {
            break;
        }
        let chosen = points[next];
        centroids.push(chosen);
        for (gap, point) in gaps.iter_mut().zip(points) {
            *gap = gap.min(squared_distance(point, &chosen));
        }
    }
    centroids
}

/// Lloyd's algorithm. `None` on non-convergence or an empty cluster.
fn kmeans(points: &[Point], k: usize, max_iterations: usize) -> Option<Vec<usize>> {
    let mut centroids = seed_centroids(points, k);
    if centroids.len() < k {
        return None;
    }

    let mut assignments = vec![usize::MAX; points.len()];
    for _ in 0..max_iterations {
        let mut changed = false;
        for (assignment, point) in assignments.iter_mut().zip(points) {
            let cluster = nearest(point, &centroids);
            if *assignment != cluster {
                *assignment = cluster;
                changed = true;
            }
        }

        if !changed {
            let populated = (0..k).all(|c| assignments.contains(&c));
            return populated.then_some(assignments);
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            let members = points
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == cluster)
                .map(|(p, _)| p);
            // An emptied cluster keeps its previous centroid
            if let Some(updated) = mean_point(members) {
                *centroid = updated;
            }
        }
    }
    None
}

/// Mean silhouette coefficient over a stride sample of at most
/// [`SILHOUETTE_SAMPLE`] points.
fn silhouette(points: &[Point], assignments: &[usize], k: usize) -> Option<f64> {
    if points.is_empty() || k < 2 {
        return None;
    }
    let stride = (points.len() + SILHOUETTE_SAMPLE - 1) / SILHOUETTE_SAMPLE;
    let sample: Vec<usize> = (0..points.len()).step_by(stride.max(1)).collect();

    let mut total = 0.0;
    for &i in &sample {
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for &j in &sample {
            if i == j {
                continue;
            }
            sums[assignments[j]] += squared_distance(&points[i], &points[j]).sqrt();
            counts[assignments[j]] += 1;
        }

        let own = assignments[i];
        let score = if counts[own] == 0 {
            0.0
        } else {
            let a = sums[own] / counts[own] as f64;
            let b = (0..k)
                .filter(|c| *c != own && counts[*c] > 0)
                .map(|c| sums[c] / counts[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let scale = a.max(b);
            if !b.is_finite() || scale <= EPSILON {
                0.0
            } else {
                (b - a) / scale
            }
        };
        total += score;
    }
    Some(total / sample.len() as f64)
}

/// Best-silhouette clustering for k in `min_k..=max_k`, as
/// `(k, assignments, silhouette)`. A k that fails to converge is skipped.
fn best_clustering(
    points: &[Point],
    min_k: usize,
    max_k: usize,
    max_iterations: usize,
) -> Option<(usize, Vec<usize>, f64)> {
    let mut best: Option<(usize, Vec<usize>, f64)> = None;
    for k in min_k..=max_k {
        let Some(assignments) = kmeans(points, k, max_iterations) else {
            tracing::debug!(k, "k-means did not converge to k populated clusters");
            continue;
        };
        let Some(score) = silhouette(points, &assignments, k) else {
            continue;
        };
        tracing::debug!(k, silhouette = score, "Scored rhythm clustering");
        if best
            .as_ref()
            .map_or(true, |(_, _, best_score)| score > *best_score + EPSILON)
        {
            best = Some((k, assignments, score));
        }
    }
    best
}

/// The same points with the rating coordinate zeroed.
fn without_rating(points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .map(|p| {
            let mut blind = *p;
            blind[RATING] = 0.0;
            blind
        })
        .collect()
}

/// Name a cluster from its centroid, e.g. "long morning sessions".
pub fn profile_name(mean_hour: f64, mean_duration_minutes: f64) -> String {
    let hour = (mean_hour.round() as i64).rem_euclid(24) as u8;
    let daypart = Daypart::from_hour(hour);
    let (length, unit) = if mean_duration_minutes < 45.0 {
        ("short", "bursts")
    } else if mean_duration_minutes < 90.0 {
        ("medium-length", "sessions")
    } else {
        ("long", "sessions")
    };
    format!("{} {} {}", length, daypart.label(), unit)
}

struct Usable<'a> {
    row: &'a FeatureRow,
    rating: f64,
    energy: f64,
}

fn profile(members: &[&Usable]) -> Option<RhythmProfile> {
    let hours: Vec<f64> = members.iter().map(|u| u.row.hour_of_day as f64).collect();
    let durations: Vec<f64> = members.iter().map(|u| u.row.duration_minutes).collect();
    let ratings: Vec<f64> = members.iter().map(|u| u.rating).collect();
    let energies: Vec<f64> = members.iter().map(|u| u.energy).collect();

    let mean_hour = mean(&hours)?;
    let mean_duration_minutes = mean(&durations)?;
    Some(RhythmProfile {
        name: profile_name(mean_hour, mean_duration_minutes),
        sessions: members.len(),
        mean_hour,
        mean_duration_minutes,
        mean_rating: mean(&ratings)?,
        mean_energy: mean(&energies)?,
    })
}

/// Detector for recurring session archetypes.
pub struct WorkRhythmDetector;

impl WorkRhythmDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WorkRhythmDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for WorkRhythmDetector {
    fn name(&self) -> &str {
        "core.work_rhythm"
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::WorkRhythm
    }

    fn detect(&self, rows: &[FeatureRow], ctx: &DetectorContext) -> DetectorOutcome {
        let config = ctx.config;
        let usable: Vec<Usable> = rows
            .iter()
            .filter_map(|row| {
                Some(Usable {
                    row,
                    rating: row.rating()?,
                    energy: row.energy()?,
                })
            })
            .collect();

        if usable.len() < MIN_SESSIONS {
            return DetectorOutcome::abstain(format!(
                "{} sessions carry both rating and energy; {} needed",
                usable.len(),
                MIN_SESSIONS
            ));
        }

        let raw: Vec<Point> = usable
            .iter()
            .map(|u| {
                [
                    u.row.hour_of_day as f64,
                    u.row.duration_minutes,
                    u.rating,
                    u.energy,
                ]
            })
            .collect();
        let Some(points) = standardize(&raw) else {
            return DetectorOutcome::abstain("every clustering feature is constant");
        };

        let min_k = config.rhythm_min_clusters;
        let max_k = config.rhythm_max_clusters.min(usable.len() / 3);
        let iterations = config.rhythm_max_iterations;

        let Some((k, assignments, silhouette)) = best_clustering(&points, min_k, max_k, iterations)
        else {
            return DetectorOutcome::abstain("no stable clustering found");
        };
        let Some((test_k, test_assignments, _)) =
            best_clustering(&without_rating(&points), min_k, max_k, iterations)
        else {
            return DetectorOutcome::abstain("hour, duration and energy form no stable clusters");
        };

        let mut members: Vec<Vec<&Usable>> = vec![Vec::new(); k];
        for (entry, cluster) in usable.iter().zip(&assignments) {
            members[*cluster].push(entry);
        }

        let mut groups: Vec<Vec<f64>> = vec![Vec::new(); test_k];
        for (entry, cluster) in usable.iter().zip(&test_assignments) {
            groups[*cluster].push(entry.rating);
        }
        let Some(anova) = one_way_anova(&groups) else {
            return DetectorOutcome::abstain("ratings do not vary across rhythms");
        };

        let Some(profiles) = members
            .iter()
            .map(|m| profile(m))
            .collect::<Option<Vec<RhythmProfile>>>()
        else {
            return DetectorOutcome::abstain("empty rhythm cluster");
        };

        let Some(top) = profiles.iter().fold(None::<&RhythmProfile>, |best, p| match best {
            Some(b) if b.mean_rating >= p.mean_rating => Some(b),
            _ => Some(p),
        }) else {
            return DetectorOutcome::abstain("empty rhythm cluster");
        };

        let top_hour = (top.mean_hour.round() as i64).rem_euclid(24) as u8;
        let description = format!(
            "Your sessions fall into {} rhythms; {} rate highest (mean rating {:.2})",
            k, top.name, top.mean_rating
        );
        let recommendation = format!(
            "Plan more {}: about {:.0} minutes around {}",
            top.name,
            top.mean_duration_minutes,
            hour_label(top_hour)
        );

        DetectorOutcome::Found(vec![Candidate {
            pattern_type: PatternType::WorkRhythm,
            description,
            p_value: anova.p_value,
            effect_size: anova.eta_squared,
            supporting_sample_size: usable.len(),
            recommendation,
            evidence: PatternEvidence::Rhythm {
                clusters: k,
                silhouette,
                profiles,
            },
        }])
    }
}

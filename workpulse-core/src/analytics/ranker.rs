//! Insight ranking.

use crate::types::PatternResult;
use std::cmp::Ordering;

/// Total order used for reports: confidence tier (strongest first), then
/// effect magnitude, then pattern type name, then description.
pub fn compare(a: &PatternResult, b: &PatternResult) -> Ordering {
    b.confidence_tier
        .cmp(&a.confidence_tier)
        .then_with(|| {
            b.effect_size
                .abs()
                .partial_cmp(&a.effect_size.abs())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.pattern_type.as_str().cmp(b.pattern_type.as_str()))
        .then_with(|| a.description.cmp(&b.description))
}

/// Sort patterns into report order.
pub fn rank(mut patterns: Vec<PatternResult>) -> Vec<PatternResult> {
    patterns.sort_by(compare);
    patterns
}

/// Recommendations of the top-ranked patterns, without repeats.
pub fn top_insights(ranked: &[PatternResult], limit: usize) -> Vec<String> {
    let mut insights: Vec<String> = Vec::with_capacity(limit);
    for pattern in ranked {
        if insights.len() >= limit {
            break;
        }
        if !insights.contains(&pattern.recommendation) {
            insights.push(pattern.recommendation.clone());
        }
    }
    insights
}

//! Report encodings.
//!
//! Every encoding is rendered from the same in-memory value, so JSON, CSV,
//! text and Markdown never disagree about what was found.

use super::trends::{TrendChange, TrendReport};
use crate::error::{Error, Result};
use crate::types::{AnalysisReport, DiagnosticOutcome, ScheduleSuggestion};
use std::fmt::Write as _;
use std::str::FromStr;

/// Output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Text,
    Markdown,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Text => "text",
            ReportFormat::Markdown => "markdown",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Escape a field value for CSV.
fn escape_field(value: &str) -> String {
    let needs_quoting =
        value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r');

    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Escape pipes so free text cannot break a Markdown table.
fn md_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

// ============================================
// Analysis report
// ============================================

/// Render a full analysis report.
pub fn render(report: &AnalysisReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Csv => Ok(report_csv(report)),
        ReportFormat::Text => Ok(report_text(report)),
        ReportFormat::Markdown => Ok(report_markdown(report)),
    }
}

fn report_csv(report: &AnalysisReport) -> String {
    let mut out = String::new();
    csv_row(
        &mut out,
        &[
            "generated_at",
            "data_quality_score",
            "coverage_days",
            "rank",
            "pattern_type",
            "confidence_tier",
            "p_value",
            "effect_size",
            "supporting_sample_size",
            "description",
            "recommendation",
        ]
        .map(String::from),
    );

    let generated_at = report.generated_at.to_rfc3339();
    for (idx, pattern) in report.patterns.iter().enumerate() {
        csv_row(
            &mut out,
            &[
                generated_at.clone(),
                format!("{:.1}", report.data_quality_score),
                report.coverage_days.to_string(),
                (idx + 1).to_string(),
                pattern.pattern_type.to_string(),
                pattern.confidence_tier.to_string(),
                format!("{:.6}", pattern.p_value),
                format!("{:.4}", pattern.effect_size),
                pattern.supporting_sample_size.to_string(),
                pattern.description.clone(),
                pattern.recommendation.clone(),
            ],
        );
    }
    out
}

fn report_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Productivity patterns, {} to {}",
        report.window.since, report.window.until
    );
    let _ = writeln!(
        out,
        "Data quality {:.0}/100: {} sessions over {} days, {} rated",
        report.data_quality_score,
        report.session_count,
        report.coverage_days,
        percent(report.completeness)
    );
    out.push('\n');

    if report.patterns.is_empty() {
        out.push_str("No statistically reliable patterns yet. Keep logging and rating sessions.\n");
    } else {
        for (idx, pattern) in report.patterns.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{} confidence] {}",
                idx + 1,
                pattern.confidence_tier.label(),
                pattern.description
            );
            let _ = writeln!(out, "   -> {}", pattern.recommendation);
            let _ = writeln!(
                out,
                "   p = {:.4}, effect = {:.2}, n = {}",
                pattern.p_value, pattern.effect_size, pattern.supporting_sample_size
            );
        }
    }

    if !report.insights.is_empty() {
        out.push_str("\nTop insights:\n");
        for insight in &report.insights {
            let _ = writeln!(out, "  - {}", insight);
        }
    }

    if !report.diagnostics.is_empty() {
        out.push_str("\nDiagnostics:\n");
        for entry in &report.diagnostics {
            let detail = match &entry.outcome {
                DiagnosticOutcome::Accepted {
                    p_value,
                    confidence_tier,
                } => format!("accepted ({}, p = {:.4})", confidence_tier.label(), p_value),
                DiagnosticOutcome::Rejected { reason } => format!("rejected: {}", reason),
                DiagnosticOutcome::Abstained { reason } => format!("abstained: {}", reason),
            };
            let _ = writeln!(out, "  {:<20} {}", entry.pattern_type.as_str(), detail);
        }
    }
    out
}

fn report_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Productivity patterns ({} to {})\n",
        report.window.since, report.window.until
    );
    let _ = writeln!(
        out,
        "**Data quality:** {:.0}/100 · {} sessions · {} days · {} rated\n",
        report.data_quality_score,
        report.session_count,
        report.coverage_days,
        percent(report.completeness)
    );

    out.push_str("## Patterns\n\n");
    if report.patterns.is_empty() {
        out.push_str("_No statistically reliable patterns yet._\n");
    } else {
        out.push_str("| # | Pattern | Confidence | p | Effect | n | Finding |\n");
        out.push_str("|---|---------|------------|---|--------|---|---------|\n");
        for (idx, pattern) in report.patterns.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.4} | {:.2} | {} | {} |",
                idx + 1,
                pattern.pattern_type,
                pattern.confidence_tier.label(),
                pattern.p_value,
                pattern.effect_size,
                pattern.supporting_sample_size,
                md_cell(&pattern.description)
            );
        }
    }

    if !report.insights.is_empty() {
        out.push_str("\n## Insights\n\n");
        for insight in &report.insights {
            let _ = writeln!(out, "- {}", insight);
        }
    }
    out
}

// ============================================
// Insights, schedule, trends
// ============================================

/// Render the insight list on its own.
pub fn render_insights(insights: &[String], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(insights)?),
        ReportFormat::Csv => {
            let mut out = String::new();
            csv_row(&mut out, &["rank".to_string(), "insight".to_string()]);
            for (idx, insight) in insights.iter().enumerate() {
                csv_row(&mut out, &[(idx + 1).to_string(), insight.clone()]);
            }
            Ok(out)
        }
        ReportFormat::Text | ReportFormat::Markdown => {
            if insights.is_empty() {
                return Ok("No insights yet. Keep logging and rating sessions.\n".to_string());
            }
            let mut out = String::new();
            if format == ReportFormat::Markdown {
                out.push_str("## Insights\n\n");
            }
            for (idx, insight) in insights.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", idx + 1, insight);
            }
            Ok(out)
        }
    }
}

/// Render schedule suggestions.
pub fn render_schedule(suggestions: &[ScheduleSuggestion], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(suggestions)?),
        ReportFormat::Csv => {
            let mut out = String::new();
            csv_row(
                &mut out,
                &["project_id", "suggested_hour", "confidence_tier", "rationale"]
                    .map(String::from),
            );
            for s in suggestions {
                csv_row(
                    &mut out,
                    &[
                        s.project_id.clone(),
                        s.suggested_hour.to_string(),
                        s.confidence_tier.to_string(),
                        s.rationale.clone(),
                    ],
                );
            }
            Ok(out)
        }
        ReportFormat::Text => {
            if suggestions.is_empty() {
                return Ok("No schedule suggestions yet.\n".to_string());
            }
            let mut out = String::new();
            for s in suggestions {
                let _ = writeln!(
                    out,
                    "{:02}:00  {:<20} [{}] {}",
                    s.suggested_hour,
                    s.project_id,
                    s.confidence_tier.label(),
                    s.rationale
                );
            }
            Ok(out)
        }
        ReportFormat::Markdown => {
            let mut out = String::from("| Hour | Project | Confidence | Why |\n");
            out.push_str("|------|---------|------------|-----|\n");
            for s in suggestions {
                let _ = writeln!(
                    out,
                    "| {:02}:00 | {} | {} | {} |",
                    s.suggested_hour,
                    md_cell(&s.project_id),
                    s.confidence_tier.label(),
                    md_cell(&s.rationale)
                );
            }
            Ok(out)
        }
    }
}

fn rating_cell(rating: Option<f64>) -> String {
    rating.map_or_else(|| "-".to_string(), |r| format!("{:.2}", r))
}

/// Render a trend series.
pub fn render_trends(trends: &TrendReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(trends)?),
        ReportFormat::Csv => {
            let mut out = String::new();
            csv_row(
                &mut out,
                &[
                    "period_start",
                    "sessions",
                    "focus_minutes",
                    "mean_rating",
                    "switch_rate",
                ]
                .map(String::from),
            );
            for p in &trends.points {
                csv_row(
                    &mut out,
                    &[
                        p.period_start.to_string(),
                        p.sessions.to_string(),
                        format!("{:.1}", p.focus_minutes),
                        p.mean_rating.map(|r| format!("{:.4}", r)).unwrap_or_default(),
                        format!("{:.4}", p.switch_rate),
                    ],
                );
            }
            Ok(out)
        }
        ReportFormat::Text | ReportFormat::Markdown => {
            let markdown = format == ReportFormat::Markdown;
            let mut out = String::new();
            if markdown {
                let _ = writeln!(out, "## Trends by {}\n", trends.granularity.as_str());
                out.push_str("| Period | Sessions | Focus (min) | Rating | Switch rate |\n");
                out.push_str("|--------|----------|-------------|--------|-------------|\n");
            } else {
                let _ = writeln!(
                    out,
                    "Trends by {}, {} to {}",
                    trends.granularity.as_str(),
                    trends.window.since,
                    trends.window.until
                );
                let _ = writeln!(
                    out,
                    "{:<12} {:>8} {:>12} {:>8} {:>8}",
                    "period", "sessions", "focus (min)", "rating", "switch"
                );
            }
            for p in &trends.points {
                if markdown {
                    let _ = writeln!(
                        out,
                        "| {} | {} | {:.0} | {} | {} |",
                        p.period_start,
                        p.sessions,
                        p.focus_minutes,
                        rating_cell(p.mean_rating),
                        percent(p.switch_rate)
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "{:<12} {:>8} {:>12.0} {:>8} {:>8}",
                        p.period_start.to_string(),
                        p.sessions,
                        p.focus_minutes,
                        rating_cell(p.mean_rating),
                        percent(p.switch_rate)
                    );
                }
            }
            if let Some(change) = &trends.change {
                let rating = change
                    .mean_rating_delta
                    .map_or_else(|| "n/a".to_string(), |d| format!("{:+.2}", d));
                let _ = writeln!(
                    out,
                    "\nLatest {} vs previous: sessions {}, focus {}, rating {}",
                    trends.granularity.as_str(),
                    TrendChange::format_delta(change.sessions_delta_pct),
                    TrendChange::format_delta(change.focus_minutes_delta_pct),
                    rating
                );
            }
            Ok(out)
        }
    }
}

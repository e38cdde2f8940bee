//! Rendering of analysis reports.

use std::fmt::Write;

use copair_core::{CopairError, OutputFormat};

use crate::pipeline::AnalysisReport;
use crate::ranking::Ranking;

/// Render `report` in the requested format.
///
/// # Errors
///
/// Returns [`CopairError::Serialization`] if JSON encoding fails.
///
/// # Examples
///
/// ```
/// use copair_core::{OutputFormat, QuotaStatus};
/// use copair_pulse::pipeline::AnalysisReport;
/// use copair_pulse::report::render;
///
/// let report = AnalysisReport {
///     repository: "o/r".into(),
///     quota: QuotaStatus { remaining: 60, limit: 60 },
///     commits_analyzed: 1,
///     bad_commits: 0,
///     failed_commits: 0,
///     contributors: 1,
///     ranking: None,
/// };
/// assert_eq!(render(&report, OutputFormat::Text).unwrap(), "No pairs found\n");
/// ```
pub fn render(report: &AnalysisReport, format: OutputFormat) -> Result<String, CopairError> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Markdown => Ok(render_markdown(report)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_text(report: &AnalysisReport) -> String {
    let Some(ranking) = &report.ranking else {
        return "No pairs found\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Top {} pairs based on common files:",
        ranking.pairs.len()
    );
    for pair in &ranking.pairs {
        let _ = writeln!(
            out,
            "{} and {}: {} score",
            pair.first.display_name(),
            pair.second.display_name(),
            pair.score
        );
    }
    let _ = writeln!(out);
    write_summary_lines(&mut out, ranking);
    out
}

fn write_summary_lines(out: &mut String, ranking: &Ranking) {
    let _ = writeln!(out, "Number of pairs: {}", ranking.summary.total_pairs);
    let _ = writeln!(
        out,
        "Median score: {}",
        format_score(ranking.summary.median_score)
    );
}

fn render_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Collaboration Pairs: `{}`\n", report.repository);
    let _ = writeln!(out, "- **Commits analyzed:** {}", report.commits_analyzed);
    let _ = writeln!(out, "- **Contributors:** {}", report.contributors);
    if report.bad_commits > 0 {
        let _ = writeln!(out, "- **Commits without author:** {}", report.bad_commits);
    }
    if report.failed_commits > 0 {
        let _ = writeln!(out, "- **Commits skipped after fetch errors:** {}", report.failed_commits);
    }

    let Some(ranking) = &report.ranking else {
        let _ = writeln!(out, "\nNo pairs found.");
        return out;
    };

    let _ = writeln!(out, "- **Pairs scored:** {}", ranking.summary.total_pairs);
    let _ = writeln!(
        out,
        "- **Median score:** {}\n",
        format_score(ranking.summary.median_score)
    );
    let _ = writeln!(out, "| Rank | Contributor A | Contributor B | Score |");
    let _ = writeln!(out, "|------|---------------|---------------|-------|");
    for pair in &ranking.pairs {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            pair.rank,
            escape_cell(pair.first.display_name()),
            escape_cell(pair.second.display_name()),
            pair.score
        );
    }
    out
}

/// Whole numbers print without a fractional part.
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score}")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

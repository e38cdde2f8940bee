//! Ranking and summary statistics over scored pairs.

use copair_core::Identity;
use serde::Serialize;

use crate::scoring::ScoreTable;

/// How many of the ranked pairs to report.
///
/// # Examples
///
/// ```
/// use copair_pulse::ranking::Selection;
///
/// assert_eq!(Selection::Top(3).count(10), 3);
/// assert_eq!(Selection::Top(30).count(10), 10);
/// assert_eq!(Selection::Percent(50).count(4), 2);
/// assert_eq!(Selection::Percent(1).count(4), 1);
/// assert_eq!(Selection::All.count(7), 7);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every pair.
    #[default]
    All,
    /// The K highest-scoring pairs.
    Top(usize),
    /// The given percentage (1-100) of pairs, rounded half up, at least one.
    Percent(u8),
}

impl Selection {
    /// Number of pairs to report out of `total`.
    pub fn count(self, total: usize) -> usize {
        match self {
            Selection::All => total,
            Selection::Top(k) => k.min(total),
            Selection::Percent(_) if total == 0 => 0,
            Selection::Percent(p) => {
                let p = usize::from(p.min(100));
                ((total * p + 50) / 100).clamp(1, total)
            }
        }
    }
}

/// One reported pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPair {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Member with the smaller email.
    pub first: Identity,
    /// Member with the larger email.
    pub second: Identity,
    /// Co-occurrence score.
    pub score: u64,
}

/// Statistics over all scored pairs, not just the reported ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of scored pairs.
    pub total_pairs: usize,
    /// Median score.
    pub median_score: f64,
}

/// Reported pairs plus summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    /// Pairs in rank order.
    pub pairs: Vec<RankedPair>,
    /// Summary over every scored pair.
    pub summary: Summary,
}

/// Rank `scores` and select the pairs to report.
///
/// Pairs are ordered by score descending; equal scores fall back to the pair
/// key (first email, then second email) ascending so output is stable
/// between runs. Returns `None` when there are no pairs.
///
/// # Examples
///
/// ```
/// use copair_core::{Identity, ScoringStrategy};
/// use copair_pulse::aggregate::ContributionTable;
/// use copair_pulse::ranking::{rank, Selection};
/// use copair_pulse::scoring::score_pairs;
///
/// let table = ContributionTable::new()
///     .with_counts(Identity::new("A", "a@x.io"), &[("x", 3)])
///     .with_counts(Identity::new("B", "b@x.io"), &[("x", 2)])
///     .with_counts(Identity::new("C", "c@x.io"), &[("x", 1)]);
/// let ranking = rank(&score_pairs(&table, ScoringStrategy::Auto), Selection::Top(1)).unwrap();
///
/// assert_eq!(ranking.pairs.len(), 1);
/// assert_eq!(ranking.pairs[0].score, 2);
/// assert_eq!(ranking.summary.total_pairs, 3);
/// assert_eq!(ranking.summary.median_score, 1.0);
/// ```
pub fn rank(scores: &ScoreTable, selection: Selection) -> Option<Ranking> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted: Vec<_> = scores.iter().collect();
    sorted.sort_by(|(pair_a, score_a), (pair_b, score_b)| {
        score_b.cmp(score_a).then_with(|| pair_a.cmp(pair_b))
    });

    let values: Vec<u64> = sorted.iter().map(|(_, score)| *score).collect();
    let summary = Summary {
        total_pairs: sorted.len(),
        median_score: median(&values)?,
    };

    let pairs = sorted
        .into_iter()
        .take(selection.count(summary.total_pairs))
        .enumerate()
        .map(|(i, (pair, score))| RankedPair {
            rank: i + 1,
            first: pair.first().clone(),
            second: pair.second().clone(),
            score,
        })
        .collect();

    Some(Ranking { pairs, summary })
}

/// Median of already sorted scores (either direction); `None` when empty.
///
/// Even counts average the two central elements at zero-based `n/2 - 1`
/// and `n/2`.
///
/// # Examples
///
/// ```
/// use copair_pulse::ranking::median;
///
/// assert_eq!(median(&[10, 8, 6, 4]), Some(7.0));
/// assert_eq!(median(&[10, 8, 6]), Some(8.0));
/// assert_eq!(median(&[]), None);
/// ```
pub fn median(sorted: &[u64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2] as f64),
        _ => Some((sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0),
    }
}

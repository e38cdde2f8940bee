//! Pairwise co-occurrence scoring.
//!
//! Scores every pair of contributors by the files they both touched:
//! `score(a, b) = Σ min(count_a(f), count_b(f))` over shared files `f`. The
//! minimum caps a file's weight at the less active contributor's count, so
//! one prolific author cannot inflate a pair on their own.

use std::collections::{BTreeMap, HashMap};

use copair_core::{Identity, ScoringStrategy, UnorderedPair};
use tracing::debug;

use crate::aggregate::{ContributionTable, Contributor};

/// Above this many contributors `Auto` switches to the inverted index.
const AUTO_INDEX_THRESHOLD: usize = 64;

/// Score for every unordered pair of contributors.
///
/// Holds no self pairs and each pair once; pairs without shared files are
/// present with score 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTable {
    scores: BTreeMap<UnorderedPair, u64>,
}

impl ScoreTable {
    /// Score for `a` and `b` in either order; `None` for a self pair or an
    /// unknown contributor.
    pub fn get(&self, a: &Identity, b: &Identity) -> Option<u64> {
        let pair = UnorderedPair::new(a.clone(), b.clone())?;
        self.scores.get(&pair).copied()
    }

    /// Pairs in canonical order with their scores.
    pub fn iter(&self) -> impl Iterator<Item = (&UnorderedPair, u64)> {
        self.scores.iter().map(|(pair, score)| (pair, *score))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the table has no pairs.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Score every pair of contributors in `table`.
///
/// # Examples
///
/// ```
/// use copair_core::{Identity, ScoringStrategy};
/// use copair_pulse::aggregate::ContributionTable;
/// use copair_pulse::scoring::score_pairs;
///
/// let a = Identity::new("A", "a@x.io");
/// let b = Identity::new("B", "b@x.io");
/// let table = ContributionTable::new()
///     .with_counts(a.clone(), &[("x", 3), ("y", 1)])
///     .with_counts(b.clone(), &[("x", 2), ("z", 1)]);
///
/// let scores = score_pairs(&table, ScoringStrategy::Auto);
/// assert_eq!(scores.get(&a, &b), Some(2));
/// ```
pub fn score_pairs(table: &ContributionTable, strategy: ScoringStrategy) -> ScoreTable {
    let use_index = match strategy {
        ScoringStrategy::Pairwise => false,
        ScoringStrategy::InvertedIndex => true,
        ScoringStrategy::Auto => table.len() > AUTO_INDEX_THRESHOLD,
    };
    debug!(contributors = table.len(), use_index, "scoring pairs");

    if use_index {
        score_inverted_index(table)
    } else {
        score_pairwise(table)
    }
}

/// Co-occurrence score of two contributors.
pub fn pair_score(a: &Contributor, b: &Contributor) -> u64 {
    let (small, large) = if a.files.len() <= b.files.len() {
        (a, b)
    } else {
        (b, a)
    };
    small
        .files
        .iter()
        .filter_map(|(path, count)| {
            large
                .files
                .get(path)
                .map(|other| u64::from((*count).min(*other)))
        })
        .sum()
}

fn score_pairwise(table: &ContributionTable) -> ScoreTable {
    let contributors: Vec<&Contributor> = table.contributors().collect();
    let mut scores = BTreeMap::new();

    for i in 0..contributors.len() {
        for j in (i + 1)..contributors.len() {
            let (a, b) = (contributors[i], contributors[j]);
            if let Some(pair) = UnorderedPair::new(a.identity.clone(), b.identity.clone()) {
                scores.insert(pair, pair_score(a, b));
            }
        }
    }

    ScoreTable { scores }
}

fn score_inverted_index(table: &ContributionTable) -> ScoreTable {
    let contributors: Vec<&Contributor> = table.contributors().collect();

    // file -> (contributor index, count), indices ascending
    let mut index: HashMap<&str, Vec<(usize, u32)>> = HashMap::new();
    for (i, contributor) in contributors.iter().enumerate() {
        for (path, count) in &contributor.files {
            index.entry(path.as_str()).or_default().push((i, *count));
        }
    }

    let mut totals: HashMap<(usize, usize), u64> = HashMap::new();
    for touching in index.values() {
        for (x, &(i, count_i)) in touching.iter().enumerate() {
            for &(j, count_j) in &touching[x + 1..] {
                *totals.entry((i, j)).or_default() += u64::from(count_i.min(count_j));
            }
        }
    }

    let mut scores = BTreeMap::new();
    for i in 0..contributors.len() {
        for j in (i + 1)..contributors.len() {
            let pair = UnorderedPair::new(
                contributors[i].identity.clone(),
                contributors[j].identity.clone(),
            );
            if let Some(pair) = pair {
                scores.insert(pair, totals.get(&(i, j)).copied().unwrap_or(0));
            }
        }
    }

    ScoreTable { scores }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(email: &str) -> Identity {
        Identity::new(email.split('@').next().unwrap_or(email), email)
    }

    const STRATEGIES: [ScoringStrategy; 3] = [
        ScoringStrategy::Auto,
        ScoringStrategy::Pairwise,
        ScoringStrategy::InvertedIndex,
    ];

    #[test]
    fn bounded_intersection_example() {
        let table = ContributionTable::new()
            .with_counts(id("a@x.io"), &[("x", 3), ("y", 1)])
            .with_counts(id("b@x.io"), &[("x", 2), ("z", 1)]);

        for strategy in STRATEGIES {
            let scores = score_pairs(&table, strategy);
            assert_eq!(scores.len(), 1);
            assert_eq!(scores.get(&id("a@x.io"), &id("b@x.io")), Some(2));
        }
    }

    #[test]
    fn disjoint_contributors_score_zero_and_are_listed() {
        let table = ContributionTable::new()
            .with_counts(id("a@x.io"), &[("a.rs", 4)])
            .with_counts(id("b@x.io"), &[("b.rs", 2)])
            .with_counts(id("c@x.io"), &[("c.rs", 1)]);

        for strategy in STRATEGIES {
            let scores = score_pairs(&table, strategy);
            assert_eq!(scores.len(), 3);
            assert!(scores.iter().all(|(_, score)| score == 0));
        }
    }

    #[test]
    fn fewer_than_two_contributors_gives_empty_table() {
        let empty = ContributionTable::new();
        let single = ContributionTable::new().with_counts(id("a@x.io"), &[("a.rs", 1)]);

        for strategy in STRATEGIES {
            assert!(score_pairs(&empty, strategy).is_empty());
            assert!(score_pairs(&single, strategy).is_empty());
        }
    }

    #[test]
    fn lookup_is_symmetric_and_rejects_self_pairs() {
        let table = ContributionTable::new()
            .with_counts(id("a@x.io"), &[("x", 1)])
            .with_counts(id("b@x.io"), &[("x", 5)]);
        let scores = score_pairs(&table, ScoringStrategy::Pairwise);

        assert_eq!(
            scores.get(&id("a@x.io"), &id("b@x.io")),
            scores.get(&id("b@x.io"), &id("a@x.io"))
        );
        assert_eq!(scores.get(&id("a@x.io"), &id("a@x.io")), None);
        assert!(scores.iter().all(|(pair, _)| pair.first() != pair.second()));
    }

    #[test]
    fn contributor_without_files_pairs_at_zero() {
        let table = ContributionTable::new()
            .with_counts(id("a@x.io"), &[])
            .with_counts(id("b@x.io"), &[("x", 2)]);
        let scores = score_pairs(&table, ScoringStrategy::InvertedIndex);
        assert_eq!(scores.get(&id("a@x.io"), &id("b@x.io")), Some(0));
    }

    #[test]
    fn auto_uses_index_for_large_tables() {
        let mut table = ContributionTable::new();
        for i in 0..(AUTO_INDEX_THRESHOLD + 6) {
            let email = format!("dev{i}@x.io");
            table = table.with_counts(id(&email), &[("shared.rs", (i % 4) as u32 + 1)]);
        }
        assert_eq!(
            score_pairs(&table, ScoringStrategy::Auto),
            score_pairs(&table, ScoringStrategy::Pairwise)
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn tables() -> impl Strategy<Value = Vec<Vec<(u8, u32)>>> {
            proptest::collection::vec(
                proptest::collection::vec((0u8..8, 1u32..6), 0..6),
                0..7,
            )
        }

        fn build(raw: &[Vec<(u8, u32)>]) -> ContributionTable {
            let mut table = ContributionTable::new();
            for (i, files) in raw.iter().enumerate() {
                let names: Vec<(String, u32)> = files
                    .iter()
                    .map(|(file, count)| (format!("f{file}"), *count))
                    .collect();
                let counts: Vec<(&str, u32)> =
                    names.iter().map(|(f, c)| (f.as_str(), *c)).collect();
                table = table.with_counts(id(&format!("u{i}@x.io")), &counts);
            }
            table
        }

        proptest! {
            #[test]
            fn strategies_agree(raw in tables()) {
                let table = build(&raw);
                prop_assert_eq!(
                    score_pairs(&table, ScoringStrategy::Pairwise),
                    score_pairs(&table, ScoringStrategy::InvertedIndex)
                );
            }

            #[test]
            fn every_pair_present_and_symmetric(raw in tables()) {
                let table = build(&raw);
                let scores = score_pairs(&table, ScoringStrategy::Pairwise);
                let n = table.len();
                prop_assert_eq!(scores.len(), n * n.saturating_sub(1) / 2);

                for a in table.contributors() {
                    for b in table.contributors() {
                        let forward = scores.get(&a.identity, &b.identity);
                        let backward = scores.get(&b.identity, &a.identity);
                        prop_assert_eq!(forward, backward);
                        if a.identity == b.identity {
                            prop_assert_eq!(forward, None);
                        }
                    }
                }
            }

            #[test]
            fn score_matches_definition(raw in tables()) {
                let table = build(&raw);
                let scores = score_pairs(&table, ScoringStrategy::InvertedIndex);
                for (pair, score) in scores.iter() {
                    let a = table.get(pair.first().email()).unwrap();
                    let b = table.get(pair.second().email()).unwrap();
                    let expected: u64 = a
                        .files
                        .iter()
                        .map(|(f, c)| u64::from((*c).min(b.count(f))))
                        .sum();
                    prop_assert_eq!(score, expected);
                }
            }
        }
    }
}

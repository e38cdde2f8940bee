use std::sync::Arc;

use copair_core::{CopairConfig, CopairError, QuotaStatus, RepositoryClient, ScoringStrategy};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate, AggregateOptions};
use crate::fetch::{fetch_commits, FetchOptions};
use crate::progress::ProgressCallback;
use crate::ranking::{rank, Ranking, Selection};
use crate::scoring::score_pairs;

/// Result of a completed analysis run.
///
/// # Examples
///
/// ```
/// use copair_core::QuotaStatus;
/// use copair_pulse::pipeline::AnalysisReport;
///
/// let report = AnalysisReport {
///     repository: "octocat/hello-world".into(),
///     quota: QuotaStatus { remaining: 59, limit: 60 },
///     commits_analyzed: 0,
///     bad_commits: 0,
///     failed_commits: 0,
///     contributors: 0,
///     ranking: None,
/// };
/// assert!(report.ranking.is_none());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// `owner/repo` that was analyzed.
    pub repository: String,
    /// Quota reported before the run started.
    pub quota: QuotaStatus,
    /// Commits fetched from the listing.
    pub commits_analyzed: usize,
    /// Commits ignored for lack of an author.
    pub bad_commits: usize,
    /// Commits ignored because their file list could not be fetched.
    pub failed_commits: usize,
    /// Distinct contributors found.
    pub contributors: usize,
    /// Ranked pairs, `None` when fewer than two contributors were found.
    pub ranking: Option<Ranking>,
}

/// Settings for every stage of a run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Commit listing.
    pub fetch: FetchOptions,
    /// File-list fan-out and merge.
    pub aggregate: AggregateOptions,
    /// Pair scoring.
    pub strategy: ScoringStrategy,
}

impl AnalysisOptions {
    /// Derive options from loaded configuration and a commit limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use copair_core::CopairConfig;
    /// use copair_pulse::pipeline::AnalysisOptions;
    ///
    /// let opts = AnalysisOptions::from_config(&CopairConfig::default(), Some(200));
    /// assert_eq!(opts.fetch.limit, Some(200));
    /// assert_eq!(opts.aggregate.concurrency, 99);
    /// ```
    pub fn from_config(config: &CopairConfig, limit: Option<usize>) -> Self {
        Self {
            fetch: FetchOptions {
                limit,
                page_size: config.github.page_size,
                min_quota: config.fetch.min_quota,
            },
            aggregate: AggregateOptions::from_config(&config.fetch, &config.identity),
            strategy: config.scoring.strategy,
        }
    }
}

/// Drives fetch, aggregation, scoring, and ranking for one repository.
pub struct CollaborationPipeline<C: ?Sized> {
    client: Arc<C>,
    options: AnalysisOptions,
}

impl<C> CollaborationPipeline<C>
where
    C: RepositoryClient + ?Sized + 'static,
{
    /// Create a pipeline over `client`.
    pub fn new(client: Arc<C>, options: AnalysisOptions) -> Self {
        Self { client, options }
    }

    /// Run every stage and rank the result.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the run: [`CopairError::QuotaExceeded`],
    /// [`CopairError::FetchTimeout`], or a transport/API error from the
    /// client. Nothing partial is returned.
    pub async fn run(
        &self,
        repository: &str,
        selection: Selection,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<AnalysisReport, CopairError> {
        let fetched = fetch_commits(self.client.as_ref(), &self.options.fetch, on_progress).await?;
        info!(repository, commits = fetched.commits.len(), "fetched commits");

        let aggregation = aggregate(
            Arc::clone(&self.client),
            &fetched.commits,
            &self.options.aggregate,
            on_progress,
        )
        .await?;

        let scores = score_pairs(&aggregation.table, self.options.strategy);
        let ranking = rank(&scores, selection);

        Ok(AnalysisReport {
            repository: repository.to_string(),
            quota: fetched.initial_quota,
            commits_analyzed: fetched.commits.len(),
            bad_commits: aggregation.bad_commits,
            failed_commits: aggregation.failed_commits,
            contributors: aggregation.table.len(),
            ranking,
        })
    }
}

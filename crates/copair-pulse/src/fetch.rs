//! Quota-aware commit listing.
//!
//! Pages through a repository's commits newest-first and stops at the
//! requested limit. Every page costs one API call and every commit kept will
//! later cost one more (its file list), so the fetch fails up front when the
//! quota cannot cover the whole run.

use copair_core::{CommitRef, CopairError, QuotaStatus, RepositoryClient};
use tracing::{debug, info};

use crate::progress::{emit, Progress, ProgressCallback};

/// Options for commit listing.
///
/// # Examples
///
/// ```
/// use copair_pulse::fetch::FetchOptions;
///
/// let opts = FetchOptions::default();
/// assert_eq!(opts.limit, None);
/// assert_eq!(opts.page_size, 100);
/// assert_eq!(opts.min_quota, 3);
/// ```
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Keep at most this many commits (default: unbounded).
    pub limit: Option<usize>,
    /// Commits per listing page (default: 100).
    pub page_size: u32,
    /// Refuse to start below this many remaining calls (default: 3).
    pub min_quota: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            limit: None,
            page_size: 100,
            min_quota: 3,
        }
    }
}

/// Commits retrieved by [`fetch_commits`].
#[derive(Debug, Clone)]
pub struct FetchedCommits {
    /// Commits, newest first.
    pub commits: Vec<CommitRef>,
    /// Quota reported before paging.
    pub initial_quota: QuotaStatus,
    /// Local estimate of calls left after paging.
    pub remaining_estimate: u64,
}

/// List commits newest-first, honouring the limit and the API quota.
///
/// # Errors
///
/// Returns [`CopairError::QuotaExceeded`] when the quota is below
/// `min_quota`, runs out while pages remain, or cannot cover one file-list
/// request per kept commit. Returns [`CopairError::InvalidArgument`] for a
/// zero limit or page size. Client errors are propagated.
pub async fn fetch_commits<C>(
    client: &C,
    options: &FetchOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<FetchedCommits, CopairError>
where
    C: RepositoryClient + ?Sized,
{
    if options.limit == Some(0) {
        return Err(CopairError::InvalidArgument(
            "the number of commits needs to be larger than 0".into(),
        ));
    }
    if options.page_size == 0 {
        return Err(CopairError::InvalidArgument(
            "page size needs to be larger than 0".into(),
        ));
    }

    let initial_quota = client.quota().await?;
    emit(
        on_progress,
        Progress::QuotaChecked {
            quota: initial_quota,
        },
    );
    info!(quota = %initial_quota, "checked API quota");

    if initial_quota.remaining < options.min_quota {
        return Err(CopairError::QuotaExceeded {
            needed: options.min_quota,
            remaining: initial_quota.remaining,
        });
    }

    let limit = options.limit.unwrap_or(usize::MAX);
    let mut remaining = initial_quota.remaining;
    let mut commits: Vec<CommitRef> = Vec::new();
    let mut page = 1u32;

    loop {
        let batch = client.list_commits_page(page, options.page_size).await?;
        remaining = remaining.saturating_sub(1);
        commits.extend(batch.commits);

        emit(
            on_progress,
            Progress::PageFetched {
                page,
                total_so_far: commits.len(),
            },
        );
        debug!(page, total = commits.len(), remaining, "fetched commit page");

        if commits.len() >= limit || !batch.has_next {
            break;
        }
        if remaining < 1 {
            return Err(CopairError::QuotaExceeded {
                needed: 1,
                remaining,
            });
        }
        page += 1;
    }

    commits.truncate(limit);

    let needed = commits.len() as u64;
    if remaining < needed {
        return Err(CopairError::QuotaExceeded { needed, remaining });
    }

    Ok(FetchedCommits {
        commits,
        initial_quota,
        remaining_estimate: remaining,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::FakeClient;

    fn opts(limit: Option<usize>, page_size: u32) -> FetchOptions {
        FetchOptions {
            limit,
            page_size,
            ..FetchOptions::default()
        }
    }

    #[tokio::test]
    async fn fetches_all_pages_when_unbounded() {
        let client = FakeClient::new().many(25, "a@x.io");
        let fetched = fetch_commits(&client, &opts(None, 10), None).await.unwrap();

        assert_eq!(fetched.commits.len(), 25);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetched.remaining_estimate, 5000 - 3);
    }

    #[tokio::test]
    async fn stops_at_limit_and_truncates() {
        let client = FakeClient::new().many(25, "a@x.io");
        let fetched = fetch_commits(&client, &opts(Some(12), 10), None)
            .await
            .unwrap();

        assert_eq!(fetched.commits.len(), 12);
        assert_eq!(fetched.commits[0].sha, "a@x.io-0");
        assert_eq!(fetched.commits[11].sha, "a@x.io-11");
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn quota_below_minimum_fails_before_paging() {
        let client = FakeClient::new().many(5, "a@x.io").quota(2);
        let err = fetch_commits(&client, &opts(None, 10), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CopairError::QuotaExceeded {
                needed: 3,
                remaining: 2
            }
        ));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quota_must_cover_one_call_per_commit() {
        // one page call leaves 9, but 10 file lists are needed
        let client = FakeClient::new().many(10, "a@x.io").quota(10);
        let err = fetch_commits(&client, &opts(Some(10), 100), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CopairError::QuotaExceeded {
                needed: 10,
                remaining: 9
            }
        ));
    }

    #[tokio::test]
    async fn quota_check_uses_commits_actually_fetched() {
        let client = FakeClient::new().many(4, "a@x.io").quota(10);
        let fetched = fetch_commits(&client, &opts(Some(500), 100), None)
            .await
            .unwrap();
        assert_eq!(fetched.commits.len(), 4);
    }

    #[tokio::test]
    async fn quota_exhausted_mid_pagination() {
        let client = FakeClient::new().many(50, "a@x.io").quota(3);
        let err = fetch_commits(&client, &opts(None, 10), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CopairError::QuotaExceeded { remaining: 0, .. }));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_repository_yields_no_commits() {
        let client = FakeClient::new();
        let fetched = fetch_commits(&client, &FetchOptions::default(), None)
            .await
            .unwrap();
        assert!(fetched.commits.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_rejected() {
        let client = FakeClient::new().many(3, "a@x.io");
        let err = fetch_commits(&client, &opts(Some(0), 10), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CopairError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn emits_one_event_per_page() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let pages = Arc::new(AtomicUsize::new(0));
        let seen = pages.clone();
        let callback: ProgressCallback = Box::new(move |event| {
            if matches!(event, Progress::PageFetched { .. }) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let client = FakeClient::new().many(21, "a@x.io");
        fetch_commits(&client, &opts(None, 10), Some(&callback))
            .await
            .unwrap();
        assert_eq!(pages.load(Ordering::SeqCst), 3);
    }
}

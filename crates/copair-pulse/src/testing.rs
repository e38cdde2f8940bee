//! In-memory repository host for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use copair_core::{CommitPage, CommitRef, CopairError, QuotaStatus, RepositoryClient};

pub(crate) struct FakeClient {
    commits: Vec<CommitRef>,
    files: HashMap<String, Vec<String>>,
    quota: QuotaStatus,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) file_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
    /// File lists actually delivered, i.e. fetches that ran to the end.
    pub(crate) completed_calls: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self {
            commits: Vec::new(),
            files: HashMap::new(),
            quota: QuotaStatus {
                remaining: 5000,
                limit: 5000,
            },
            delay: None,
            delays: HashMap::new(),
            failing: HashSet::new(),
            list_calls: AtomicUsize::new(0),
            file_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed_calls: AtomicUsize::new(0),
        }
    }

    /// Append a commit; commits are listed in insertion order (newest first).
    pub(crate) fn commit(mut self, sha: &str, name: &str, email: &str, files: &[&str]) -> Self {
        self.commits.push(CommitRef::new(sha).with_author(name, email));
        self.files
            .insert(sha.into(), files.iter().map(|f| (*f).to_string()).collect());
        self
    }

    pub(crate) fn anonymous_commit(mut self, sha: &str, files: &[&str]) -> Self {
        self.commits.push(CommitRef::new(sha));
        self.files
            .insert(sha.into(), files.iter().map(|f| (*f).to_string()).collect());
        self
    }

    /// Append `n` single-file commits by one author.
    pub(crate) fn many(mut self, n: usize, email: &str) -> Self {
        for i in 0..n {
            let sha = format!("{email}-{i}");
            self = self.commit(&sha, email, email, &["shared.rs"]);
        }
        self
    }

    pub(crate) fn quota(mut self, remaining: u64) -> Self {
        self.quota = QuotaStatus {
            remaining,
            limit: 5000,
        };
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Latency for one commit, overriding [`delay`](Self::delay).
    pub(crate) fn delayed(mut self, sha: &str, delay: Duration) -> Self {
        self.delays.insert(sha.into(), delay);
        self
    }

    /// Fail the file-list request for `sha` immediately.
    pub(crate) fn failing(mut self, sha: &str) -> Self {
        self.failing.insert(sha.into());
        self
    }
}

#[async_trait]
impl RepositoryClient for FakeClient {
    async fn list_commits_page(&self, page: u32, per_page: u32) -> Result<CommitPage, CopairError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let per_page = per_page as usize;
        let start = (page.saturating_sub(1) as usize) * per_page;
        let end = (start + per_page).min(self.commits.len());
        let commits = self.commits.get(start..end).unwrap_or_default().to_vec();
        Ok(CommitPage {
            commits,
            has_next: end < self.commits.len(),
        })
    }

    async fn quota(&self) -> Result<QuotaStatus, CopairError> {
        Ok(self.quota)
    }

    async fn commit_changed_files(&self, commit: &CommitRef) -> Result<Vec<String>, CopairError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.failing.contains(&commit.sha) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(CopairError::Transport(format!(
                "connection reset fetching {}",
                commit.sha
            )));
        }
        if let Some(delay) = self.delays.get(&commit.sha).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self.files.get(&commit.sha).cloned().unwrap_or_default())
    }
}

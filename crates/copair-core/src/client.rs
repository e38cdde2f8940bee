//! The narrow interface the analysis core needs from a repository host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CopairError;

/// Handle to one commit as returned by a commit listing.
///
/// The author fields come from the listing payload and may be missing (for
/// example when a commit was imported without an email).
///
/// # Examples
///
/// ```
/// use copair_core::CommitRef;
///
/// let commit = CommitRef::new("a1b2c3").with_author("Alice", "alice@example.com");
/// assert_eq!(commit.sha, "a1b2c3");
/// assert_eq!(commit.author_email.as_deref(), Some("alice@example.com"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    /// Full commit hash.
    pub sha: String,
    /// Author name recorded in the commit.
    pub author_name: Option<String>,
    /// Author email recorded in the commit.
    pub author_email: Option<String>,
}

impl CommitRef {
    /// A commit with no author information.
    pub fn new(sha: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            author_name: None,
            author_email: None,
        }
    }

    /// Attach author name and email.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self.author_email = Some(email.into());
        self
    }
}

/// Author of a commit as reported by the host, not yet canonicalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Name as written in the commit.
    pub name: String,
    /// Email as written in the commit.
    pub email: String,
}

/// One page of a newest-first commit listing.
#[derive(Debug, Clone, Default)]
pub struct CommitPage {
    /// Commits on this page, newest first.
    pub commits: Vec<CommitRef>,
    /// Whether another page follows.
    pub has_next: bool,
}

/// API quota for the current rate-limit window.
///
/// # Examples
///
/// ```
/// use copair_core::QuotaStatus;
///
/// let quota = QuotaStatus { remaining: 4990, limit: 5000 };
/// assert_eq!(quota.to_string(), "4990/5000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Calls left in the window.
    pub remaining: u64,
    /// Calls allowed per window.
    pub limit: u64,
}

impl std::fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remaining, self.limit)
    }
}

/// Remote repository host consumed by the commit fetcher and aggregator.
///
/// Implementations must be shareable across tasks: the aggregator calls
/// [`commit_changed_files`](RepositoryClient::commit_changed_files) from many
/// tasks at once.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetch one page (1-based) of commits, newest first.
    async fn list_commits_page(&self, page: u32, per_page: u32)
        -> Result<CommitPage, CopairError>;

    /// Current API quota.
    async fn quota(&self) -> Result<QuotaStatus, CopairError>;

    /// Resolve the author of `commit` without a network call.
    ///
    /// # Errors
    ///
    /// Returns [`CopairError::AuthorResolution`] when the email is missing or
    /// blank. A missing or blank name falls back to the email.
    fn commit_author(&self, commit: &CommitRef) -> Result<Author, CopairError> {
        let email = commit.author_email.as_deref().map(str::trim).unwrap_or("");
        if email.is_empty() {
            return Err(CopairError::AuthorResolution(commit.sha.clone()));
        }
        let name = commit
            .author_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(email);
        Ok(Author {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Paths of the files changed by `commit`.
    async fn commit_changed_files(&self, commit: &CommitRef) -> Result<Vec<String>, CopairError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopClient;

    #[async_trait]
    impl RepositoryClient for NoopClient {
        async fn list_commits_page(
            &self,
            _page: u32,
            _per_page: u32,
        ) -> Result<CommitPage, CopairError> {
            Ok(CommitPage::default())
        }

        async fn quota(&self) -> Result<QuotaStatus, CopairError> {
            Ok(QuotaStatus {
                remaining: 0,
                limit: 0,
            })
        }

        async fn commit_changed_files(
            &self,
            _commit: &CommitRef,
        ) -> Result<Vec<String>, CopairError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn author_resolved_from_listing_fields() {
        let commit = CommitRef::new("abc").with_author(" Alice ", "alice@example.com");
        let author = NoopClient.commit_author(&commit).unwrap();
        assert_eq!(author.name, "Alice");
        assert_eq!(author.email, "alice@example.com");
    }

    #[test]
    fn missing_email_is_resolution_failure() {
        let mut commit = CommitRef::new("abc");
        commit.author_name = Some("Alice".into());
        let err = NoopClient.commit_author(&commit).unwrap_err();
        assert!(matches!(err, CopairError::AuthorResolution(sha) if sha == "abc"));
    }

    #[test]
    fn blank_name_falls_back_to_email() {
        let commit = CommitRef::new("def").with_author("   ", "bob@example.com");
        let author = NoopClient.commit_author(&commit).unwrap();
        assert_eq!(author.name, "bob@example.com");
        assert_eq!(author.email, "bob@example.com");
    }

    #[test]
    fn missing_name_falls_back_to_email() {
        let mut commit = CommitRef::new("ghi");
        commit.author_email = Some("carol@example.com".into());
        let author = NoopClient.commit_author(&commit).unwrap();
        assert_eq!(author.name, "carol@example.com");
    }

    #[test]
    fn blank_email_is_resolution_failure() {
        let commit = CommitRef::new("jkl").with_author("Dave", "  ");
        assert!(NoopClient.commit_author(&commit).is_err());
    }

    #[tokio::test]
    async fn trait_object_is_usable() {
        let client: Box<dyn RepositoryClient> = Box::new(NoopClient);
        let page = client.list_commits_page(1, 100).await.unwrap();
        assert!(page.commits.is_empty());
        assert!(!page.has_next);
    }
}

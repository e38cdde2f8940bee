use async_trait::async_trait;
use copair_core::{
    CommitPage, CommitRef, CopairError, GitHubConfig, QuotaStatus, RepositoryClient,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = "copair";
const ACCEPT: &str = "application/vnd.github+json";

/// GitHub repository client used by the collaboration pipeline.
///
/// Commit listings and per-commit file lists go through `reqwest` so the
/// `Link` header is available for pagination; rate-limit lookups go through
/// `octocrab`.
///
/// # Examples
///
/// ```
/// use copair_github::github::parse_repository;
///
/// let (owner, repo) = parse_repository("rust-lang/rust").unwrap();
/// assert_eq!(owner, "rust-lang");
/// assert_eq!(repo, "rust");
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a client for `owner/repo` using the connection settings in
    /// `config`. Requests are anonymous when no token is configured.
    ///
    /// # Errors
    ///
    /// Returns [`CopairError::Config`] if `api_url` is not a valid URI, or
    /// [`CopairError::Transport`] if an HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use copair_core::GitHubConfig;
    /// use copair_github::GitHubClient;
    ///
    /// # #[tokio::main] async fn main() {
    /// let client = GitHubClient::new(&GitHubConfig::default(), "octocat", "hello-world").unwrap();
    /// # }
    /// ```
    pub fn new(config: &GitHubConfig, owner: &str, repo: &str) -> Result<Self, CopairError> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let mut builder = octocrab::Octocrab::builder()
            .base_uri(api_url.as_str())
            .map_err(|e| CopairError::Config(format!("invalid github.api_url '{api_url}': {e}")))?;
        if let Some(token) = &token {
            builder = builder.personal_token(token.clone());
        }
        let octocrab = builder
            .build()
            .map_err(|e| CopairError::Transport(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CopairError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            octocrab,
            http,
            api_url,
            token,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// `owner/repo` this client reads from.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn list_commits_page(&self, page: u32, per_page: u32) -> Result<CommitPage, CopairError> {
        let url = format!(
            "{}/repos/{}/{}/commits?per_page={per_page}&page={page}",
            self.api_url, self.owner, self.repo
        );
        debug!(%url, "listing commits");

        let (items, has_next): (Vec<CommitItem>, bool) = self.get_page(&url).await?;
        Ok(CommitPage {
            commits: items.into_iter().map(CommitItem::into_ref).collect(),
            has_next,
        })
    }

    async fn quota(&self) -> Result<QuotaStatus, CopairError> {
        let response: RateLimitResponse = self
            .octocrab
            .get("/rate_limit", None::<&()>)
            .await
            .map_err(map_octocrab_error)?;
        Ok(QuotaStatus {
            remaining: response.resources.core.remaining,
            limit: response.resources.core.limit,
        })
    }

    /// Walks every page of the commit's file list. Each extra page costs one
    /// more API call than the fetcher's one-per-commit quota estimate.
    async fn commit_changed_files(&self, commit: &CommitRef) -> Result<Vec<String>, CopairError> {
        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repos/{}/{}/commits/{}?page={page}",
                self.api_url, self.owner, self.repo, commit.sha
            );
            let (detail, has_next): (CommitDetail, bool) = self.get_page(&url).await?;
            files.extend(detail.files.into_iter().map(|f| f.filename));
            if !has_next {
                break;
            }
            debug!(sha = %commit.sha, page, "commit file list continues");
            page += 1;
        }
        Ok(files)
    }
}

impl GitHubClient {
    /// GET `url` and decode the body, reporting whether a `rel="next"` page
    /// follows.
    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<(T, bool), CopairError> {
        let mut request = self.http.get(url).header("Accept", ACCEPT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| CopairError::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CopairError::Api {
                status: status.as_u16(),
                message: api_message(&body),
            });
        }

        let has_next = has_next_page(
            response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok()),
        );
        let body = response
            .json()
            .await
            .map_err(|e| CopairError::Transport(format!("failed to read {url}: {e}")))?;
        Ok((body, has_next))
    }
}

/// Parse a repository slug (`owner/repo`) into its components.
///
/// # Errors
///
/// Returns [`CopairError::InvalidArgument`] if either part is missing or
/// the slug has more than one `/`.
///
/// # Examples
///
/// ```
/// use copair_github::parse_repository;
///
/// let (owner, repo) = parse_repository("octocat/hello-world").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert!(parse_repository("hello-world").is_err());
/// ```
pub fn parse_repository(slug: &str) -> Result<(String, String), CopairError> {
    let invalid = || {
        CopairError::InvalidArgument(format!(
            "invalid repository '{slug}', expected owner/repo"
        ))
    };
    let (owner, repo) = slug.trim().split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}

/// Whether a `Link` header advertises a `rel="next"` page.
fn has_next_page(link: Option<&str>) -> bool {
    let Some(link) = link else {
        return false;
    };
    link.split(',').any(|entry| {
        entry
            .split(';')
            .skip(1)
            .any(|param| param.trim().replace(' ', "") == r#"rel="next""#)
    })
}

/// Pull `message` out of a GitHub error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn map_octocrab_error(err: octocrab::Error) -> CopairError {
    match err {
        octocrab::Error::GitHub { source, .. } => CopairError::Api {
            status: source.status_code.as_u16(),
            message: source.message.clone(),
        },
        other => CopairError::Transport(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    author: Option<GitAuthor>,
}

#[derive(Debug, Deserialize)]
struct GitAuthor {
    name: Option<String>,
    email: Option<String>,
}

impl CommitItem {
    fn into_ref(self) -> CommitRef {
        let mut commit = CommitRef::new(self.sha);
        if let Some(author) = self.commit.author {
            commit.author_name = author.name;
            commit.author_email = author.email;
        }
        commit
    }
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<ChangedFile>,
}

#[derive(Debug, Deserialize)]
struct ChangedFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitCore,
}

#[derive(Debug, Deserialize)]
struct RateLimitCore {
    limit: u64,
    remaining: u64,
}

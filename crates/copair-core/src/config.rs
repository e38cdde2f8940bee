use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CopairError;

/// Top-level configuration loaded from `.copair.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use copair_core::CopairConfig;
///
/// let config = CopairConfig::default();
/// assert_eq!(config.fetch.concurrency, 99);
/// assert_eq!(config.github.page_size, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopairConfig {
    /// GitHub connection settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Commit and file-list fetching.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Contributor identity handling.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Pair scoring.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl CopairConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CopairError::FileNotFound`] if `path` does not exist,
    /// [`CopairError::Io`] if it cannot be read, or any error from
    /// [`from_toml`](Self::from_toml).
    pub fn from_file(path: &Path) -> Result<Self, CopairError> {
        if !path.exists() {
            return Err(CopairError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CopairError::Toml`] if parsing fails, or
    /// [`CopairError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use copair_core::CopairConfig;
    ///
    /// let toml = r#"
    /// [fetch]
    /// concurrency = 16
    /// "#;
    /// let config = CopairConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.fetch.concurrency, 16);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CopairError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CopairError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<(), CopairError> {
        if self.github.page_size == 0 || self.github.page_size > 100 {
            return Err(CopairError::Config(format!(
                "github.page_size must be between 1 and 100, got {}",
                self.github.page_size
            )));
        }
        if self.fetch.concurrency == 0 {
            return Err(CopairError::Config(
                "fetch.concurrency must be at least 1".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(CopairError::Config(
                "fetch.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// GitHub connection settings.
///
/// # Examples
///
/// ```
/// use copair_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert_eq!(config.api_url, "https://api.github.com");
/// assert!(config.token.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL (default: `https://api.github.com`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Personal access token; anonymous access when absent.
    pub token: Option<String>,
    /// Commits per listing page, at most 100 (default: 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_page_size() -> u32 {
    100
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            page_size: default_page_size(),
        }
    }
}

/// What to do when fetching one commit's file list fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorPolicy {
    /// Fail the whole run on the first failure.
    #[default]
    Abort,
    /// Count the commit as failed and carry on without it.
    Skip,
}

/// Commit and file-list fetching settings.
///
/// # Examples
///
/// ```
/// use copair_core::{FetchConfig, FetchErrorPolicy};
///
/// let config = FetchConfig::default();
/// assert_eq!(config.concurrency, 99);
/// assert_eq!(config.timeout_secs, 60);
/// assert_eq!(config.min_quota, 3);
/// assert_eq!(config.on_error, FetchErrorPolicy::Abort);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum file-list requests in flight (default: 99).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Seconds to wait for all file lists (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Refuse to start below this many remaining API calls (default: 3).
    #[serde(default = "default_min_quota")]
    pub min_quota: u64,
    /// Failure policy for a single file-list fetch (default: abort).
    #[serde(default)]
    pub on_error: FetchErrorPolicy,
}

impl FetchConfig {
    /// The drain deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_concurrency() -> usize {
    99
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_min_quota() -> u64 {
    3
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            min_quota: default_min_quota(),
            on_error: FetchErrorPolicy::default(),
        }
    }
}

/// Which spelling of a contributor's name to report when one email shows up
/// with several names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayNamePolicy {
    /// Name on the last commit processed (the oldest one fetched).
    #[default]
    LastSeen,
    /// Name on the first commit processed (the newest one fetched).
    FirstSeen,
    /// Name used on the most commits; ties go to the last seen.
    MostFrequent,
}

/// Contributor identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Display-name policy (default: last-seen).
    #[serde(default)]
    pub display_name: DisplayNamePolicy,
}

/// How pair scores are computed. Every strategy yields the same table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringStrategy {
    /// Pick by contributor count.
    #[default]
    Auto,
    /// Compare every pair of contributors file by file.
    Pairwise,
    /// Walk a file -> contributors index.
    InvertedIndex,
}

/// Pair scoring settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Scoring strategy (default: auto).
    #[serde(default)]
    pub strategy: ScoringStrategy,
}

//! Per-contributor file-frequency tables.
//!
//! Resolves every commit to a contributor, fetches the commits' changed-file
//! lists on a bounded pool of tokio tasks, and merges the results into a
//! [`ContributionTable`] once the pool has drained.
//!
//! Tasks never touch the table. Each one sends its file list into a channel
//! and the merge runs on the calling task after the join barrier, so the
//! table is built without locks and does not depend on completion order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use copair_core::{
    canonical_email, CommitRef, CopairError, DisplayNamePolicy, FetchConfig, FetchErrorPolicy,
    Identity, IdentityConfig, RepositoryClient,
};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::progress::{emit, Progress, ProgressCallback};

/// One contributor and how often they touched each file.
///
/// # Examples
///
/// ```
/// use copair_core::Identity;
/// use copair_pulse::aggregate::ContributionTable;
///
/// let table = ContributionTable::new()
///     .with_counts(Identity::new("Alice", "alice@x.io"), &[("src/lib.rs", 3)]);
/// let alice = table.get("alice@x.io").unwrap();
/// assert_eq!(alice.count("src/lib.rs"), 3);
/// assert_eq!(alice.count("README.md"), 0);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    /// Who this is.
    pub identity: Identity,
    /// File path -> number of fetched commits by this contributor touching it.
    pub files: BTreeMap<String, u32>,
}

impl Contributor {
    /// Edit count for `path`, 0 if never touched.
    pub fn count(&self, path: &str) -> u32 {
        self.files.get(path).copied().unwrap_or(0)
    }
}

/// Mapping from contributor to per-file edit counts.
///
/// Iteration is ordered by canonical email.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContributionTable {
    contributors: BTreeMap<String, Contributor>,
}

impl ContributionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identity` with an empty file map unless already present.
    pub fn register(&mut self, identity: Identity) {
        self.contributors
            .entry(identity.email().to_string())
            .or_insert_with(|| Contributor {
                identity,
                files: BTreeMap::new(),
            });
    }

    /// Count one commit by `email` touching each of `files`.
    ///
    /// Paths repeated within `files` count once. Returns `false` when `email`
    /// was never registered.
    pub fn record_commit(&mut self, email: &str, files: &[String]) -> bool {
        let Some(contributor) = self.contributors.get_mut(email) else {
            return false;
        };
        let unique: BTreeSet<&str> = files.iter().map(String::as_str).collect();
        for path in unique {
            *contributor.files.entry(path.to_string()).or_default() += 1;
        }
        true
    }

    /// Replace the display name reported for `email`.
    pub fn set_display_name(&mut self, email: &str, name: &str) {
        if let Some(contributor) = self.contributors.get_mut(email) {
            contributor.identity = contributor.identity.clone().with_display_name(name);
        }
    }

    /// Builder used to assemble tables directly, mostly in tests and docs.
    pub fn with_counts(mut self, identity: Identity, counts: &[(&str, u32)]) -> Self {
        let email = identity.email().to_string();
        self.register(identity);
        if let Some(contributor) = self.contributors.get_mut(&email) {
            for (path, count) in counts {
                if *count > 0 {
                    *contributor.files.entry((*path).to_string()).or_default() += count;
                }
            }
        }
        self
    }

    /// Look up a contributor by canonical email.
    pub fn get(&self, email: &str) -> Option<&Contributor> {
        self.contributors.get(email)
    }

    /// Contributors ordered by email.
    pub fn contributors(&self) -> impl Iterator<Item = &Contributor> {
        self.contributors.values()
    }

    /// Number of contributors.
    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// Whether no contributor is registered.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }
}

/// Options for the aggregation stage.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use copair_pulse::aggregate::AggregateOptions;
///
/// let opts = AggregateOptions::default();
/// assert_eq!(opts.concurrency, 99);
/// assert_eq!(opts.timeout, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Maximum file-list requests in flight.
    pub concurrency: usize,
    /// Deadline for the whole pool to drain.
    pub timeout: Duration,
    /// What to do when one file-list request fails.
    pub on_error: FetchErrorPolicy,
    /// Which spelling of a contributor's name to keep.
    pub display_name: DisplayNamePolicy,
}

impl AggregateOptions {
    /// Build options from the `[fetch]` and `[identity]` config sections.
    pub fn from_config(fetch: &FetchConfig, identity: &IdentityConfig) -> Self {
        Self {
            concurrency: fetch.concurrency,
            timeout: fetch.timeout(),
            on_error: fetch.on_error,
            display_name: identity.display_name,
        }
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default(), &IdentityConfig::default())
    }
}

/// Output of [`aggregate`].
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The finalized table.
    pub table: ContributionTable,
    /// Commits skipped because they had no usable author.
    pub bad_commits: usize,
    /// Commits skipped because their file list could not be fetched
    /// (only under [`FetchErrorPolicy::Skip`]).
    pub failed_commits: usize,
}

struct FileList {
    email: String,
    files: Vec<String>,
}

/// Build a [`ContributionTable`] from `commits`.
///
/// # Errors
///
/// Returns [`CopairError::FetchTimeout`] if the pool does not drain within
/// `options.timeout`. Under [`FetchErrorPolicy::Abort`] the first failed
/// file-list request is returned as-is. In both cases nothing is merged.
pub async fn aggregate<C>(
    client: Arc<C>,
    commits: &[CommitRef],
    options: &AggregateOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Aggregation, CopairError>
where
    C: RepositoryClient + ?Sized + 'static,
{
    let mut table = ContributionTable::new();
    let mut names = NameLedger::default();
    let mut bad_commits = 0usize;
    let mut scheduled: Vec<(String, CommitRef)> = Vec::with_capacity(commits.len());

    for commit in commits {
        match client.commit_author(commit) {
            Ok(author) => {
                let email = canonical_email(&author.email);
                names.observe(&email, &author.name);
                table.register(Identity::new(author.name, &email));
                scheduled.push((email, commit.clone()));
            }
            Err(e) => {
                bad_commits += 1;
                debug!(sha = %commit.sha, error = %e, "ignoring commit without author");
            }
        }
    }

    let total = scheduled.len();
    emit(on_progress, Progress::FetchingFiles { total });
    info!(
        commits = total,
        concurrency = options.concurrency,
        "fetching changed files"
    );

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let finished = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<FileList>();
    let mut tasks: JoinSet<Result<(), CopairError>> = JoinSet::new();

    for (email, commit) in scheduled {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let finished = Arc::clone(&finished);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| CopairError::Transport(format!("worker pool closed: {e}")))?;
            let fetched = client.commit_changed_files(&commit).await;
            finished.fetch_add(1, Ordering::SeqCst);
            let files = fetched.map_err(|e| {
                warn!(sha = %commit.sha, error = %e, "failed to fetch changed files");
                e
            })?;
            // The receiver outlives every task unless the run was abandoned.
            let _ = tx.send(FileList { email, files });
            Ok(())
        });
    }
    drop(tx);

    let drained = tokio::time::timeout(
        options.timeout,
        drain_pool(&mut tasks, total, options.on_error, on_progress),
    )
    .await;

    let failed_commits = match drained {
        Ok(result) => result?,
        Err(_) => {
            // dropping the set cancels the fetches still running
            return Err(CopairError::FetchTimeout {
                completed: finished.load(Ordering::SeqCst),
                total,
                timeout_secs: options.timeout.as_secs(),
            });
        }
    };

    while let Ok(list) = rx.try_recv() {
        table.record_commit(&list.email, &list.files);
    }

    for (email, name) in names.resolve(options.display_name) {
        table.set_display_name(&email, &name);
    }

    info!(
        contributors = table.len(),
        bad_commits, failed_commits, "all commits parsed"
    );

    Ok(Aggregation {
        table,
        bad_commits,
        failed_commits,
    })
}

async fn drain_pool(
    tasks: &mut JoinSet<Result<(), CopairError>>,
    total: usize,
    on_error: FetchErrorPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<usize, CopairError> {
    let mut completed = 0usize;
    let mut failed = 0usize;

    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        emit(on_progress, Progress::FilesFetched { completed, total });

        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => match on_error {
                FetchErrorPolicy::Abort => return Err(e),
                FetchErrorPolicy::Skip => failed += 1,
            },
            Err(join_err) => {
                return Err(CopairError::Transport(format!(
                    "file-list task failed: {join_err}"
                )));
            }
        }
    }

    Ok(failed)
}

/// Every name seen per email, in processing order.
#[derive(Default)]
struct NameLedger {
    seen: HashMap<String, Vec<String>>,
}

impl NameLedger {
    fn observe(&mut self, email: &str, name: &str) {
        self.seen
            .entry(email.to_string())
            .or_default()
            .push(name.to_string());
    }

    fn resolve(&self, policy: DisplayNamePolicy) -> Vec<(String, String)> {
        self.seen
            .iter()
            .filter_map(|(email, names)| {
                let chosen = match policy {
                    DisplayNamePolicy::LastSeen => names.last(),
                    DisplayNamePolicy::FirstSeen => names.first(),
                    DisplayNamePolicy::MostFrequent => most_frequent(names),
                }?;
                Some((email.clone(), chosen.clone()))
            })
            .collect()
    }
}

fn most_frequent(names: &[String]) -> Option<&String> {
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, name) in names.iter().enumerate() {
        let entry = tally.entry(name.as_str()).or_insert((0, position));
        entry.0 += 1;
        entry.1 = position;
    }
    // highest count, then latest position
    let (_, (_, position)) = tally.into_iter().max_by_key(|(_, stats)| *stats)?;
    names.get(position)
}

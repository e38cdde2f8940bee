//! Progress events emitted while a run is underway.

use copair_core::QuotaStatus;

/// Progress events emitted by the fetcher and aggregator.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Progress {
    /// Quota read before paging starts.
    QuotaChecked {
        /// Quota reported by the host.
        quota: QuotaStatus,
    },

    /// Fetched one page of the commit listing.
    PageFetched {
        /// Page number (1-indexed).
        page: u32,
        /// Running total of commits fetched so far.
        total_so_far: usize,
    },

    /// Started fetching per-commit file lists.
    FetchingFiles {
        /// Number of file lists requested.
        total: usize,
    },

    /// One file-list task finished.
    FilesFetched {
        /// Tasks finished so far.
        completed: usize,
        /// Tasks dispatched.
        total: usize,
    },
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: Progress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

use std::path::PathBuf;

/// Errors that can occur anywhere in copair.
///
/// Library crates return this type directly; the binary converts it into a
/// `miette` report at the boundary.
///
/// # Examples
///
/// ```
/// use copair_core::CopairError;
///
/// let err = CopairError::QuotaExceeded { needed: 120, remaining: 40 };
/// assert!(err.to_string().contains("120"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CopairError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or conflicting user input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Not enough API quota left to finish the run.
    #[error("rate limit reached: {needed} requests needed but only {remaining} remaining")]
    QuotaExceeded {
        /// Requests the run still has to make.
        needed: u64,
        /// Requests left in the current window.
        remaining: u64,
    },

    /// A commit carries no usable author name or email.
    #[error("commit {0} has no author")]
    AuthorResolution(String),

    /// The fetch pool did not drain before the deadline.
    #[error("not all commits parsed: {completed}/{total} file lists fetched within {timeout_secs}s")]
    FetchTimeout {
        /// Tasks that finished before the deadline.
        completed: usize,
        /// Tasks that were dispatched.
        total: usize,
        /// The deadline in seconds.
        timeout_secs: u64,
    },

    /// Network or task failure while talking to the repository host.
    #[error("transport error: {0}")]
    Transport(String),

    /// The repository host answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CopairError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn quota_error_names_both_numbers() {
        let err = CopairError::QuotaExceeded {
            needed: 10,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "rate limit reached: 10 requests needed but only 3 remaining"
        );
    }

    #[test]
    fn timeout_error_reports_progress() {
        let err = CopairError::FetchTimeout {
            completed: 7,
            total: 9,
            timeout_secs: 60,
        };
        assert!(err.to_string().contains("7/9"));
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = CopairError::FileNotFound(PathBuf::from("/tmp/.copair.toml"));
        assert!(err.to_string().contains("/tmp/.copair.toml"));
    }
}

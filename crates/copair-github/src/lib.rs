//! GitHub REST implementation of [`copair_core::RepositoryClient`].

pub mod github;

pub use github::{parse_repository, GitHubClient};

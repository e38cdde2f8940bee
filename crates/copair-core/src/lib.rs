//! Core types, configuration, and error handling for copair.
//!
//! This crate provides the shared foundation used by the other copair crates:
//! - [`CopairError`]: unified error type using `thiserror`
//! - [`CopairConfig`]: configuration loaded from `.copair.toml`
//! - [`RepositoryClient`]: the interface to a remote repository host
//! - Shared types: [`Identity`], [`UnorderedPair`], [`CommitRef`], [`OutputFormat`]

mod client;
mod config;
mod error;
mod types;

pub use client::{Author, CommitPage, CommitRef, QuotaStatus, RepositoryClient};
pub use config::{
    CopairConfig, DisplayNamePolicy, FetchConfig, FetchErrorPolicy, GitHubConfig, IdentityConfig,
    ScoringConfig, ScoringStrategy,
};
pub use error::CopairError;
pub use types::{canonical_email, Identity, OutputFormat, UnorderedPair};

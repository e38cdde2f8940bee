//! Collaboration analysis: who works on the same files.
//!
//! Pages through a repository's commit history under its API quota, fetches
//! every commit's changed files on a bounded task pool, and scores each pair
//! of contributors by the files they share.

pub mod aggregate;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod ranking;
pub mod report;
pub mod scoring;

#[cfg(test)]
mod testing;

pub use pipeline::{AnalysisOptions, AnalysisReport, CollaborationPipeline};
pub use progress::{Progress, ProgressCallback};
pub use ranking::Selection;

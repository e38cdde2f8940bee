use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use copair_core::{CopairConfig, CopairError, OutputFormat};
use copair_github::{parse_repository, GitHubClient};
use copair_pulse::{AnalysisOptions, CollaborationPipeline, Progress, ProgressCallback, Selection};

/// Flags that were historically written with a single dash (`-commits=50`).
const LEGACY_FLAGS: [&str; 4] = ["commits", "pairs", "percent", "token"];

#[derive(Parser)]
#[command(
    name = "copair",
    version,
    about = "Find which contributors of a GitHub repository work on the same files",
    long_about = "Find which contributors of a GitHub repository work on the same files.\n\n\
                   Walks the commit history, collects the files each author touched, and\n\
                   scores every pair of authors by the files they share.\n\n\
                   Examples:\n  \
                     copair rust-lang/rust                 Rank every pair\n  \
                     copair rust-lang/rust --commits 500   Only the 500 newest commits\n  \
                     copair rust-lang/rust --pairs 10      Top 10 pairs\n  \
                     copair rust-lang/rust --percent 5     Top 5% of pairs\n  \
                     copair rust-lang/rust --format json   Machine-readable output"
)]
struct Cli {
    /// Repository to analyze, as owner/repo
    repository: String,

    /// Only analyze the N most recent commits
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    commits: Option<u64>,

    /// Show the N highest-scoring pairs
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), conflicts_with = "percent")]
    pairs: Option<u64>,

    /// Show the top P percent of pairs (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    percent: Option<u8>,

    /// GitHub token (anonymous access when unset)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format
    #[arg(
        long,
        default_value = "text",
        long_help = "Output format for the report.\n\n\
                       Formats:\n  \
                         text      Human-readable list and summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown table"
    )]
    format: OutputFormat,

    /// Path to configuration file (default: .copair.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum concurrent file-list requests
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: Option<u64>,

    /// Seconds to wait for all file lists
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn selection(&self) -> Selection {
        match (self.pairs, self.percent) {
            (Some(k), _) => Selection::Top(to_usize(k)),
            (None, Some(p)) => Selection::Percent(p),
            (None, None) => Selection::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse_from(normalize_legacy_args(std::env::args()));
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let (owner, repo) = parse_repository(&cli.repository).map_err(|e| {
        miette::miette!(
            help = "Pass the repository as owner/repo, for example rust-lang/rust",
            "{}",
            e
        )
    })?;

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "fetch: concurrency {}, timeout {}s, on error {:?}",
            config.fetch.concurrency, config.fetch.timeout_secs, config.fetch.on_error
        );
    }

    eprintln!("Connecting to GitHub...");
    let client = GitHubClient::new(&config.github, &owner, &repo).into_diagnostic()?;
    eprintln!("Checking repo: {}", client.repository());

    let limit = cli.commits.map(to_usize);
    let pipeline = CollaborationPipeline::new(
        Arc::new(client),
        AnalysisOptions::from_config(&config, limit),
    );

    let progress = progress_bar();
    let on_progress = progress_reporter(progress.clone());

    let outcome = pipeline
        .run(&cli.repository, cli.selection(), Some(&on_progress))
        .await;

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let report = outcome.map_err(diagnose)?;

    if report.bad_commits > 0 {
        eprintln!(
            "{} commits did not contain an author and were ignored",
            report.bad_commits
        );
    }
    if report.failed_commits > 0 {
        eprintln!(
            "{} commits could not be fetched and were skipped",
            report.failed_commits
        );
    }

    let rendered = copair_pulse::report::render(&report, cli.format).into_diagnostic()?;
    print!("{rendered}");
    Ok(())
}

/// Rewrite single-dash long flags (`-commits=5`) to their `--` form.
fn normalize_legacy_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if is_legacy_flag(&arg) {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

fn is_legacy_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    LEGACY_FLAGS.contains(&name)
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,copair=debug,copair_core=debug,copair_github=debug,copair_pulse=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<CopairConfig> {
    let mut config = match &cli.config {
        Some(path) => CopairConfig::from_file(path).map_err(|e| {
            miette::miette!(
                help = "Check the path passed to --config, or omit it to use .copair.toml",
                "{}",
                e
            )
        })?,
        None => {
            let default_path = Path::new(".copair.toml");
            if default_path.exists() {
                CopairConfig::from_file(default_path).into_diagnostic()?
            } else {
                CopairConfig::default()
            }
        }
    };

    if let Some(token) = &cli.token {
        config.github.token = Some(token.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.concurrency = to_usize(concurrency);
    }
    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_secs = timeout;
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

fn progress_bar() -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message("Listing commits...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

/// Progress reporting: the quota line is always printed to stderr, the
/// bar only on a terminal.
fn progress_reporter(pb: Option<indicatif::ProgressBar>) -> ProgressCallback {
    Box::new(move |event| {
        if let Progress::QuotaChecked { quota } = &event {
            let line = format!("Remaining rate limit: {quota}");
            match &pb {
                Some(pb) => pb.println(line),
                None => eprintln!("{line}"),
            }
        }
        let Some(pb) = &pb else {
            return;
        };
        match event {
            Progress::QuotaChecked { .. } => pb.set_message("Listing commits..."),
            Progress::PageFetched { page, total_so_far } => {
                pb.set_message(format!("Listed page {page} ({total_so_far} commits)"));
            }
            Progress::FetchingFiles { total } => {
                pb.set_length(total as u64);
                pb.set_position(0);
                if let Ok(style) = indicatif::ProgressStyle::with_template(
                    "{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})",
                ) {
                    pb.set_style(style);
                }
                pb.set_message("Fetching changed files");
            }
            Progress::FilesFetched { completed, .. } => {
                pb.set_position(completed as u64);
            }
            _ => {}
        }
    })
}

fn diagnose(err: CopairError) -> miette::Report {
    match &err {
        CopairError::QuotaExceeded { .. } => miette::miette!(
            help = "Wait for the rate limit window to reset, pass --token, or lower --commits",
            "{}",
            err
        ),
        CopairError::FetchTimeout { .. } => miette::miette!(
            help = "Raise --timeout or lower --commits",
            "{}",
            err
        ),
        CopairError::Api { status: 401, .. } => miette::miette!(
            help = "Check the token passed via --token or GITHUB_TOKEN",
            "{}",
            err
        ),
        CopairError::Api { status: 404, .. } => miette::miette!(
            help = "Check that the repository exists and is readable with your token",
            "{}",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn legacy_flags_are_rewritten() {
        let got = normalize_legacy_args(args(&[
            "copair",
            "-commits=50",
            "-pairs=3",
            "-token",
            "abc",
            "-v",
            "--percent=5",
            "o/r",
        ]));
        assert_eq!(
            got,
            args(&[
                "copair",
                "--commits=50",
                "--pairs=3",
                "--token",
                "abc",
                "-v",
                "--percent=5",
                "o/r",
            ])
        );
    }

    #[test]
    fn selection_from_flags() {
        let cli = Cli::parse_from(["copair", "o/r", "--pairs", "4"]);
        assert_eq!(cli.selection(), Selection::Top(4));
        let cli = Cli::parse_from(["copair", "o/r", "--percent", "10"]);
        assert_eq!(cli.selection(), Selection::Percent(10));
        let cli = Cli::parse_from(["copair", "o/r"]);
        assert_eq!(cli.selection(), Selection::All);
    }

    #[test]
    fn pairs_conflicts_with_percent() {
        assert!(Cli::try_parse_from(["copair", "o/r", "--pairs", "4", "--percent", "10"]).is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(Cli::try_parse_from(["copair", "o/r", "--commits", "0"]).is_err());
        assert!(Cli::try_parse_from(["copair", "o/r", "--percent", "101"]).is_err());
        assert!(Cli::try_parse_from(["copair", "o/r", "--percent", "0"]).is_err());
        assert!(Cli::try_parse_from(["copair", "o/r", "--pairs", "0"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

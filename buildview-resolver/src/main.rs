//! buildview CLI entry point
//!
//! Resolves the view of one repository from the configured storage tiers and
//! prints it as JSON on stdout.
//!
//! Exit codes:
//! - `0` - the view was resolved
//! - `2` - the repository has no known build
//! - `1` - any error (invalid identifiers, bad configuration, corrupt data)

use std::process::ExitCode;

use buildview_core::{BranchName, RepoId, ResolverConfig, StorageConfig};
use buildview_resolver::{
    init_tracing, MetadataResolver, ResolverResult, TelemetryConfig, ViewOutcome,
};
use clap::Parser;

/// Show the build metadata of a repository.
#[derive(Debug, Parser)]
#[command(name = "buildview", version, about)]
struct Cli {
    /// Repository identifier, e.g. `github.com/acme/tool`.
    repo: String,

    /// Branch to show. Defaults to `BUILDVIEW_DEFAULT_BRANCH` or `master`.
    #[arg(short, long, env = "BUILDVIEW_BRANCH")]
    branch: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&TelemetryConfig::from_env()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(outcome @ ViewOutcome::Ready(_)) => match render(&outcome, cli.pretty) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize view");
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
        Ok(outcome) => {
            eprintln!("{}", outcome.user_message().unwrap_or_default());
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> ResolverResult<ViewOutcome> {
    let repo = RepoId::parse(cli.repo.as_str())?;
    let branch = cli
        .branch
        .as_deref()
        .map(BranchName::parse)
        .transpose()?;

    let storage = StorageConfig::from_env()?;
    let config = ResolverConfig::from_env()?;
    let resolver = MetadataResolver::open(&storage, config)?;

    resolver.resolve_view(&repo, branch.as_ref()).await
}

fn render(outcome: &ViewOutcome, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(outcome)
    } else {
        serde_json::to_string(outcome)
    }
}


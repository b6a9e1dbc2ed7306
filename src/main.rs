//! diffctx: budgeted diff-context selection for git repositories.
//!
//! Given a diff range, prints the ordered list of code fragments a reviewer
//! needs to understand the change, subject to a hard token budget.

use clap::{Parser, ValueEnum};
use context_builder::{
    BuildConfig, BuildOptions, DEFAULT_ALPHA, DEFAULT_BUDGET_TOKENS, Error, build_diff_context,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "diffctx",
    version,
    about = "Select the code context a reviewer needs for a diff, under a token budget"
)]
struct Cli {
    /// Diff range: `A..B`, `A...B`, a single revision, or `--staged`.
    #[arg(default_value = "HEAD", allow_hyphen_values = true)]
    range: String,

    /// Token budget for the selection.
    #[arg(long, default_value_t = DEFAULT_BUDGET_TOKENS)]
    budget: u64,

    /// PageRank restart parameter, in [0, 1).
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    /// Early-stop threshold; 0 disables early stopping.
    #[arg(long, default_value_t = 0.0)]
    tau: f64,

    /// Ignore the budget and emit every changed-file fragment.
    #[arg(long)]
    full: bool,

    /// Emit fragments without content payloads.
    #[arg(long)]
    no_content: bool,

    /// Write the result to this file instead of stdout.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Repository root (any directory inside the repository works).
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Yaml,
    Json,
    Text,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "diffctx failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let options = BuildOptions {
        budget_tokens: cli.budget,
        alpha: cli.alpha,
        tau: cli.tau,
        full: cli.full,
        no_content: cli.no_content,
        config: BuildConfig::load_from_env_or_default()?,
    };
    let tree = build_diff_context(&cli.root, &cli.range, &options)?;

    let rendered = match cli.format {
        OutputFormat::Yaml => tree.to_yaml()?,
        OutputFormat::Json => tree.to_json()?,
        OutputFormat::Text => tree.to_text(),
    };
    match &cli.output {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

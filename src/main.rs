//! # dotgit
//!
//! **dotgit** mirrors a web server's exposed `.git/` directory when directory
//! listing is disabled.
//!
//! Usage:
//! - `dotgit https://example.com/.git/` writes to `example.com/.git/`
//! - `dotgit -o out/.git https://example.com/app/.git/`
//! - `git checkout .` inside the parent of the output directory afterwards
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{ArgAction, Parser};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dotgit::{
    Overrides, Progress, RunReport, default_output_dir, load_settings, parse_base_url, run,
};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "dotgit",
    version,
    about = "dotgit - rebuild loose git objects from an exposed .git/ directory",
    arg_required_else_help = true
)]
struct Cli {
    /// Base URL of the exposed repository, ending in `.git/`
    url: String,

    /// Output directory (default: <host><path> of the URL)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum concurrent requests
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Settings file (default: $XDG_CONFIG_HOME/dotgit/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// No spinner and no summary
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dotgit={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn print_summary(report: &RunReport) {
    let line = format!(
        "fetched {} files ({} objects, {} pointer files), {} missing, {} failed",
        report.fetched,
        report.objects,
        report.pointer_files,
        report.not_found,
        report.failures.len()
    );
    match report.exit_code() {
        0 => eprintln!("{} {}", "✔".green(), line),
        2 => eprintln!("{} {} (no refs found, probably not an exposed .git)", "!".yellow(), line),
        _ => {
            eprintln!("{} {}", "✘".red(), line);
            for f in report.failures.iter().filter(|f| !f.tolerated) {
                eprintln!("  {} {}", f.path.to_string().red(), f.message);
            }
        }
    }
}

/// CLI entry point.
///
/// Parses arguments, runs the traversal and exits with the report's code.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let base = parse_base_url(&cli.url)?;
    let output = cli.output.clone().unwrap_or_else(|| default_output_dir(&base));
    let cfg = load_settings(cli.config.as_deref())?.resolve(Overrides {
        jobs: cli.jobs,
        timeout_secs: cli.timeout,
        user_agent: cli.user_agent.clone(),
    })?;

    let progress = if !cli.quiet && cli.verbose == 0 && std::io::stderr().is_terminal() {
        Progress::spinner()
    } else {
        Progress::hidden()
    };

    tracing::info!(url = %base, output = %output.display(), jobs = cfg.jobs, "starting");
    let report = run(&base, &output, &cfg, progress)?;
    if !cli.quiet {
        print_summary(&report);
    }

    match report.exit_code() {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

//! CLI entry point for batch720
//!
//! Parses command line arguments, sets up the run log and converts the
//! input directory once.

use batch720::{init_logging, Config, RunLayout, Runner};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// batch720 - Convert every video in a directory to 720p MP4
#[derive(Parser, Debug)]
#[command(name = "batch720")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the videos to convert
    #[arg(short, long, default_value = ".")]
    input_dir: PathBuf,

    /// Path to a configuration file (config.toml); defaults apply without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of simultaneous encodes (0 derives it from the CPU count)
    #[arg(short, long, default_value_t = 0)]
    jobs: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::from(1);
            }
        },
        None => Config::from_env(),
    };

    let layout = RunLayout::resolve(&args.input_dir, &config.directories);
    let log = match init_logging(&layout.log_dir) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            return ExitCode::from(1);
        }
    };
    info!("Log file: {}", log.path.display());
    info!("Input directory: {}", layout.input_dir.display());

    let runner = match Runner::new(config, &args.input_dir, args.jobs) {
        Ok(runner) => runner,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(1);
        }
    };

    info!(
        "{} logical cores, up to {} concurrent encodes",
        runner.concurrency_plan.total_cores, runner.concurrency_plan.max_concurrent_jobs
    );

    match runner.run().await {
        Ok(report) => ExitCode::from(report.exit_status()),
        Err(e) => {
            error!("Run error: {}", e);
            ExitCode::from(1)
        }
    }
}

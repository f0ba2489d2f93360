//! gokrazy kernel builder
//!
//! Downloads the pinned Raspberry Pi kernel snapshot, injects the board
//! defconfig, applies the local `*.patch` files and cross-compiles the kernel
//! image, device trees and modules into the staging directory.
//!
//! Usage:
//!   gokr_build_kernel [--work-dir DIR] [--config FILE] [--jobs N] [--verbose]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use gokr_build_kernel::config::loader::resolve_config;
use gokr_build_kernel::log_collector::logs_path_for;
use gokr_build_kernel::{BuildConfig, BuildOrchestrator, LogCollector, SystemRunner};

#[derive(Parser, Debug)]
#[command(name = "gokr_build_kernel", version)]
#[command(about = "Cross-compile the pinned Raspberry Pi kernel and device trees")]
struct Cli {
    /// JSON configuration overriding the pinned defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Invocation directory holding the defconfig and patches (default: cwd)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Parallel make jobs (default: one per processing unit)
    #[arg(long)]
    jobs: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let mut config = resolve_config(cli.config.as_deref()).context("Loading configuration")?;
    if let Some(jobs) = cli.jobs {
        config.jobs = Some(jobs);
        config.validate().context("Validating --jobs")?;
    }
    Ok(config)
}

fn resolve_work_dir(cli: &Cli) -> Result<PathBuf> {
    let dir = match &cli.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Determining current directory")?,
    };
    std::fs::canonicalize(&dir).with_context(|| format!("Resolving work dir {}", dir.display()))
}

fn init_logging(work_dir: &Path, verbose: bool) -> Result<LogCollector> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let collector = LogCollector::new(logs_path_for(work_dir), level, true)
        .map_err(anyhow::Error::msg)
        .context("Initializing run log")?;
    collector
        .install()
        .map_err(|e| anyhow::anyhow!("Registering LogCollector as global logger: {}", e))?;
    Ok(collector)
}

fn run(cli: &Cli, work_dir: &Path) -> Result<()> {
    let config = load_config(cli)?;
    log::info!(
        "[Build] gokr_build_kernel {} in {}",
        gokr_build_kernel::VERSION,
        work_dir.display()
    );

    let runner = SystemRunner;
    let mut orchestrator = BuildOrchestrator::new(config, work_dir.to_path_buf(), &runner);
    let report = orchestrator.run()?;

    for artifact in &report.artifacts {
        log::info!("[Harvest] {}", artifact.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.print_config {
        let printed = load_config(&cli).and_then(|config| {
            serde_json::to_string_pretty(&config).context("Serializing configuration")
        });
        match printed {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let setup = resolve_work_dir(&cli)
        .and_then(|work_dir| init_logging(&work_dir, cli.verbose).map(|c| (work_dir, c)));
    let (work_dir, collector) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    log::debug!("[Log] writing run log to {}", collector.session_log_path().display());

    let code = match run(&cli, &work_dir) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:#}", e);
            1
        }
    };

    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Log] {}", e);
    }
    std::process::exit(code);
}

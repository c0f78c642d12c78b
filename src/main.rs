//! Outlook Profiler - Main Entry Point
//!
//! This is the main entry point for the command line tool.
//! The actual implementation is in the `outlook_profiler` library.

use anyhow::Result;
use clap::Parser;
use outlook_profiler::{OperationRequest, Profiler, RunLog};
use tracing_subscriber::EnvFilter;

/// Outlook Profiler - export, convert and import Outlook mail profiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings such as Export2013=C:\out.reg, Import=C:\in.reg, Options=..., TargetProfile=...,
    /// SourceProfile=..., TargetVersion=2013|2016, Log=..., IgnoreDefault
    #[arg(value_name = "SETTING")]
    settings: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let request = OperationRequest::from_args(&args.settings);
    let log = RunLog::open_or_console(request.log_path.as_deref());

    // Outcomes are reported as text; the exit code stays 0
    let status = Profiler::new(registry_store(), &log).run(&request);
    tracing::debug!(?status, "run finished");
    Ok(())
}

#[cfg(windows)]
fn registry_store() -> outlook_profiler::WindowsRegistry {
    outlook_profiler::WindowsRegistry::new()
}

#[cfg(not(windows))]
fn registry_store() -> outlook_profiler::MemoryStore {
    tracing::warn!("the Windows registry is not available on this platform; using an empty store");
    outlook_profiler::MemoryStore::new()
}

//! Command-line front end for the output monitor.
//!
//! Runs a program repeatedly until it exits successfully or the timeout
//! elapses. Useful in scripts that wait for a service to come up:
//!
//! ```text
//! fomon --interval 0.5 --timeout 30 -- curl -sf http://localhost:8080/health
//! ```

use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use function_output_monitor::tracing::prelude::*;
use function_output_monitor::{Monitor, MonitorConfig, MonitorError};

/// Exit code when the program never succeeded before the deadline.
const EXIT_TIMEOUT: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "fomon", version, about = "Re-run a program until it succeeds or time runs out")]
struct Args {
    /// Seconds between attempts
    #[arg(short, long, default_value = "1", value_parser = parse_secs)]
    interval: Duration,

    /// Seconds before giving up
    #[arg(short, long, default_value = "30", value_parser = parse_secs)]
    timeout: Duration,

    /// Discard the program's stdout and stderr
    #[arg(short, long)]
    quiet: bool,

    /// Program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{s:?} is not a number: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{s:?} is not a valid duration: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    function_output_monitor::tracing::init_subscriber();
    let args = Args::parse();

    let config = MonitorConfig::new(args.interval, args.timeout);
    if let Err(e) = config.validate() {
        // Exits with clap's usage-error status, same as any other bad flag.
        Args::command().error(ErrorKind::InvalidValue, e).exit();
    }

    let (program, program_args) = args
        .command
        .split_first()
        .context("no program given")?;

    info!(%program, interval = ?config.interval, timeout = ?config.timeout, "Monitoring");

    let outcome = Monitor::new(config)
        .on_timeout(|| warn!("Program never succeeded"))
        .run(
            || run_once(program, program_args, args.quiet),
            // A program that cannot be spawned will never succeed, so stop
            // on spawn errors too and report them below.
            |status| !matches!(status, Ok(s) if !s.success()),
        )
        .await;

    match outcome {
        Ok(Ok(_)) => {
            info!("Program succeeded");
            Ok(())
        }
        Ok(Err(e)) => Err(e).with_context(|| format!("failed to run {program}")),
        Err(MonitorError::Timeout { timeout }) => {
            eprintln!("Timed out after {:.3}s", timeout.as_secs_f64());
            std::process::exit(EXIT_TIMEOUT);
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the program to completion once.
fn run_once(program: &str, args: &[String], quiet: bool) -> std::io::Result<ExitStatus> {
    let mut command = Command::new(program);
    command.args(args);
    if quiet {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = tokio::task::block_in_place(|| command.status());
    if let Ok(status) = &status {
        debug!(%status, "Attempt finished");
    }
    status
}

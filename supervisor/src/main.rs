//! CLI for the Ralph Mode run supervisor.
//!
//! Each subcommand maps to one control-boundary operation and prints the
//! JSON response body. Errors print `{ "error": ... }` to stderr and exit
//! with a stable code (see [`supervisor::exit_codes`]).

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use supervisor::api::{self, ControlRequest, ErrorBody};
use supervisor::controller::{ControlError, RunController};
use supervisor::core::types::ResultReport;
use supervisor::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "supervisor",
    version,
    about = "Console core supervising Ralph Mode agent loops"
)]
struct Cli {
    /// Directory holding the `.ralph/` state tree.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a run in ACTIVE state with the loop disengaged.
    Create { run_id: String },
    /// Engage ralph mode and open iteration #1.
    Start { run_id: String },
    /// Force-stop the run (records a HUMAN_ABORT).
    Stop {
        run_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Approve a paused iteration and open the next one.
    Approve { run_id: String },
    /// Record an iteration result (JSON report from --report or stdin).
    Record {
        run_id: String,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print a read-only snapshot of the run.
    Show { run_id: String },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        let body = ErrorBody::from_error(&err);
        eprintln!(
            "{}",
            serde_json::to_string(&body).unwrap_or_else(|_| body.error.clone())
        );
        std::process::exit(exit_codes::from_status(err.http_status()));
    }
}

fn run() -> Result<(), ControlError> {
    let cli = Cli::parse();
    let controller = RunController::new(&cli.root);

    match cli.command {
        Command::Create { run_id } => print_json(&controller.create_run(&run_id)?),
        Command::Start { run_id } => {
            let body = api::handle_control(&controller, &run_id, &control("start", None))?;
            print_json(&body)
        }
        Command::Stop { run_id, reason } => {
            let body = api::handle_control(&controller, &run_id, &control("stop", reason))?;
            print_json(&body)
        }
        Command::Approve { run_id } => {
            let body = api::handle_control(&controller, &run_id, &control("approve", None))?;
            print_json(&body)
        }
        Command::Record { run_id, report } => {
            let report = read_report(report.as_deref())?;
            let response = api::handle_record_result(&controller, &run_id, &report)?;
            print_json(&response)
        }
        Command::Show { run_id } => print_json(&controller.show(&run_id)?),
    }
}

fn control(action: &str, reason: Option<String>) -> ControlRequest {
    ControlRequest {
        action: action.to_string(),
        reason,
    }
}

fn read_report(path: Option<&std::path::Path>) -> Result<ResultReport, ControlError> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| ControlError::InvalidReport(format!("read report: {err}")))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| ControlError::InvalidReport(format!("read stdin: {err}")))?;
            buf
        }
    };
    serde_json::from_str(&raw).map_err(|err| ControlError::InvalidReport(err.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ControlError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| ControlError::Internal(err.into()))?;
    println!("{rendered}");
    Ok(())
}

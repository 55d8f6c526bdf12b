//! flowline CLI — drive a line-oriented work list through the engine.
//!
//! Each non-blank input line becomes one work unit; a subprocess runs per
//! unit with the line's whitespace-separated fields appended to its
//! arguments, and its exit status decides success. Outcomes land in
//! append-only success/failure logs, and an optional record file lets a
//! rerun skip what is already done.

mod logging;

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;
use ulid::Ulid;

use flowline_core::limiter::PermitLimit;
use flowline_core::observability::FlowCounts;
use flowline_core::providers::LineFileProvider;
use flowline_core::store::FileOverseer;
use flowline_core::{
    interrupt, BatchOutcome, CodeError, ErrorCode, EventListener, Flow, FlowResult, Info, Redo,
    WorkInfo, WorkRecord, Worker, WorkerProvider,
};

/// Error codes minted for subprocess outcomes: 1000 + exit status.
const EXIT_CODE_BASE: i32 = 1000;

/// sysexits EX_TEMPFAIL; a worker exiting with it signals throttling.
const EXIT_TEMPFAIL: i32 = 75;

#[derive(Parser)]
#[command(name = "flowline", about = "Batched work-list runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a work list through a per-line command
    Run {
        /// Work list: one unit per line
        #[arg(long)]
        input: PathBuf,
        /// Program (after `--`) run per unit; line fields are appended as
        /// arguments, e.g. `flowline run --input list.txt -- curl -fsO`
        #[arg(last = true, required = true)]
        cmd: Vec<String>,
        /// Concurrent workers
        #[arg(long, default_value_t = 1)]
        worker_count: usize,
        /// Units per worker call
        #[arg(long, default_value_t = 1)]
        batch_size: usize,
        /// Stop the whole run on the first failed unit
        #[arg(long)]
        stop_on_error: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
        /// Durable record file; reruns skip units recorded there
        #[arg(long)]
        record_file: Option<PathBuf>,
        /// With a record file: re-run units whose prior attempt failed
        #[arg(long)]
        redo_failures: bool,
        /// Append succeeded lines here
        #[arg(long)]
        success_log: Option<PathBuf>,
        /// Append failed lines (with the error) here
        #[arg(long)]
        failure_log: Option<PathBuf>,
        /// Cap on units in flight; shrinks when workers report throttling
        #[arg(long)]
        max_in_flight: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            cmd,
            worker_count,
            batch_size,
            stop_on_error,
            force,
            record_file,
            redo_failures,
            success_log,
            failure_log,
            max_in_flight,
        } => {
            cmd_run(RunArgs {
                input,
                cmd,
                worker_count,
                batch_size,
                stop_on_error,
                force,
                record_file,
                redo_failures,
                success_log,
                failure_log,
                max_in_flight,
            })
            .await
        }
    }
}

struct RunArgs {
    input: PathBuf,
    cmd: Vec<String>,
    worker_count: usize,
    batch_size: usize,
    stop_on_error: bool,
    force: bool,
    record_file: Option<PathBuf>,
    redo_failures: bool,
    success_log: Option<PathBuf>,
    failure_log: Option<PathBuf>,
    max_in_flight: Option<i64>,
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let run_id = Ulid::new();
    info!(%run_id, input = %args.input.display(), "starting run");

    let provider = LineFileProvider::open(&args.input, parse_line)
        .with_context(|| format!("cannot open work list {}", args.input.display()))?;

    let (program, fixed_args) = args
        .cmd
        .split_first()
        .context("a command to run per unit is required")
        .map(|(p, rest)| (p.clone(), rest.to_vec()))?;

    let counts = Arc::new(FlowCounts::new());
    let listener = build_listener(
        counts.clone(),
        open_append(args.success_log.as_deref())?,
        open_append(args.failure_log.as_deref())?,
    );

    let mut builder = Flow::builder(Info {
        force: args.force,
        worker_count: args.worker_count,
        stop_when_work_error: args.stop_on_error,
        batch_max: args.batch_size,
    })
    .work_provider(Arc::new(provider))
    .worker_provider(Arc::new(CmdWorkerProvider {
        program,
        fixed_args,
    }))
    .listener(listener)
    .confirm(confirm_run);

    if let Some(path) = &args.record_file {
        let overseer = FileOverseer::open(path)
            .with_context(|| format!("cannot open record file {}", path.display()))?;
        builder = builder.overseer(Arc::new(overseer));
        if args.redo_failures {
            builder = builder.redo(Arc::new(RedoFailures));
        }
    }

    if let Some(cap) = args.max_in_flight {
        builder = builder.limit(Arc::new(
            PermitLimit::new(cap)
                .limit_code(ErrorCode(EXIT_CODE_BASE + EXIT_TEMPFAIL))
                .with_recovery(Duration::from_secs(30)),
        ));
    }

    tokio::spawn(async {
        tokio::signal::ctrl_c().await.ok();
        info!("interrupt received, finishing in-flight work");
        interrupt::set_interrupted();
    });

    flowline_core::run(builder.build()).await;

    let snapshot = counts.snapshot();
    println!("--------- Run Summary ---------");
    println!("{snapshot}");
    info!(%run_id, "run finished");
    Ok(())
}

/// Whitespace-separated fields become the unit's payload.
fn parse_line(line: &str) -> Result<serde_json::Value, CodeError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Err(CodeError::param_missing("empty unit"));
    }
    Ok(serde_json::json!({ "args": fields }))
}

fn open_append(path: Option<&std::path::Path>) -> anyhow::Result<Option<Arc<Mutex<File>>>> {
    match path {
        None => Ok(None),
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Ok(Some(Arc::new(Mutex::new(file))))
        }
    }
}

fn append_line(file: &Arc<Mutex<File>>, line: &str) {
    let mut file = file.lock().expect("log file lock");
    if let Err(e) = writeln!(file, "{line}") {
        tracing::error!("log write failed: {e}");
    }
}

fn build_listener(
    counts: Arc<FlowCounts>,
    success_log: Option<Arc<Mutex<File>>>,
    failure_log: Option<Arc<Mutex<File>>>,
) -> EventListener {
    let on_success_counts = counts.clone();
    let on_fail_counts = counts.clone();
    let on_skip_counts = counts;

    EventListener::new()
        .on_work_success(move |work, _| {
            on_success_counts.add_success();
            info!(unit = work.data(), "work done");
            if let Some(log) = &success_log {
                append_line(log, work.data());
            }
        })
        .on_work_fail(move |work, err| {
            on_fail_counts.add_fail();
            tracing::error!(unit = work.data(), "work failed: {err}");
            if let Some(log) = &failure_log {
                append_line(log, &format!("{}\t{}", work.data(), err));
            }
        })
        .on_work_skip(move |work, _, cause| {
            on_skip_counts.add_skip();
            match cause {
                Some(cause) => info!(unit = work.data(), "work skipped: {cause}"),
                None => info!(unit = work.data(), "work skipped"),
            }
        })
}

/// Interactive gate used when `--force` is absent.
fn confirm_run() -> bool {
    eprint!("proceed with the run? [y/N] ");
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

/// Re-admit units whose recorded attempt did not succeed.
struct RedoFailures;

impl Redo for RedoFailures {
    fn should_redo(&self, _work: &WorkInfo, prior: &WorkRecord) -> (bool, Option<CodeError>) {
        if prior.is_success() {
            (false, None)
        } else {
            (
                true,
                Some(CodeError::new(
                    ErrorCode(EXIT_CODE_BASE),
                    "prior attempt failed",
                )),
            )
        }
    }
}

/// Exit status of a finished unit command.
#[derive(Debug)]
struct ExitResult {
    status: i32,
}

impl FlowResult for ExitResult {
    fn is_valid(&self) -> bool {
        self.status == 0
    }

    fn summary(&self) -> String {
        format!("exit {}", self.status)
    }
}

struct CmdWorkerProvider {
    program: String,
    fixed_args: Vec<String>,
}

#[async_trait]
impl WorkerProvider for CmdWorkerProvider {
    async fn provide(&self) -> Result<Box<dyn Worker>, CodeError> {
        Ok(Box::new(CmdWorker {
            program: self.program.clone(),
            fixed_args: self.fixed_args.clone(),
        }))
    }
}

/// Runs the configured program once per unit, sequentially within a batch.
struct CmdWorker {
    program: String,
    fixed_args: Vec<String>,
}

impl CmdWorker {
    async fn run_unit(&self, info: &WorkInfo) -> WorkRecord {
        let unit_args: Vec<String> = info
            .work()
            .and_then(|w| w.get("args"))
            .and_then(|a| a.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let output = tokio::process::Command::new(&self.program)
            .args(&self.fixed_args)
            .args(&unit_args)
            .output()
            .await;

        match output {
            Err(e) => WorkRecord::fail(info.clone(), CodeError::local_io(e)),
            Ok(output) if output.status.success() => {
                WorkRecord::success(info.clone(), Arc::new(ExitResult { status: 0 }))
            }
            Ok(output) => {
                let status = output.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = stderr.lines().next().unwrap_or("command failed");
                WorkRecord::fail(
                    info.clone(),
                    CodeError::new(ErrorCode(EXIT_CODE_BASE + status), reason),
                )
            }
        }
    }
}

#[async_trait]
impl Worker for CmdWorker {
    async fn do_work(&mut self, batch: &[WorkInfo]) -> BatchOutcome {
        let mut records = Vec::with_capacity(batch.len());
        for info in batch {
            records.push(self.run_unit(info).await);
        }
        BatchOutcome::records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_splits_fields() {
        let work = parse_line("put bucket/key  local.txt").unwrap();
        assert_eq!(work["args"][0], "put");
        assert_eq!(work["args"][2], "local.txt");
    }

    #[test]
    fn redo_failures_only_redoes_failures() {
        let redo = RedoFailures;
        let work = WorkInfo::new("u", serde_json::json!({}));

        let failed = WorkRecord::fail(work.clone(), CodeError::param_missing("x"));
        let (again, cause) = redo.should_redo(&work, &failed);
        assert!(again);
        assert!(cause.is_some());

        let done = WorkRecord::success(work.clone(), Arc::new(ExitResult { status: 0 }));
        let (again, _) = redo.should_redo(&work, &done);
        assert!(!again);
    }

    #[tokio::test]
    async fn cmd_worker_maps_exit_status_to_records() {
        let mut worker = CmdWorker {
            program: "sh".to_string(),
            fixed_args: vec!["-c".to_string(), "exit $0".to_string()],
        };

        let batch = vec![
            WorkInfo::new("ok", serde_json::json!({ "args": ["0"] })),
            WorkInfo::new("bad", serde_json::json!({ "args": ["3"] })),
        ];
        let outcome = worker.do_work(&batch).await;

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records[0].is_success());
        assert_eq!(
            outcome.records[1].err.as_ref().unwrap().code,
            ErrorCode(EXIT_CODE_BASE + 3)
        );
    }
}

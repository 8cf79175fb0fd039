//! Sequential execution of planned operations with outcome classification.
//!
//! Command invocation is an injected capability so the executor is testable
//! without the real change-tracking CLI. Per-row failures never abort the
//! batch; only a transport-level inability to invoke the tool at all does,
//! and even then every remaining operation gets an explained result.
use crate::extract::extract_generated_id;
use crate::plan::PlannedOperation;
use crate::util::{timestamp_now, truncate_with_marker};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Cap on stored CLI output per execution result.
pub const MAX_CLI_OUTPUT_BYTES: usize = 2000;

/// How long to wait for output collection after killing a timed-out child.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Transport-level invocation failures. Any of these is fatal for the rest
/// of the batch; a command that runs and exits non-zero is not an error
/// here, it is a classified failure.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("unparseable command line: {0}")]
    Parse(String),
    #[error("empty command line")]
    EmptyCommand,
    #[error("external command '{program}' is unavailable: {reason}")]
    Unavailable { program: String, reason: String },
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting on '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured outcome of one external command invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Capability that runs one external process per call, blocking.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<RunOutput, RunnerError>;
}

/// Real runner: parses the rendered command back into argv, resolves the
/// program on PATH, and spawns it directly with a kill-on-timeout guard.
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<RunOutput, RunnerError> {
        let argv = shell_words::split(command).map_err(|err| RunnerError::Parse(err.to_string()))?;
        let Some((program, args)) = argv.split_first() else {
            return Err(RunnerError::EmptyCommand);
        };
        let resolved = which::which(program).map_err(|err| RunnerError::Unavailable {
            program: program.clone(),
            reason: err.to_string(),
        })?;

        let child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: program.clone(),
                source,
            })?;
        let pid = child.id();

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _ = sender.send(child.wait_with_output());
        });

        let (collected, timed_out) = match receiver.recv_timeout(self.timeout) {
            Ok(collected) => (Some(collected), false),
            Err(_) => {
                kill_child(pid);
                (receiver.recv_timeout(KILL_GRACE).ok(), true)
            }
        };

        match collected {
            Some(Ok(output)) => Ok(RunOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                timed_out,
            }),
            Some(Err(source)) => Err(RunnerError::Wait {
                program: program.clone(),
                source,
            }),
            None => Ok(RunOutput {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            }),
        }
    }
}

#[cfg(unix)]
fn kill_child(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_child(_pid: u32) {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Simulated,
}

impl ExecutionStatus {
    /// Ledger-facing label.
    pub fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "Success",
            ExecutionStatus::Failure => "Failed",
            ExecutionStatus::Simulated => "Simulated",
        }
    }
}

/// A planned operation plus what happened when it ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(flatten)]
    pub operation: PlannedOperation,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_id: Option<String>,
    pub cli_output: String,
    pub timestamp: String,
}

/// All results in execution order, plus the fatal condition when the batch
/// was truncated.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub results: Vec<ExecutionResult>,
    pub fatal: Option<String>,
}

/// Run (or simulate) every planned operation, strictly in list order.
pub fn execute(
    operations: &[PlannedOperation],
    dry_run: bool,
    runner: &dyn CommandRunner,
) -> ExecutionOutcome {
    let mut results = Vec::with_capacity(operations.len());
    let mut fatal: Option<String> = None;

    for planned in operations {
        if dry_run {
            tracing::info!(operation = %planned.operation, row = planned.row, "simulated");
            results.push(ExecutionResult {
                operation: planned.clone(),
                status: ExecutionStatus::Simulated,
                generated_id: None,
                cli_output: String::new(),
                timestamp: timestamp_now(),
            });
            continue;
        }
        if let Some(reason) = &fatal {
            results.push(failure(planned, format!("not attempted: {reason}")));
            continue;
        }
        tracing::info!(
            operation = %planned.operation,
            row = planned.row,
            command = %planned.command,
            "executing"
        );
        match runner.run(&planned.command) {
            Ok(output) => results.push(classify(planned, output)),
            Err(err) => {
                tracing::error!(
                    operation = %planned.operation,
                    row = planned.row,
                    error = %err,
                    "command invocation failed; remaining operations will not be attempted"
                );
                let reason = err.to_string();
                results.push(failure(planned, reason.clone()));
                fatal = Some(reason);
            }
        }
    }

    ExecutionOutcome { results, fatal }
}

fn classify(planned: &PlannedOperation, output: RunOutput) -> ExecutionResult {
    let mut combined = output.stdout;
    if !output.stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&output.stderr);
    }
    if output.timed_out {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str("[command timed out]");
    }

    let success = !output.timed_out && output.exit_code == Some(0);
    let generated_id = if success {
        extract_generated_id(&combined)
    } else {
        None
    };
    if success {
        tracing::info!(
            operation = %planned.operation,
            row = planned.row,
            generated_id = generated_id.as_deref().unwrap_or("<none>"),
            "command succeeded"
        );
    } else {
        tracing::warn!(
            operation = %planned.operation,
            row = planned.row,
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            "command failed"
        );
    }

    ExecutionResult {
        operation: planned.clone(),
        status: if success {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failure
        },
        generated_id,
        cli_output: truncate_with_marker(&combined, MAX_CLI_OUTPUT_BYTES),
        timestamp: timestamp_now(),
    }
}

fn failure(planned: &PlannedOperation, reason: String) -> ExecutionResult {
    ExecutionResult {
        operation: planned.clone(),
        status: ExecutionStatus::Failure,
        generated_id: None,
        cli_output: reason,
        timestamp: timestamp_now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::TRUNCATION_MARKER;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn planned(name: &str, row: usize) -> PlannedOperation {
        PlannedOperation {
            operation: name.to_string(),
            sheet: "Create Fail Modes".to_string(),
            row,
            command: format!("im createissue '--type=Fail Mode' '--field=Name=row {row}'"),
            input_data: BTreeMap::new(),
        }
    }

    /// Scripted runner: replays canned outcomes and records every command.
    struct StubRunner {
        outcomes: RefCell<Vec<Result<RunOutput, RunnerError>>>,
        calls: RefCell<Vec<String>>,
    }

    impl StubRunner {
        fn new(outcomes: Vec<Result<RunOutput, RunnerError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl CommandRunner for StubRunner {
        fn run(&self, command: &str) -> Result<RunOutput, RunnerError> {
            self.calls.borrow_mut().push(command.to_string());
            self.outcomes.borrow_mut().remove(0)
        }
    }

    fn ok_output(exit_code: i32, stdout: &str) -> Result<RunOutput, RunnerError> {
        Ok(RunOutput {
            exit_code: Some(exit_code),
            stdout: stdout.to_string(),
            stderr: String::new(),
            timed_out: false,
        })
    }

    #[test]
    fn dry_run_simulates_without_invoking() {
        let runner = StubRunner::new(Vec::new());
        let operations = vec![planned("Create Fail Mode", 1), planned("Create Fail Mode", 2)];
        let outcome = execute(&operations, true, &runner);

        assert_eq!(runner.call_count(), 0);
        assert!(outcome.fatal.is_none());
        assert_eq!(outcome.results.len(), 2);
        for result in &outcome.results {
            assert_eq!(result.status, ExecutionStatus::Simulated);
            assert_eq!(result.cli_output, "");
            assert!(result.generated_id.is_none());
        }
    }

    #[test]
    fn success_extracts_generated_id() {
        let runner = StubRunner::new(vec![ok_output(
            0,
            "Created Fail Mode FM-20240115-0007 successfully",
        )]);
        let outcome = execute(&[planned("Create Fail Mode", 1)], false, &runner);
        let result = &outcome.results[0];
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.generated_id.as_deref(), Some("FM-20240115-0007"));
    }

    #[test]
    fn nonzero_exit_does_not_stop_the_batch() {
        let runner = StubRunner::new(vec![
            ok_output(0, "Created FM-20240115-0001 ok"),
            ok_output(3, "Error: invalid field"),
            ok_output(0, "Created FM-20240115-0003 ok"),
        ]);
        let operations = vec![
            planned("Create Fail Mode", 1),
            planned("Create Fail Mode", 2),
            planned("Create Fail Mode", 3),
        ];
        let outcome = execute(&operations, false, &runner);

        assert_eq!(runner.call_count(), 3);
        assert!(outcome.fatal.is_none());
        let statuses: Vec<ExecutionStatus> =
            outcome.results.iter().map(|result| result.status).collect();
        assert_eq!(
            statuses,
            vec![
                ExecutionStatus::Success,
                ExecutionStatus::Failure,
                ExecutionStatus::Success
            ]
        );
        assert!(outcome.results[1].generated_id.is_none());
    }

    #[test]
    fn fatal_error_short_circuits_remaining_operations() {
        let runner = StubRunner::new(vec![Err(RunnerError::Unavailable {
            program: "im".to_string(),
            reason: "cannot find binary path".to_string(),
        })]);
        let operations = vec![
            planned("Create Fail Mode", 1),
            planned("Create Fail Mode", 2),
            planned("Create Fail Mode", 3),
        ];
        let outcome = execute(&operations, false, &runner);

        assert_eq!(runner.call_count(), 1);
        assert!(outcome.fatal.is_some());
        assert_eq!(outcome.results.len(), 3);
        for result in &outcome.results {
            assert_eq!(result.status, ExecutionStatus::Failure);
        }
        assert!(outcome.results[1].cli_output.starts_with("not attempted:"));
        assert!(outcome.results[2].cli_output.contains("unavailable"));
    }

    #[test]
    fn timeout_is_classified_as_failure_with_indication() {
        let runner = StubRunner::new(vec![Ok(RunOutput {
            exit_code: None,
            stdout: "partial".to_string(),
            stderr: String::new(),
            timed_out: true,
        })]);
        let outcome = execute(&[planned("Create Fail Mode", 1)], false, &runner);
        let result = &outcome.results[0];
        assert_eq!(result.status, ExecutionStatus::Failure);
        assert!(result.cli_output.contains("[command timed out]"));
        assert!(result.generated_id.is_none());
    }

    #[test]
    fn stored_output_is_truncated_with_marker() {
        let long = "x".repeat(MAX_CLI_OUTPUT_BYTES + 500);
        let runner = StubRunner::new(vec![ok_output(0, &long)]);
        let outcome = execute(&[planned("Create Fail Mode", 1)], false, &runner);
        let result = &outcome.results[0];
        assert!(result.cli_output.len() <= MAX_CLI_OUTPUT_BYTES + TRUNCATION_MARKER.len());
        assert!(result.cli_output.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn stderr_is_appended_to_stored_output() {
        let runner = StubRunner::new(vec![Ok(RunOutput {
            exit_code: Some(2),
            stdout: "starting".to_string(),
            stderr: "Error: connection refused".to_string(),
            timed_out: false,
        })]);
        let outcome = execute(&[planned("Create Fail Mode", 1)], false, &runner);
        assert_eq!(
            outcome.results[0].cli_output,
            "starting\nError: connection refused"
        );
    }

    #[test]
    fn shell_runner_reports_unavailable_program() {
        let runner = ShellRunner::new(Duration::from_secs(5));
        let err = runner
            .run("definitely-not-a-real-binary-4719 --flag")
            .expect_err("unresolvable program");
        assert!(matches!(err, RunnerError::Unavailable { .. }));
    }

    #[test]
    fn shell_runner_captures_real_output() {
        if which::which("echo").is_err() {
            return;
        }
        let runner = ShellRunner::new(Duration::from_secs(5));
        let output = runner.run("echo hello world").expect("run echo");
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(!output.timed_out);
    }

    #[test]
    fn shell_runner_kills_on_timeout() {
        if which::which("sleep").is_err() {
            return;
        }
        let runner = ShellRunner::new(Duration::from_millis(100));
        let output = runner.run("sleep 5").expect("run sleep");
        assert!(output.timed_out);
    }
}

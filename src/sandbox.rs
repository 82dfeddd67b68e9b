//! Sandbox executor
//!
//! Executes the (generated harness, student source, limits) triple inside a
//! disposable container. Every run gets a fresh workspace directory staged
//! under the system temp dir, mounted read-only at `/workspace`; the only
//! writable surface inside the container is a small `noexec` tmpfs at
//! `/tmp`. The container has no network, a memory cap with swap pinned to
//! the same value, one CPU, a process cap, and all capabilities dropped.
//!
//! Two clocks apply: the harness enforces the per-case timeout internally
//! (via `RUN_TIMEOUT`), and this executor enforces the overall submission
//! budget plus grace on the container process. On every exit path the
//! container is force-removed by name and the workspace is destroyed.

use crate::generate::{REPORT_BEGIN_MARKER, REPORT_END_MARKER};
use crate::runtime::Runtime;
use log::{debug, warn};
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Mount point of the workspace inside the container.
pub const WORKSPACE_MOUNT: &str = "/workspace";
/// Where the harness writes its report (on the container tmpfs).
pub const REPORT_PATH_IN_CONTAINER: &str = "/tmp/report.xml";
/// Filename the harness is staged as, under `tests/`.
pub const HARNESS_FILENAME: &str = "test_runner.py";

const TMPFS_SPEC: &str = "/tmp:rw,noexec,nosuid,nodev,size=64m";
const TAIL_LEN: usize = 4_000;
const REAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolved resource limits for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Per-case deadline enforced inside the harness
    pub timeout_s: u32,
    /// Whole-submission budget enforced by the executor
    pub overall_timeout_s: u32,
    /// Container memory cap; swap is pinned to the same value
    pub memory_mb: u32,
}

/// Captured result bundle of one sandbox run
#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    pub report_bytes: Option<Vec<u8>>,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub exit_code: Option<i32>,
    pub wall_time_s: f64,
    pub host_timeout_fired: bool,
    pub oom_indicated: bool,
    pub cancelled: bool,
}

/// A failure of the sandbox itself (not of the student code). Transient
/// failures may be retried once by the orchestrator.
#[derive(Debug, Clone)]
pub struct SandboxFailure {
    pub message: String,
    pub transient: bool,
}

impl SandboxFailure {
    fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }
}

impl std::fmt::Display for SandboxFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SandboxFailure {}

/// Launches disposable containers through the host's docker CLI.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    /// Seconds added to the overall budget before the host clock fires
    pub grace_s: u32,
}

impl Default for SandboxExecutor {
    fn default() -> Self {
        Self { grace_s: 2 }
    }
}

impl SandboxExecutor {
    pub fn new(grace_s: u32) -> Self {
        Self { grace_s }
    }

    /// Run one submission. The returned outcome covers every non-sandbox
    /// result (passing, failing, timing out, OOM); `Err` means the sandbox
    /// itself could not do its job.
    pub async fn execute(
        &self,
        job_id: &str,
        runtime: &Runtime,
        harness: &str,
        student_source: &str,
        limits: &Limits,
        cancel: &CancellationToken,
    ) -> std::result::Result<ExecOutcome, SandboxFailure> {
        let workspace = stage_workspace(runtime, harness, student_source)
            .map_err(|e| SandboxFailure::fatal(format!("workspace staging failed: {}", e)))?;

        let name = container_name(job_id);
        let args = docker_run_args(&name, runtime, workspace.path(), limits);
        debug!("[{}] docker {}", job_id, args.join(" "));

        let mut command = tokio::process::Command::new("docker");
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SandboxFailure::fatal(
                    "docker was not found on PATH; it is required to run submissions safely",
                ));
            }
            Err(e) => {
                return Err(SandboxFailure::transient(format!(
                    "failed to launch container: {}",
                    e
                )));
            }
        };

        let host_budget =
            Duration::from_secs(u64::from((limits.overall_timeout_s + self.grace_s).max(2)));
        let wait = tokio::time::timeout(host_budget, child.wait_with_output());
        tokio::pin!(wait);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("[{}] cancelled; stopping container {}", job_id, name);
                stop_container(&name).await;
                ExecOutcome {
                    cancelled: true,
                    wall_time_s: started.elapsed().as_secs_f64(),
                    ..Default::default()
                }
            }
            result = &mut wait => match result {
                Err(_elapsed) => {
                    warn!(
                        "[{}] host wall clock fired after {:.1}s; killing container {}",
                        job_id,
                        started.elapsed().as_secs_f64(),
                        name
                    );
                    ExecOutcome {
                        host_timeout_fired: true,
                        wall_time_s: started.elapsed().as_secs_f64(),
                        ..Default::default()
                    }
                }
                Ok(Err(e)) => {
                    remove_container(&name).await;
                    return Err(SandboxFailure::transient(format!(
                        "failed to collect container output: {}",
                        e
                    )));
                }
                Ok(Ok(output)) => {
                    let wall_time_s = started.elapsed().as_secs_f64();
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let (report_bytes, remaining_stdout) = split_report(&stdout);
                    let exit_code = output.status.code();
                    ExecOutcome {
                        report_bytes,
                        stdout_tail: tail(&remaining_stdout, TAIL_LEN),
                        stderr_tail: tail(&stderr, TAIL_LEN),
                        exit_code,
                        wall_time_s,
                        host_timeout_fired: false,
                        // 137 = SIGKILL; with the host clock quiet this is
                        // the cgroup OOM killer.
                        oom_indicated: exit_code == Some(137),
                        cancelled: false,
                    }
                }
            }
        };

        // Reaping invariant: force-remove on every path, workspace dropped
        // below regardless.
        remove_container(&name).await;
        drop(workspace);
        Ok(outcome)
    }
}

/// Cheap probe used for a friendly early failure before accepting work.
pub async fn docker_available() -> bool {
    let probe = tokio::process::Command::new("docker")
        .args(["version", "--format", "{{.Server.Version}}"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    matches!(
        tokio::time::timeout(Duration::from_secs(2), probe).await,
        Ok(Ok(status)) if status.success()
    )
}

/// Stage the per-submission workspace:
///
/// ```text
/// sandbox-<random>/
///   student/<entry>      student source
///   tests/test_runner.py generated harness
///   tests/bootstrap.py   makes the student module importable
/// ```
fn stage_workspace(
    runtime: &Runtime,
    harness: &str,
    student_source: &str,
) -> std::io::Result<TempDir> {
    let workspace = tempfile::Builder::new().prefix("sandbox-").tempdir()?;

    let student_dir = workspace.path().join("student");
    std::fs::create_dir(&student_dir)?;
    std::fs::write(student_dir.join(&runtime.entry_filename), student_source)?;

    let tests_dir = workspace.path().join("tests");
    std::fs::create_dir(&tests_dir)?;
    std::fs::write(tests_dir.join(HARNESS_FILENAME), harness)?;
    std::fs::write(
        tests_dir.join("bootstrap.py"),
        bootstrap_source(&runtime.entry_filename, runtime.entry_module()),
    )?;

    Ok(workspace)
}

fn bootstrap_source(entry_filename: &str, entry_module: &str) -> String {
    format!(
        r#"# Staged by the sandbox; makes the student module importable by the harness.
import os
import sys

_STUDENT_DIR = os.path.abspath(
    os.path.join(os.path.dirname(os.path.abspath(__file__)), os.pardir, "student")
)
sys.path.insert(0, _STUDENT_DIR)
STUDENT_ENTRY = os.path.join(_STUDENT_DIR, "{entry}")
STUDENT_MODULE = "{module}"
"#,
        entry = entry_filename,
        module = entry_module,
    )
}

/// Container names must be unambiguous so reaping by name cannot race
/// another run: host pid + monotonic millis + job id.
fn container_name(job_id: &str) -> String {
    format!("sandbox-{}-{}-{}", std::process::id(), monotonic_ms(), job_id)
}

/// Milliseconds on a process-wide monotonic clock. Shared with the
/// orchestrator's job ids so the container name and the job id it embeds
/// agree on their time component.
pub(crate) fn monotonic_ms() -> u128 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis()
}

fn docker_run_args(name: &str, runtime: &Runtime, workspace: &Path, limits: &Limits) -> Vec<String> {
    let mut args: Vec<String> = [
        "run",
        "--rm",
        "-i",
        "--name",
        name,
        "--network=none",
        "--cpus",
        "1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("--memory={}m", limits.memory_mb));
    args.push(format!("--memory-swap={}m", limits.memory_mb));
    args.extend(
        [
            "--pids-limit",
            "64",
            "--read-only",
            "--cap-drop=ALL",
            "--security-opt",
            "no-new-privileges",
            "--tmpfs",
            TMPFS_SPEC,
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push("-v".into());
    args.push(format!("{}:{}:ro", workspace.display(), WORKSPACE_MOUNT));
    args.push("-w".into());
    args.push(WORKSPACE_MOUNT.into());
    args.push("-e".into());
    args.push(format!("RUN_TIMEOUT={}", limits.timeout_s));
    args.push("-e".into());
    args.push(format!("REPORT_PATH={}", REPORT_PATH_IN_CONTAINER));
    args.push(runtime.docker_image.clone());
    args.extend(runtime.run_command.split_whitespace().map(|s| s.to_string()));
    args
}

async fn stop_container(name: &str) {
    let stop = tokio::process::Command::new("docker")
        .args(["stop", "-t", "1", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    let _ = tokio::time::timeout(REAP_TIMEOUT, stop).await;
    remove_container(name).await;
}

async fn remove_container(name: &str) {
    let remove = tokio::process::Command::new("docker")
        .args(["rm", "-f", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if tokio::time::timeout(REAP_TIMEOUT, remove).await.is_err() {
        warn!("timed out force-removing container {}", name);
    }
}

/// Recover the report bytes from the sentinel block the harness prints;
/// stdout outside the block stays student-visible.
fn split_report(stdout: &str) -> (Option<Vec<u8>>, String) {
    if let Some(begin) = stdout.find(REPORT_BEGIN_MARKER) {
        let after = &stdout[begin + REPORT_BEGIN_MARKER.len()..];
        if let Some(end) = after.find(REPORT_END_MARKER) {
            let report = after[..end].trim();
            let mut rest = String::with_capacity(stdout.len() - report.len());
            rest.push_str(&stdout[..begin]);
            rest.push_str(
                after[end + REPORT_END_MARKER.len()..].trim_start_matches('\n'),
            );
            if report.is_empty() {
                return (None, rest);
            }
            return (Some(report.as_bytes().to_vec()), rest);
        }
    }
    (None, stdout.to_string())
}

fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

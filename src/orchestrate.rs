//! Submission orchestration
//!
//! Composes the compiler, generator registry, runner cache, sandbox
//! executor, report parser, and verdict normalizer for a single
//! submission. The orchestrator is the only component that owns shared
//! state; everything it hands to the executor is per-submission. In-flight
//! containers are bounded by a semaphore sized to host capacity, and no
//! lock is held across a container launch.
//!
//! A bad submission never brings a worker down: sandbox failures (after
//! one retry for transient ones) become `sandbox-error` verdicts, while
//! genuine input errors — unknown problem, ambiguous runtime, missing
//! generator — propagate to the caller.

use crate::cache::{CacheKey, RunnerCache};
use crate::error::{Error, Result};
use crate::generate::{GeneratorRegistry, GENERATOR_VERSION};
use crate::ir::ProblemIr;
use crate::report;
use crate::runtime::RuntimeCatalog;
use crate::sandbox::{ExecOutcome, Limits, SandboxExecutor};
use crate::spec;
use crate::store::{
    LimitSettings, ProblemRecord, ProblemStore, SubmissionLog, SubmissionRecord,
};
use crate::verdict::{self, Verdict};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum containers in flight at once; excess submissions queue.
    pub max_in_flight: usize,
    /// Seconds added to the overall budget before the host clock fires.
    pub grace_s: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            grace_s: 2,
        }
    }
}

/// Caller-supplied overrides for one submission
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Exact runtime slug
    pub runtime: Option<String>,
    /// Language to resolve a runtime for, when no slug is given
    pub language: Option<String>,
    /// Per-case timeout override
    pub timeout_s: Option<u32>,
    /// Memory cap override
    pub memory_mb: Option<u32>,
    /// Overall budget override; defaults to twice the per-case timeout
    pub overall_timeout_s: Option<u32>,
    /// Include raw failure details in student-facing output
    pub debug: bool,
    /// Cancellation signal propagated into the executor
    pub cancel: Option<CancellationToken>,
}

/// A graded submission: the persisted record plus the normalized verdict
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionOutcome {
    pub record: SubmissionRecord,
    pub verdict: Verdict,
}

/// The submission pipeline front door
pub struct Orchestrator {
    registry: GeneratorRegistry,
    cache: RunnerCache,
    runtimes: RuntimeCatalog,
    problems: ProblemStore,
    submissions: SubmissionLog,
    executor: SandboxExecutor,
    slots: Semaphore,
    job_counter: AtomicU64,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            registry: GeneratorRegistry::with_builtins(),
            cache: RunnerCache::new(),
            runtimes: RuntimeCatalog::with_builtins(),
            problems: ProblemStore::new(),
            submissions: SubmissionLog::new(),
            executor: SandboxExecutor::new(config.grace_s),
            slots: Semaphore::new(config.max_in_flight.max(1)),
            job_counter: AtomicU64::new(0),
        }
    }

    /// Swap in a custom runtime catalog (deployments declare their own).
    pub fn with_runtimes(mut self, runtimes: RuntimeCatalog) -> Self {
        self.runtimes = runtimes;
        self
    }

    pub fn problems(&self) -> &ProblemStore {
        &self.problems
    }

    pub fn submissions(&self) -> &SubmissionLog {
        &self.submissions
    }

    pub fn runtimes(&self) -> &RuntimeCatalog {
        &self.runtimes
    }

    /// Compile a raw problem document to canonical IR. Idempotent.
    pub fn compile_spec(&self, raw_spec_text: &str) -> Result<ProblemIr> {
        spec::compile_spec(raw_spec_text)
    }

    /// Compile and persist a problem. The stored `ir_version` bumps only
    /// when the canonical IR changed; superseded harness cache entries are
    /// pruned.
    pub fn store_problem(&self, problem_id: &str, raw_spec_text: &str) -> Result<ProblemRecord> {
        let ir = spec::compile_spec(raw_spec_text)?;
        let record = self.problems.upsert(problem_id, raw_spec_text, ir);
        self.cache.prune(problem_id, record.ir_version);
        info!(
            "stored problem '{}' at ir_version {}",
            problem_id, record.ir_version
        );
        Ok(record)
    }

    /// Set a problem's default execution limits.
    pub fn set_problem_limits(&self, problem_id: &str, timeout_s: u32, memory_mb: u32) -> Result<()> {
        self.problems.set_limits(problem_id, timeout_s, memory_mb)
    }

    /// Fetch the harness for a stored problem in `language`, generating and
    /// caching on miss.
    pub fn harness(&self, problem_id: &str, language: &str) -> Result<String> {
        let record = self
            .problems
            .get(problem_id)
            .ok_or_else(|| Error::UnknownProblem(problem_id.to_string()))?;
        self.harness_for(&record, language)
    }

    fn harness_for(&self, record: &ProblemRecord, language: &str) -> Result<String> {
        let key = CacheKey {
            problem_id: record.id.clone(),
            ir_version: record.ir_version,
            generator_version: GENERATOR_VERSION.to_string(),
            language: language.to_string(),
        };
        if let Some(content) = self.cache.get(&key) {
            return Ok(content);
        }
        let content = self.registry.generate(language, &record.ir)?;
        self.cache.put(key, content.clone());
        Ok(content)
    }

    /// Grade one submission end to end.
    ///
    /// Input errors (unknown problem, ambiguous runtime, missing generator)
    /// return `Err`; every execution outcome — including sandbox failures —
    /// returns `Ok` with a persisted record.
    pub async fn run_submission(
        &self,
        problem_id: &str,
        student_source: &str,
        opts: SubmitOptions,
    ) -> Result<SubmissionOutcome> {
        let record = self
            .problems
            .get(problem_id)
            .ok_or_else(|| Error::UnknownProblem(problem_id.to_string()))?;
        let runtime = self
            .runtimes
            .resolve(opts.runtime.as_deref(), opts.language.as_deref())?
            .clone();
        let harness = self.harness_for(&record, &runtime.language)?;

        // Caller override beats the problem default, which was seeded from
        // the system default. An explicit overall budget always wins.
        let timeout_s = opts.timeout_s.unwrap_or(record.timeout_s);
        let memory_mb = opts.memory_mb.unwrap_or(record.memory_mb);
        let overall_timeout_s = opts.overall_timeout_s.unwrap_or(2 * timeout_s);
        let limits = Limits {
            timeout_s,
            overall_timeout_s,
            memory_mb,
        };

        let job_id = self.next_job_id();
        let cancel = opts.cancel.clone().unwrap_or_default();

        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| Error::Sandbox("executor is shut down".into()))?;

        info!(
            "[{}] grading problem '{}' (ir_version {}) on runtime '{}'",
            job_id, problem_id, record.ir_version, runtime.slug
        );

        let mut exec_result = self
            .executor
            .execute(&job_id, &runtime, &harness, student_source, &limits, &cancel)
            .await;

        let retry = match &exec_result {
            Err(failure) if failure.transient => {
                warn!(
                    "[{}] transient sandbox failure: {}; retrying once",
                    job_id, failure
                );
                true
            }
            _ => false,
        };
        if retry {
            exec_result = self
                .executor
                .execute(&job_id, &runtime, &harness, student_source, &limits, &cancel)
                .await;
        }

        let (outcome, verdict) = match exec_result {
            Ok(outcome) => {
                let parsed = match &outcome.report_bytes {
                    Some(bytes) => match report::parse_report(bytes) {
                        Ok(parsed) => Some(parsed),
                        Err(e) => {
                            warn!("[{}] unreadable test report: {}", job_id, e);
                            None
                        }
                    },
                    None => None,
                };
                let verdict = verdict::classify(&outcome, parsed.as_ref());
                (outcome, verdict)
            }
            Err(failure) => {
                error!("[{}] sandbox failure: {}", job_id, failure);
                let outcome = ExecOutcome::default();
                let verdict = verdict::classify(&outcome, None);
                (outcome, verdict)
            }
        };

        info!(
            "[{}] verdict: {} ({} tests, {} failures, {} errors, {:.2}s)",
            job_id,
            verdict.status,
            verdict.summary.tests,
            verdict.summary.failures,
            verdict.summary.errors,
            outcome.wall_time_s
        );

        let record = SubmissionRecord {
            job_id,
            problem_id: problem_id.to_string(),
            runtime: runtime.slug.clone(),
            student_source: student_source.to_string(),
            status: verdict.status,
            summary: verdict.summary.clone(),
            first_failure: verdict.first_failure.clone(),
            report_blob: outcome
                .report_bytes
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default(),
            stdout_tail: outcome.stdout_tail.clone(),
            stderr_tail: outcome.stderr_tail.clone(),
            duration_s: outcome.wall_time_s,
            limits: LimitSettings {
                timeout_s,
                memory_mb,
            },
            created_at: Utc::now(),
        };
        self.submissions.append(record.clone());

        Ok(SubmissionOutcome { record, verdict })
    }

    /// `<pid hex><monotonic-ms hex><counter hex>`, each component masked to
    /// a fixed width so the id is always 16 chars and the counter is never
    /// truncated away. Uses the sandbox's monotonic clock rather than wall
    /// time, which can step backward.
    fn next_job_id(&self) -> String {
        let n = self.job_counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{:04x}{:08x}{:04x}",
            std::process::id() & 0xffff,
            crate::sandbox::monotonic_ms() & 0xffff_ffff,
            n & 0xffff
        )
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUNCTION_SPEC: &str = r#"
type: function
description: factorial
function:
  name: factorial
  arguments:
    - name: n
      type: integer
  returns: integer
tests:
  - name: base
    args: {n: 0}
    expected: 1
"#;

    #[test]
    fn test_store_problem_and_harness_caching() {
        let orchestrator = Orchestrator::default();
        let record = orchestrator.store_problem("fact", FUNCTION_SPEC).unwrap();
        assert_eq!(record.ir_version, 1);

        let first = orchestrator.harness("fact", "python").unwrap();
        let second = orchestrator.harness("fact", "python").unwrap();
        assert_eq!(first, second);
        assert!(first.contains("factorial"));
    }

    #[test]
    fn test_harness_changes_with_new_ir_version() {
        let orchestrator = Orchestrator::default();
        orchestrator.store_problem("fact", FUNCTION_SPEC).unwrap();
        let before = orchestrator.harness("fact", "python").unwrap();

        let changed = FUNCTION_SPEC.replace("expected: 1", "expected: 2");
        let record = orchestrator.store_problem("fact", &changed).unwrap();
        assert_eq!(record.ir_version, 2);

        let after = orchestrator.harness("fact", "python").unwrap();
        assert_ne!(before, after);
        assert!(after.contains("self.assertEqual(2, got)"));
    }

    #[test]
    fn test_equivalent_recompile_keeps_version_and_cache() {
        let orchestrator = Orchestrator::default();
        orchestrator.store_problem("fact", FUNCTION_SPEC).unwrap();
        let before = orchestrator.harness("fact", "python").unwrap();

        // args/arguments spelling does not change the IR
        let respelled = FUNCTION_SPEC.replace("arguments:", "args:");
        let record = orchestrator.store_problem("fact", &respelled).unwrap();
        assert_eq!(record.ir_version, 1);
        assert_eq!(orchestrator.harness("fact", "python").unwrap(), before);
    }

    #[test]
    fn test_unknown_problem_is_input_error() {
        let orchestrator = Orchestrator::default();
        let err = orchestrator.harness("ghost", "python").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_missing_generator_is_input_error() {
        let orchestrator = Orchestrator::default();
        orchestrator.store_problem("fact", FUNCTION_SPEC).unwrap();
        let err = orchestrator.harness("fact", "cobol").unwrap_err();
        assert!(matches!(err, Error::GeneratorMissing { .. }));
    }

    #[test]
    fn test_job_ids_are_unique_and_fixed_width() {
        let orchestrator = Orchestrator::default();
        let a = orchestrator.next_job_id();
        let b = orchestrator.next_job_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(b.len(), 16);
    }

    #[test]
    fn test_job_ids_are_seeded_with_the_host_pid() {
        // Independent orchestrators share the pid prefix; ids minted by
        // another process would not, which is what keeps container names
        // unambiguous across processes.
        let a = Orchestrator::default().next_job_id();
        let b = Orchestrator::default().next_job_id();

        let pid_prefix = format!("{:04x}", std::process::id() & 0xffff);
        assert!(a.starts_with(&pid_prefix), "{} lacks pid prefix {}", a, pid_prefix);
        assert!(b.starts_with(&pid_prefix), "{} lacks pid prefix {}", b, pid_prefix);
    }
}

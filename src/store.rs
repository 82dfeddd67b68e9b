//! Problem and submission records
//!
//! In-process stores behind the same field shapes a persistent backend
//! would use. Problem records carry the compiled IR and a monotonic
//! `ir_version` that bumps only when the canonical IR bytes actually
//! change; the compare-and-bump runs under the store lock so concurrent
//! recompiles of the same spec cannot mint duplicate versions. The
//! submission log is append-only.

use crate::error::{Error, Result};
use crate::ir::ProblemIr;
use crate::report::{FirstFailure, ReportSummary};
use crate::verdict::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// System default per-case timeout, seconds.
pub const DEFAULT_TIMEOUT_S: u32 = 5;
/// System default memory cap, MiB.
pub const DEFAULT_MEMORY_MB: u32 = 256;

/// A stored problem: raw text, compiled IR, and execution defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: String,
    pub raw_spec_text: String,
    pub ir: ProblemIr,
    pub ir_version: u32,
    pub compiled_at: DateTime<Utc>,
    pub timeout_s: u32,
    pub memory_mb: u32,
}

/// Keyed problem store with atomic version bumps
#[derive(Default)]
pub struct ProblemStore {
    problems: Mutex<HashMap<String, ProblemRecord>>,
}

impl ProblemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a compiled problem. The version bumps only when the canonical
    /// IR differs from what is already stored; re-compiles of an equivalent
    /// spec keep the version (and the cached harnesses) intact.
    pub fn upsert(&self, id: &str, raw_spec_text: &str, ir: ProblemIr) -> ProblemRecord {
        let mut problems = self.problems.lock().expect("problem store lock poisoned");
        let record = match problems.get_mut(id) {
            Some(existing) if existing.ir.canonical_bytes() == ir.canonical_bytes() => {
                existing.raw_spec_text = raw_spec_text.to_string();
                existing.clone()
            }
            Some(existing) => {
                existing.raw_spec_text = raw_spec_text.to_string();
                existing.ir = ir;
                existing.ir_version += 1;
                existing.compiled_at = Utc::now();
                existing.clone()
            }
            None => {
                let record = ProblemRecord {
                    id: id.to_string(),
                    raw_spec_text: raw_spec_text.to_string(),
                    ir,
                    ir_version: 1,
                    compiled_at: Utc::now(),
                    timeout_s: DEFAULT_TIMEOUT_S,
                    memory_mb: DEFAULT_MEMORY_MB,
                };
                problems.insert(id.to_string(), record.clone());
                record
            }
        };
        record
    }

    pub fn get(&self, id: &str) -> Option<ProblemRecord> {
        self.problems
            .lock()
            .expect("problem store lock poisoned")
            .get(id)
            .cloned()
    }

    /// Set the problem's default execution limits.
    pub fn set_limits(&self, id: &str, timeout_s: u32, memory_mb: u32) -> Result<()> {
        let mut problems = self.problems.lock().expect("problem store lock poisoned");
        let record = problems
            .get_mut(id)
            .ok_or_else(|| Error::UnknownProblem(id.to_string()))?;
        record.timeout_s = timeout_s;
        record.memory_mb = memory_mb;
        Ok(())
    }
}

/// Limits a submission actually ran under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSettings {
    pub timeout_s: u32,
    pub memory_mb: u32,
}

/// One graded submission, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub job_id: String,
    pub problem_id: String,
    pub runtime: String,
    pub student_source: String,
    pub status: Status,
    pub summary: ReportSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<FirstFailure>,
    pub report_blob: String,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub duration_s: f64,
    pub limits: LimitSettings,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of submission records
#[derive(Default)]
pub struct SubmissionLog {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl SubmissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: SubmissionRecord) {
        self.records
            .lock()
            .expect("submission log lock poisoned")
            .push(record);
    }

    pub fn get(&self, job_id: &str) -> Option<SubmissionRecord> {
        self.records
            .lock()
            .expect("submission log lock poisoned")
            .iter()
            .find(|r| r.job_id == job_id)
            .cloned()
    }

    pub fn for_problem(&self, problem_id: &str) -> Vec<SubmissionRecord> {
        self.records
            .lock()
            .expect("submission log lock poisoned")
            .iter()
            .filter(|r| r.problem_id == problem_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("submission log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::compile_spec;

    const SPEC_A: &str = "type: standardIo\ndescription: d\ntests:\n  - name: a\n    stdout: \"1\"\n";
    const SPEC_B: &str = "type: standardIo\ndescription: d\ntests:\n  - name: a\n    stdout: \"2\"\n";

    #[test]
    fn test_version_bumps_only_on_content_change() {
        let store = ProblemStore::new();

        let v1 = store.upsert("p1", SPEC_A, compile_spec(SPEC_A).unwrap());
        assert_eq!(v1.ir_version, 1);

        // Equivalent recompile (whitespace-only difference in the raw text)
        let roomy = SPEC_A.replace("description: d", "description:   d");
        let same = store.upsert("p1", &roomy, compile_spec(&roomy).unwrap());
        assert_eq!(same.ir_version, 1);
        assert_eq!(same.raw_spec_text, roomy);

        let v2 = store.upsert("p1", SPEC_B, compile_spec(SPEC_B).unwrap());
        assert_eq!(v2.ir_version, 2);
    }

    #[test]
    fn test_set_limits() {
        let store = ProblemStore::new();
        store.upsert("p1", SPEC_A, compile_spec(SPEC_A).unwrap());
        store.set_limits("p1", 2, 64).unwrap();
        let record = store.get("p1").unwrap();
        assert_eq!(record.timeout_s, 2);
        assert_eq!(record.memory_mb, 64);

        assert!(store.set_limits("nope", 1, 1).is_err());
    }

    #[test]
    fn test_submission_log_is_append_only() {
        let log = SubmissionLog::new();
        assert!(log.is_empty());

        let record = SubmissionRecord {
            job_id: "j1".into(),
            problem_id: "p1".into(),
            runtime: "python312".into(),
            student_source: "print(5)".into(),
            status: Status::Passed,
            summary: ReportSummary::default(),
            first_failure: None,
            report_blob: String::new(),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            duration_s: 0.1,
            limits: LimitSettings {
                timeout_s: 5,
                memory_mb: 256,
            },
            created_at: Utc::now(),
        };
        log.append(record.clone());
        log.append(SubmissionRecord {
            job_id: "j2".into(),
            problem_id: "p2".into(),
            ..record
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.get("j1").unwrap().problem_id, "p1");
        assert_eq!(log.for_problem("p2").len(), 1);
        assert!(log.get("missing").is_none());
    }
}

//! Verdict normalization
//!
//! Classifies a raw sandbox outcome plus parsed report into the closed
//! status set and produces the compact student-facing record. Harnesses
//! report per-case timeouts as failures with a `timeout` marker in the
//! message; those are reclassified here so students see a timeout verdict
//! rather than a generic failure.

use crate::report::{FirstFailure, ParsedReport, ReportSummary};
use crate::sandbox::ExecOutcome;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Submission status, the closed set every verdict draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Passed,
    Failed,
    Error,
    Timeout,
    Oom,
    SandboxError,
    Unknown,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Error => "error",
            Status::Timeout => "timeout",
            Status::Oom => "oom",
            Status::SandboxError => "sandbox-error",
            Status::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Normalized outcome of one submission
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub status: Status,
    pub title: String,
    pub message: String,
    pub summary: ReportSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<FirstFailure>,
}

/// What a student sees: no stack details unless debug output was requested.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StudentView {
    pub status: Status,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_test: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<String>,
}

impl Verdict {
    pub fn student_view(&self, debug: bool) -> StudentView {
        StudentView {
            status: self.status,
            title: self.title.clone(),
            message: self.message.clone(),
            failed_test: self.first_failure.as_ref().map(|f| f.test.clone()),
            failure_message: self.first_failure.as_ref().map(|f| f.message.clone()),
            failure_details: if debug {
                self.first_failure.as_ref().map(|f| f.details.clone())
            } else {
                None
            },
        }
    }
}

/// Classify a captured sandbox outcome.
pub fn classify(outcome: &ExecOutcome, report: Option<&ParsedReport>) -> Verdict {
    let (summary, first_failure) = match report {
        Some(r) => (r.summary.clone(), r.first_failure.clone()),
        None => (ReportSummary::default(), None),
    };

    let mut status = if outcome.host_timeout_fired && report.is_none() {
        Status::Timeout
    } else if outcome.cancelled {
        Status::SandboxError
    } else if report.is_none() {
        Status::SandboxError
    } else if summary.errors > 0 {
        Status::Error
    } else if summary.failures > 0 {
        Status::Failed
    } else {
        Status::Passed
    };

    // Harness-reported per-case timeouts arrive as failures.
    if status == Status::Failed {
        if let Some(failure) = &first_failure {
            let haystack = format!("{} {}", failure.message, failure.details).to_lowercase();
            if haystack.contains("timeout") {
                status = Status::Timeout;
            }
        }
    }

    if outcome.oom_indicated && status != Status::Passed {
        status = Status::Oom;
    }

    let (title, message) = describe(status, outcome, &summary, first_failure.as_ref());

    Verdict {
        status,
        title,
        message,
        summary,
        first_failure,
    }
}

fn describe(
    status: Status,
    outcome: &ExecOutcome,
    summary: &ReportSummary,
    first_failure: Option<&FirstFailure>,
) -> (String, String) {
    match status {
        Status::Passed => (
            "All tests passed".into(),
            format!(
                "{} test(s) passed in {:.2}s.",
                summary.tests, summary.time_s
            ),
        ),
        Status::Failed => {
            let mut message = format!(
                "{} of {} test(s) failed.",
                summary.failures, summary.tests
            );
            if let Some(failure) = first_failure {
                message.push_str(&format!(" First failure: {}.", failure.test));
            }
            ("Tests failed".into(), message)
        }
        Status::Error => {
            let mut message = format!(
                "{} of {} test(s) raised unexpected errors.",
                summary.errors, summary.tests
            );
            if let Some(failure) = first_failure {
                message.push_str(&format!(" First error: {}.", failure.test));
            }
            ("Tests errored".into(), message)
        }
        Status::Timeout => (
            "Time limit exceeded".into(),
            if outcome.host_timeout_fired {
                "The submission exceeded the overall time budget and was stopped.".into()
            } else {
                "A test case exceeded its time limit.".into()
            },
        ),
        Status::Oom => (
            "Memory limit exceeded".into(),
            "The submission exceeded its memory limit and was stopped.".into(),
        ),
        Status::SandboxError => (
            "Grading failed".into(),
            if outcome.cancelled {
                "The submission was cancelled before grading finished.".into()
            } else {
                "The grader could not run this submission. Please retry.".into()
            },
        ),
        Status::Unknown => ("Unknown result".into(), "The grader produced no usable result.".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::parse_report;

    fn outcome() -> ExecOutcome {
        ExecOutcome {
            exit_code: Some(0),
            wall_time_s: 0.5,
            ..Default::default()
        }
    }

    fn report(xml: &str) -> ParsedReport {
        parse_report(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_passed() {
        let r = report("<testsuite tests=\"2\" failures=\"0\" errors=\"0\" time=\"0.2\"><testcase name=\"a\"/><testcase name=\"b\"/></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.status, Status::Passed);
        assert_eq!(verdict.summary.tests, 2);
    }

    #[test]
    fn test_failed_with_first_failure() {
        let r = report("<testsuite name=\"s\"><testcase name=\"a\"/><testcase name=\"b\"><failure message=\"1 != 2\">trace</failure></testcase></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.status, Status::Failed);
        assert!(verdict.message.contains("First failure: b"));
    }

    #[test]
    fn test_errors_take_precedence_over_failures() {
        let r = report("<testsuite name=\"s\"><testcase name=\"a\"><failure message=\"no\">d</failure></testcase><testcase name=\"b\"><error message=\"boom\">d</error></testcase></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.status, Status::Error);
    }

    #[test]
    fn test_host_timeout_without_report() {
        let out = ExecOutcome {
            host_timeout_fired: true,
            ..Default::default()
        };
        let verdict = classify(&out, None);
        assert_eq!(verdict.status, Status::Timeout);
    }

    #[test]
    fn test_missing_report_is_sandbox_error() {
        let verdict = classify(&outcome(), None);
        assert_eq!(verdict.status, Status::SandboxError);
    }

    #[test]
    fn test_harness_timeout_failure_reclassified() {
        let r = report("<testsuite name=\"s\"><testcase name=\"slow\"><failure message=\"timeout: case exceeded 1.0s\">trace</failure></testcase></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.status, Status::Timeout);
    }

    #[test]
    fn test_timeout_substring_match_is_case_insensitive() {
        let r = report("<testsuite name=\"s\"><testcase name=\"slow\"><failure message=\"subprocess.TIMEOUT expired\">d</failure></testcase></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.status, Status::Timeout);
    }

    #[test]
    fn test_oom_override() {
        let out = ExecOutcome {
            exit_code: Some(137),
            oom_indicated: true,
            ..Default::default()
        };
        let verdict = classify(&out, None);
        assert_eq!(verdict.status, Status::Oom);
    }

    #[test]
    fn test_cancelled_is_sandbox_error() {
        let out = ExecOutcome {
            cancelled: true,
            ..Default::default()
        };
        let verdict = classify(&out, None);
        assert_eq!(verdict.status, Status::SandboxError);
        assert!(verdict.message.contains("cancelled"));
    }

    #[test]
    fn test_student_view_hides_details_unless_debug() {
        let r = report("<testsuite name=\"s\"><testcase name=\"b\"><failure message=\"1 != 2\">secret trace</failure></testcase></testsuite>");
        let verdict = classify(&outcome(), Some(&r));
        assert_eq!(verdict.student_view(false).failure_details, None);
        assert_eq!(
            verdict.student_view(true).failure_details.as_deref(),
            Some("secret trace")
        );
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&Status::SandboxError).unwrap(),
            "\"sandbox-error\""
        );
        assert_eq!(serde_json::to_string(&Status::Oom).unwrap(), "\"oom\"");
    }
}

//! Test report parsing
//!
//! The harness writes a JUnit-style XML report: either a single
//! `<testsuite>` or a `<testsuites>` wrapper around several. Counts and
//! times are taken from attributes when present and recomputed from the
//! `<testcase>` children otherwise; numeric attributes parse leniently.
//! The first failing or erroring case in document order is captured for
//! the verdict.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum characters kept of a first-failure message.
pub const MAX_MESSAGE_LEN: usize = 2_000;
/// Maximum characters kept of first-failure details.
pub const MAX_DETAILS_LEN: usize = 4_000;

/// Aggregated counts across all suites in the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSummary {
    pub tests: u32,
    pub failures: u32,
    pub errors: u32,
    pub time_s: f64,
}

/// The first failing or erroring case, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FirstFailure {
    pub suite: String,
    pub test: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time_s: f64,
    pub details: String,
}

/// A parsed report: summary plus the first failure, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedReport {
    pub summary: ReportSummary,
    pub first_failure: Option<FirstFailure>,
}

// Serde models for the XML shape. Attribute values stay strings so a
// sloppy producer cannot make the whole report unreadable.

#[derive(Debug, Deserialize)]
struct XmlTestSuites {
    #[serde(rename = "testsuite", default)]
    suites: Vec<XmlTestSuite>,
}

#[derive(Debug, Deserialize)]
struct XmlTestSuite {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@tests")]
    tests: Option<String>,
    #[serde(rename = "@failures")]
    failures: Option<String>,
    #[serde(rename = "@errors")]
    errors: Option<String>,
    #[serde(rename = "@time")]
    time: Option<String>,
    #[serde(rename = "testcase", default)]
    cases: Vec<XmlTestCase>,
}

#[derive(Debug, Deserialize)]
struct XmlTestCase {
    #[serde(rename = "@classname")]
    classname: Option<String>,
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@time")]
    time: Option<String>,
    failure: Option<XmlFault>,
    error: Option<XmlFault>,
}

#[derive(Debug, Deserialize)]
struct XmlFault {
    #[serde(rename = "@message")]
    message: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "$text")]
    details: Option<String>,
}

/// Parse report bytes into the aggregated summary and first failure.
///
/// A *missing* report is not this module's concern (the caller passes what
/// it recovered); malformed bytes are an error.
pub fn parse_report(bytes: &[u8]) -> Result<ParsedReport> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Other(format!("report is not valid UTF-8: {}", e)))?;

    let suites = match root_element(text).as_deref() {
        Some("testsuites") => {
            let parsed: XmlTestSuites = quick_xml::de::from_str(text)
                .map_err(|e| Error::Other(format!("failed to parse report XML: {}", e)))?;
            parsed.suites
        }
        Some("testsuite") => {
            let parsed: XmlTestSuite = quick_xml::de::from_str(text)
                .map_err(|e| Error::Other(format!("failed to parse report XML: {}", e)))?;
            vec![parsed]
        }
        Some(other) => {
            return Err(Error::Other(format!(
                "unexpected report root element '{}'",
                other
            )))
        }
        None => return Err(Error::Other("report contains no XML element".into())),
    };

    let mut summary = ReportSummary::default();
    let mut first_failure = None;

    for suite in &suites {
        let case_failures = suite
            .cases
            .iter()
            .filter(|c| c.failure.is_some())
            .count() as u32;
        let case_errors = suite.cases.iter().filter(|c| c.error.is_some()).count() as u32;

        summary.tests += parse_count(suite.tests.as_deref(), suite.cases.len() as u32);
        summary.failures += parse_count(suite.failures.as_deref(), case_failures);
        summary.errors += parse_count(suite.errors.as_deref(), case_errors);
        summary.time_s += parse_time(suite.time.as_deref()).unwrap_or_else(|| {
            suite
                .cases
                .iter()
                .filter_map(|c| parse_time(c.time.as_deref()))
                .sum()
        });

        if first_failure.is_none() {
            first_failure = find_first_failure(suite);
        }
    }

    Ok(ParsedReport {
        summary,
        first_failure,
    })
}

fn find_first_failure(suite: &XmlTestSuite) -> Option<FirstFailure> {
    for case in &suite.cases {
        let (fault, fallback_kind) = match (&case.failure, &case.error) {
            (Some(f), _) => (f, "failure"),
            (None, Some(e)) => (e, "error"),
            (None, None) => continue,
        };

        return Some(FirstFailure {
            suite: suite
                .name
                .clone()
                .or_else(|| case.classname.clone())
                .unwrap_or_default(),
            test: case.name.clone().unwrap_or_default(),
            message: truncate(fault.message.as_deref().unwrap_or(""), MAX_MESSAGE_LEN),
            kind: fault
                .kind
                .clone()
                .unwrap_or_else(|| fallback_kind.to_string()),
            time_s: parse_time(case.time.as_deref()).unwrap_or(0.0),
            details: truncate(fault.details.as_deref().unwrap_or(""), MAX_DETAILS_LEN),
        });
    }
    None
}

fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

fn parse_count(attr: Option<&str>, fallback: u32) -> u32 {
    attr.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn parse_time(attr: Option<&str>) -> Option<f64> {
    attr.and_then(|s| s.trim().parse::<f64>().ok())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

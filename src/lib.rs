// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # Autograde — spec-driven auto-grading
//!
//! Instructors author programming exercises as declarative YAML test
//! specifications; students submit source code. Autograde compiles the
//! specification into a canonical IR, materializes an executable test
//! harness for the target runtime, runs the harness against the submission
//! inside a strongly isolated container, and returns a normalized verdict.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use autograde::{Orchestrator, OrchestratorConfig, SubmitOptions};
//!
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default());
//!
//! orchestrator.store_problem("factorial", r#"
//!   type: function
//!   description: Compute n!
//!   function:
//!     name: factorial
//!     arguments:
//!       - name: n
//!         type: integer
//!     returns: integer
//!   tests:
//!     - name: base
//!       args: {n: 0}
//!       expected: 1
//!     - name: negative
//!       args: {n: -1}
//!       exception: ValueError
//! "#)?;
//!
//! let outcome = orchestrator
//!     .run_submission("factorial", student_source, SubmitOptions::default())
//!     .await?;
//! println!("{}: {}", outcome.verdict.status, outcome.verdict.message);
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                                                                │
//! │  SPEC (YAML)                                                   │
//! │      │                                                         │
//! │      └──► compile_spec ──► ProblemIr (canonical, versioned)    │
//! │                │                                               │
//! │                └──► GeneratorRegistry ──► harness source       │
//! │                         │        (cached by id+version+lang)   │
//! │  SUBMISSION             │                                      │
//! │      │                  ▼                                      │
//! │      └──────► SandboxExecutor ──► report.xml ──► Verdict       │
//! │               (container, no net, read-only fs, cpu/mem caps)  │
//! │                                                                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Test shapes
//!
//! | Style | What the harness does |
//! |-------|----------------------|
//! | `standardIo` | spawns the student script per case, feeds stdin, asserts exact stdout |
//! | `function` | imports the student module, calls the function with positional args |
//! | `oop` | instantiates the class, applies method calls in order, state persists per test |
//!
//! Each test asserts either an `expected` value (compared by the declared
//! return type's rule) or an `exception` (matched by logical type name and
//! optional message substring).

// Core data model
pub mod error;
pub mod ir;
pub mod value;

// Compiler and generation
pub mod cache;
pub mod generate;
pub mod spec;

// Execution
pub mod report;
pub mod runtime;
pub mod sandbox;
pub mod verdict;

// Records and composition
pub mod orchestrate;
pub mod store;

// Re-exports
pub use cache::{CacheEntry, CacheKey, RunnerCache};
pub use error::{Error, Result, SpecError};
pub use generate::{GeneratorFn, GeneratorRegistry, GENERATOR_VERSION};
pub use ir::{
    ArgSig, CallStep, CallTest, ClassSig, ExceptionSpec, FunctionIr, FunctionSig, IoTest,
    MethodSig, OopIr, PrimType, ProblemIr, ScenarioTest, SetupStep, StandardIoIr, TestStyle,
    SCHEMA_VERSION,
};
pub use orchestrate::{Orchestrator, OrchestratorConfig, SubmissionOutcome, SubmitOptions};
pub use report::{parse_report, FirstFailure, ParsedReport, ReportSummary};
pub use runtime::{Runtime, RuntimeCatalog};
pub use sandbox::{docker_available, ExecOutcome, Limits, SandboxExecutor, SandboxFailure};
pub use spec::compile_spec;
pub use store::{
    LimitSettings, ProblemRecord, ProblemStore, SubmissionLog, SubmissionRecord,
    DEFAULT_MEMORY_MB, DEFAULT_TIMEOUT_S,
};
pub use value::Value;
pub use verdict::{classify, Status, StudentView, Verdict};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Harness generation — registry of runner-code generators
//!
//! Maps `(target language, test style)` to a generator function that turns
//! a canonical IR into a self-contained harness source file. Generators are
//! pure: the same IR always yields the same bytes, which is what makes the
//! runner cache sound.
//!
//! The registry is built once at startup (`with_builtins`) and read-only
//! afterwards; the orchestrator holds it immutably.

mod python;

pub use python::{REPORT_BEGIN_MARKER, REPORT_END_MARKER};

use crate::error::{Error, Result};
use crate::ir::{ProblemIr, TestStyle};
use std::collections::HashMap;

/// Version of the built-in generator suite. Part of the cache key: bumping
/// it invalidates every cached harness.
pub const GENERATOR_VERSION: &str = "1";

/// A generator turns an IR into harness source text.
pub type GeneratorFn = fn(&ProblemIr) -> Result<String>;

/// Registry of harness generators keyed by (language, style)
pub struct GeneratorRegistry {
    generators: HashMap<(String, TestStyle), GeneratorFn>,
}

impl GeneratorRegistry {
    /// An empty registry, for callers wiring their own generators.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// The built-in suite: Python runners for all three test styles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("python", TestStyle::StandardIo, python::generate_standard_io);
        registry.register("python", TestStyle::Function, python::generate_function);
        registry.register("python", TestStyle::Oop, python::generate_oop);
        registry
    }

    pub fn register(&mut self, language: &str, style: TestStyle, generator: GeneratorFn) {
        self.generators
            .insert((language.to_string(), style), generator);
    }

    pub fn lookup(&self, language: &str, style: TestStyle) -> Result<GeneratorFn> {
        self.generators
            .get(&(language.to_string(), style))
            .copied()
            .ok_or_else(|| Error::GeneratorMissing {
                language: language.to_string(),
                style: style.to_string(),
            })
    }

    /// Generate the harness for `ir` in `language`.
    pub fn generate(&self, language: &str, ir: &ProblemIr) -> Result<String> {
        let generator = self.lookup(language, ir.style())?;
        generator(ir)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

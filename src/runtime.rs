//! Runtime catalog
//!
//! A runtime pairs a language with the container image and commands needed
//! to execute a harness against a student submission. Submissions may name
//! a runtime by slug, name a language, or omit both when the catalog has a
//! single obvious choice.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An executable runtime for one language
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Runtime {
    /// Stable identifier, e.g. `python312`
    pub slug: String,
    /// Display name, e.g. `Python 3.12`
    pub name: String,
    /// Language slug, e.g. `python`
    pub language: String,
    /// Container image, e.g. `python:3.12-slim`
    pub docker_image: String,
    /// Command run inside the container, relative to `/workspace`
    pub run_command: String,
    /// Filename the student source is staged as, e.g. `solution.py`
    pub entry_filename: String,
    /// Preferred runtime when several exist for a language
    pub is_default: bool,
}

impl Runtime {
    /// Module name of the student entry, for import-based harnesses.
    pub fn entry_module(&self) -> &str {
        self.entry_filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.entry_filename)
    }
}

/// The set of runtimes a deployment declares. At most one default per
/// language.
#[derive(Debug, Clone)]
pub struct RuntimeCatalog {
    runtimes: Vec<Runtime>,
}

impl RuntimeCatalog {
    pub fn new(runtimes: Vec<Runtime>) -> Self {
        Self { runtimes }
    }

    /// The built-in catalog: CPython 3.12 on the slim image.
    pub fn with_builtins() -> Self {
        Self::new(vec![Runtime {
            slug: "python312".into(),
            name: "Python 3.12".into(),
            language: "python".into(),
            docker_image: "python:3.12-slim".into(),
            run_command: "python tests/test_runner.py".into(),
            entry_filename: "solution.py".into(),
            is_default: true,
        }])
    }

    pub fn all(&self) -> &[Runtime] {
        &self.runtimes
    }

    pub fn by_slug(&self, slug: &str) -> Option<&Runtime> {
        self.runtimes.iter().find(|r| r.slug == slug)
    }

    /// Resolve the runtime for a submission: exact slug match first, then
    /// by language (the default wins when several are declared), then the
    /// sole declared runtime. Anything else is ambiguous.
    pub fn resolve(&self, slug: Option<&str>, language: Option<&str>) -> Result<&Runtime> {
        if let Some(slug) = slug {
            return self
                .by_slug(slug)
                .ok_or_else(|| Error::UnknownRuntime(slug.to_string()));
        }

        if let Some(language) = language {
            let candidates: Vec<&Runtime> = self
                .runtimes
                .iter()
                .filter(|r| r.language == language)
                .collect();
            return match candidates.len() {
                0 => Err(Error::UnknownRuntime(language.to_string())),
                1 => Ok(candidates[0]),
                _ => candidates
                    .iter()
                    .find(|r| r.is_default)
                    .copied()
                    .ok_or_else(|| Error::MultipleRuntimes {
                        language: language.to_string(),
                        candidates: candidates.iter().map(|r| r.slug.clone()).collect(),
                    }),
            };
        }

        match self.runtimes.len() {
            0 => Err(Error::UnknownRuntime("(none declared)".into())),
            1 => Ok(&self.runtimes[0]),
            _ => Err(Error::MultipleRuntimes {
                language: "(unspecified)".into(),
                candidates: self.runtimes.iter().map(|r| r.slug.clone()).collect(),
            }),
        }
    }
}

impl Default for RuntimeCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

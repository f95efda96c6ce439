//! Reporting collaborator used by the built-in programs.
//!
//! Given an immutable [`Dataset`], a report is an ordered list of sections and
//! each section yields named [`Artifact`]s. Malformed input (missing columns,
//! non-numeric cells) surfaces as an error naming the section that failed.

pub mod artifact;
pub mod dataset;
pub mod exchange;
pub mod stats;

pub use artifact::{Artifact, ArtifactKind};
pub use dataset::Dataset;
pub use exchange::{GPA_SECTIONS, STUDENT_SECTIONS, basic_stats_report, exchange_report};

use anyhow::{Context, Result};

type SectionFn = fn(&Dataset) -> Result<Vec<Artifact>>;

/// Titled step of a report.
pub struct Section {
    pub title: &'static str,
    build: SectionFn,
}

impl Section {
    pub const fn new(title: &'static str, build: SectionFn) -> Self {
        Self { title, build }
    }

    pub fn build(&self, data: &Dataset) -> Result<Vec<Artifact>> {
        (self.build)(data).with_context(|| format!("building section '{}'", self.title))
    }
}

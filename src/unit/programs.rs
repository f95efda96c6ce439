//! Compiled-in programs that unit manifests bind to.
//!
//! A manifest names a program and passes it an `args` object. The program's
//! builder validates the args up front so bad bindings fail at load time;
//! reading datasets and building sections happens when the entrypoint runs.

use crate::catalog::UnitDescriptor;
use crate::report::exchange::{
    GPA_SECTIONS, HOST_UNIVERSITY, MAJOR, STUDENT_SECTIONS, clean_students,
};
use crate::report::{Dataset, Section};
use crate::surface::Surface;
use crate::unit::Entrypoint;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EXCHANGE_REPORT: &str = "exchange-report";
pub const BASIC_STATS: &str = "basic-stats";

pub type ProgramBuilder = fn(&ProgramContext<'_>) -> Result<Box<dyn Entrypoint>>;

/// What a program builder sees of the unit it is being bound for.
pub struct ProgramContext<'a> {
    pub descriptor: &'a UnitDescriptor,
    pub title: Option<&'a str>,
    base_dir: &'a Path,
    args: &'a Map<String, Value>,
}

impl<'a> ProgramContext<'a> {
    pub fn new(
        descriptor: &'a UnitDescriptor,
        title: Option<&'a str>,
        base_dir: &'a Path,
        args: &'a Map<String, Value>,
    ) -> Self {
        Self {
            descriptor,
            title,
            base_dir,
            args,
        }
    }

    /// Deserialize the binding's `args` object into a program's own type.
    pub fn args<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.args.clone()))
            .context("invalid program arguments")
    }

    /// Relative paths are taken relative to the unit's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Manifest title, falling back to the unit's file stem.
    pub fn display_title(&self) -> String {
        self.title
            .map(str::to_string)
            .unwrap_or_else(|| self.descriptor.stem().to_string())
    }
}

/// Program name → builder.
#[derive(Clone, Debug, Default)]
pub struct ProgramTable {
    programs: BTreeMap<String, ProgramBuilder>,
}

impl ProgramTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::new()
            .with(EXCHANGE_REPORT, build_exchange_report)
            .with(BASIC_STATS, build_basic_stats)
    }

    pub fn with(mut self, name: &str, builder: ProgramBuilder) -> Self {
        self.programs.insert(name.to_string(), builder);
        self
    }

    pub fn get(&self, name: &str) -> Option<ProgramBuilder> {
        self.programs.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }

    /// Look up `name` and run its builder against `ctx`.
    pub fn bind(&self, name: &str, ctx: &ProgramContext<'_>) -> Result<Box<dyn Entrypoint>> {
        let Some(builder) = self.get(name) else {
            bail!(
                "unknown program '{name}' (known: {})",
                self.names().collect::<Vec<_>>().join(", ")
            );
        };
        builder(ctx).with_context(|| format!("binding program '{name}'"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExchangeReportArgs {
    dataset: PathBuf,
    #[serde(default)]
    gpa_dataset: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BasicStatsArgs {
    dataset: PathBuf,
}

/// Full exchange dashboard, optionally followed by the GPA comparison.
struct ExchangeReport {
    title: String,
    dataset: PathBuf,
    gpa_dataset: Option<PathBuf>,
}

/// Student sections only, on the raw university names.
struct BasicStats {
    title: String,
    dataset: PathBuf,
}

fn build_exchange_report(ctx: &ProgramContext<'_>) -> Result<Box<dyn Entrypoint>> {
    let args: ExchangeReportArgs = ctx.args()?;
    Ok(Box::new(ExchangeReport {
        title: ctx.display_title(),
        dataset: ctx.resolve_path(&args.dataset),
        gpa_dataset: args.gpa_dataset.as_deref().map(|path| ctx.resolve_path(path)),
    }))
}

fn build_basic_stats(ctx: &ProgramContext<'_>) -> Result<Box<dyn Entrypoint>> {
    let args: BasicStatsArgs = ctx.args()?;
    Ok(Box::new(BasicStats {
        title: ctx.display_title(),
        dataset: ctx.resolve_path(&args.dataset),
    }))
}

impl Entrypoint for ExchangeReport {
    fn invoke(&self, surface: &mut dyn Surface) -> Result<()> {
        surface.title(&self.title)?;
        let students = Dataset::from_path(&self.dataset)?;
        let cleaned = clean_students(&students, true);
        surface.markdown(&overview(&cleaned))?;

        let gpa = match &self.gpa_dataset {
            Some(path) if path.is_file() => Some(Dataset::from_path(path)?),
            Some(path) => {
                surface.warning(&format!(
                    "GPA dataset {} not found; skipping the GPA comparison",
                    path.display()
                ))?;
                None
            }
            None => None,
        };

        emit_sections(surface, STUDENT_SECTIONS, &cleaned)?;
        if let Some(gpa) = gpa {
            emit_sections(surface, GPA_SECTIONS, &gpa)?;
        }
        Ok(())
    }
}

impl Entrypoint for BasicStats {
    fn invoke(&self, surface: &mut dyn Surface) -> Result<()> {
        surface.title(&self.title)?;
        let students = Dataset::from_path(&self.dataset)?;
        let cleaned = clean_students(&students, false);
        surface.markdown(&overview(&cleaned))?;
        emit_sections(surface, STUDENT_SECTIONS, &cleaned)
    }
}

/// Emits each section as soon as it is built, so a later failure leaves the
/// earlier sections visible.
fn emit_sections(surface: &mut dyn Surface, sections: &[Section], data: &Dataset) -> Result<()> {
    for section in sections {
        debug!(section = section.title, "building section");
        let artifacts = section.build(data)?;
        surface.subheader(section.title)?;
        for artifact in &artifacts {
            surface.artifact(artifact)?;
        }
    }
    Ok(())
}

fn overview(data: &Dataset) -> String {
    let distinct = |column: &str| -> usize {
        data.text_column(column)
            .map(|cells| cells.into_iter().flatten().collect::<BTreeSet<_>>().len())
            .unwrap_or(0)
    };
    format!(
        "{} student records across {} host universities and {} majors.",
        data.len(),
        distinct(HOST_UNIVERSITY),
        distinct(MAJOR)
    )
}

//! Plain-text renderer for surface events recorded as NDJSON.
//!
//! Sits at the end of pipelines like `hub --format json run A x.json |
//! hub-render`. Events are parsed with the shared reader so the renderer
//! prints exactly what a live text surface would, followed by a summary.

use anyhow::{Result, anyhow, bail};
use exchange_hub::surface::{EventReadError, TextRenderer};
use exchange_hub::{RunStatus, SurfaceEvent, observability, read_surface_events};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::io::{self, BufRead, BufReader, IsTerminal};

fn main() {
    observability::init_tracing();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    Cli::parse()?;
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("hub-render expects surface-event NDJSON on stdin (e.g. hub --format json run A x.json | hub-render)");
    }

    let reader = BufReader::new(stdin.lock());
    let mut output = String::new();
    render_event_stream(reader, &mut output).map_err(|err| match err {
        RenderError::Read(inner) => anyhow!(inner),
        RenderError::Write(inner) => anyhow!(inner),
    })?;
    print!("{output}");
    Ok(())
}

/// Read NDJSON from `reader`, render each event, then append a summary.
pub fn render_event_stream<R: BufRead, W: fmt::Write>(
    reader: R,
    writer: &mut W,
) -> Result<(), RenderError> {
    let events = read_surface_events(reader).map_err(RenderError::Read)?;
    let mut renderer = TextRenderer::new();
    for event in &events {
        renderer.render(event, writer).map_err(RenderError::Write)?;
    }
    writeln!(writer).map_err(RenderError::Write)?;
    render_summary(&summarize_events(&events), writer).map_err(RenderError::Write)
}

#[derive(Debug, Default)]
struct RenderStats {
    runs: usize,
    completed: usize,
    failed: usize,
    artifacts: BTreeMap<String, usize>,
    diagnostics: BTreeMap<String, usize>,
    warnings: usize,
}

fn summarize_events(events: &[SurfaceEvent]) -> RenderStats {
    let mut stats = RenderStats::default();
    for event in events {
        match event {
            SurfaceEvent::BeginRun(_) => stats.runs += 1,
            SurfaceEvent::EndRun { status } => match status {
                RunStatus::Completed => stats.completed += 1,
                RunStatus::Failed => stats.failed += 1,
            },
            SurfaceEvent::Artifact(artifact) => {
                *stats
                    .artifacts
                    .entry(artifact.kind.type_name().to_string())
                    .or_insert(0) += 1;
            }
            SurfaceEvent::Diagnostic(diagnostic) => {
                *stats
                    .diagnostics
                    .entry(diagnostic.kind.as_str().to_string())
                    .or_insert(0) += 1;
            }
            SurfaceEvent::Warning { .. } => stats.warnings += 1,
            SurfaceEvent::Title { .. }
            | SurfaceEvent::Markdown { .. }
            | SurfaceEvent::Subheader { .. } => {}
        }
    }
    stats
}

fn render_summary(stats: &RenderStats, writer: &mut impl fmt::Write) -> fmt::Result {
    writeln!(writer, "hub render summary")?;
    writeln!(writer, "==================")?;
    writeln!(writer, "runs        : {}", stats.runs)?;
    writeln!(writer, "completed   : {}", stats.completed)?;
    writeln!(writer, "failed      : {}", stats.failed)?;
    writeln!(writer, "artifacts   : {}", format_counts(&stats.artifacts, "none"))?;
    writeln!(writer, "diagnostics : {}", format_counts(&stats.diagnostics, "none"))?;
    writeln!(writer, "warnings    : {}", stats.warnings)?;
    Ok(())
}

fn format_counts(map: &BTreeMap<String, usize>, empty_label: &str) -> String {
    if map.is_empty() {
        return empty_label.to_string();
    }
    map.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
pub enum RenderError {
    Read(EventReadError),
    Write(fmt::Error),
}

struct Cli;

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os();
        let _program = args.next();
        for arg in args {
            let arg_str = arg
                .to_str()
                .ok_or_else(|| anyhow!("invalid UTF-8 in argument"))?;
            match arg_str {
                "--help" | "-h" => usage(0),
                other => bail!("unknown argument: {other}"),
            }
        }
        Ok(Self)
    }
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: hub-render < events.ndjson\n\nReads surface events (hub --format json) on stdin and prints them as text.\n\nOptions:\n  --help                    Show this help text."
    );
    std::process::exit(code);
}

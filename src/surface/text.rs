//! Plain-text rendering of surface events.
//!
//! Shared by `TextSurface` and the `hub-render` binary so a live run and a
//! replayed NDJSON stream print the same way.

use crate::report::artifact::{Artifact, ArtifactKind};
use crate::surface::{RunStatus, Surface, SurfaceEvent};
use std::fmt::{self, Write as _};
use std::io::{self, Write};

const HISTOGRAM_WIDTH: usize = 40;
const MAX_SCATTER_ROWS: usize = 5;

/// Stateful renderer; remembers how much a run emitted so a failed run can
/// be labelled with the size of its partial output.
#[derive(Debug, Default)]
pub struct TextRenderer {
    artifacts_in_run: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &SurfaceEvent, out: &mut impl fmt::Write) -> fmt::Result {
        match event {
            SurfaceEvent::BeginRun(header) => {
                self.artifacts_in_run = 0;
                writeln!(
                    out,
                    "== {} / {} ({})",
                    header.topic, header.unit, header.entrypoint
                )
            }
            SurfaceEvent::Title { text } => {
                writeln!(out, "{text}")?;
                writeln!(out, "{}", "=".repeat(text.chars().count()))
            }
            SurfaceEvent::Markdown { text } => {
                for line in text.trim().lines() {
                    writeln!(out, "{}", line.trim_end())?;
                }
                Ok(())
            }
            SurfaceEvent::Subheader { text } => {
                writeln!(out)?;
                writeln!(out, "{text}")?;
                writeln!(out, "{}", "-".repeat(text.chars().count()))
            }
            SurfaceEvent::Artifact(artifact) => {
                self.artifacts_in_run += 1;
                render_artifact(artifact, out)
            }
            SurfaceEvent::Warning { message } => writeln!(out, "warning: {message}"),
            SurfaceEvent::Diagnostic(diagnostic) => writeln!(out, "error: {diagnostic}"),
            SurfaceEvent::EndRun { status } => match status {
                RunStatus::Completed => writeln!(out, "== run completed"),
                RunStatus::Failed => writeln!(
                    out,
                    "== run failed; the {} artifact(s) above are partial output",
                    self.artifacts_in_run
                ),
            },
        }
    }
}

/// Renders events to any `io::Write` as they arrive.
pub struct TextSurface<W: Write> {
    writer: W,
    renderer: TextRenderer,
}

impl<W: Write> TextSurface<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            renderer: TextRenderer::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Surface for TextSurface<W> {
    fn emit(&mut self, event: SurfaceEvent) -> io::Result<()> {
        let mut buf = String::new();
        self.renderer
            .render(&event, &mut buf)
            .map_err(io::Error::other)?;
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()
    }
}

fn render_artifact(artifact: &Artifact, out: &mut impl fmt::Write) -> fmt::Result {
    writeln!(out, "[{}] {}", artifact.kind.type_name(), artifact.name)?;
    if !artifact.caption.is_empty() {
        writeln!(out, "  {}", artifact.caption)?;
    }
    match &artifact.kind {
        ArtifactKind::Pie { slices } => {
            for slice in slices {
                writeln!(
                    out,
                    "    {}: {} ({:.1}%)",
                    slice.label, slice.count, slice.percent
                )?;
            }
        }
        ArtifactKind::Bar { bars, .. } => {
            for bar in bars {
                writeln!(out, "    {}: {}", bar.label, bar.value)?;
            }
        }
        ArtifactKind::GroupedBar { groups, series } => {
            for (idx, group) in groups.iter().enumerate() {
                let cells: Vec<String> = series
                    .iter()
                    .map(|s| format!("{}={}", s.name, s.values.get(idx).copied().unwrap_or(0)))
                    .collect();
                writeln!(out, "    {}: {}", group, cells.join(" "))?;
            }
        }
        ArtifactKind::BoxPlot { groups, .. } => {
            for group in groups {
                let s = &group.stats.summary;
                writeln!(
                    out,
                    "    {}: n={} median={:.2} q1={:.2} q3={:.2} whiskers={:.2}..{:.2} outliers={}",
                    group.label,
                    s.count,
                    s.median,
                    s.q1,
                    s.q3,
                    group.stats.whisker_low,
                    group.stats.whisker_high,
                    group.stats.outliers.len()
                )?;
            }
        }
        ArtifactKind::Violin { groups, .. } => {
            for group in groups {
                let s = &group.stats.summary;
                let peak = group
                    .density
                    .iter()
                    .max_by(|a, b| a.y.total_cmp(&b.y))
                    .map(|p| format!("{:.2}", p.x))
                    .unwrap_or_else(|| "n/a".into());
                writeln!(
                    out,
                    "    {}: n={} median={:.2} iqr={:.2}..{:.2} density peak at {}",
                    group.label, s.count, s.median, s.q1, s.q3, peak
                )?;
            }
        }
        ArtifactKind::Heatmap {
            rows,
            columns,
            cells,
        } => {
            let mut table = vec![std::iter::once(String::new())
                .chain(columns.iter().cloned())
                .collect::<Vec<_>>()];
            for (label, row) in rows.iter().zip(cells) {
                table.push(
                    std::iter::once(label.clone())
                        .chain(row.iter().map(u64::to_string))
                        .collect(),
                );
            }
            render_grid(&table, out)?;
        }
        ArtifactKind::Histogram { bins, .. } => {
            let max = bins.iter().map(|bin| bin.count).max().unwrap_or(0);
            for bin in bins {
                let bar_len = if max == 0 {
                    0
                } else {
                    bin.count * HISTOGRAM_WIDTH / max
                };
                writeln!(
                    out,
                    "    {:>8.2} .. {:>8.2} | {:<width$} {}",
                    bin.start,
                    bin.end,
                    "#".repeat(bar_len),
                    bin.count,
                    width = HISTOGRAM_WIDTH
                )?;
            }
        }
        ArtifactKind::Scatter {
            x_label,
            y_label,
            points,
        } => {
            writeln!(out, "    {} points ({x_label} vs {y_label})", points.len())?;
            for point in points.iter().take(MAX_SCATTER_ROWS) {
                writeln!(out, "    ({:.2}, {:.2})", point.x, point.y)?;
            }
            if points.len() > MAX_SCATTER_ROWS {
                writeln!(out, "    ...")?;
            }
        }
        ArtifactKind::Table { headers, rows } => {
            let mut table = vec![headers.clone()];
            table.extend(rows.iter().cloned());
            render_grid(&table, out)?;
        }
    }
    Ok(())
}

fn render_grid(table: &[Vec<String>], out: &mut impl fmt::Write) -> fmt::Result {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            table
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    for row in table {
        let mut line = String::from("    ");
        for (col, width) in widths.iter().enumerate() {
            let cell = row.get(col).map(String::as_str).unwrap_or("");
            let _ = write!(line, "{cell:<width$}  ");
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

//! User-facing output channel shared by the dispatcher and the units it runs.
//!
//! Everything a unit shows, and every diagnostic the dispatcher reports, goes
//! through a [`Surface`] as a [`SurfaceEvent`]. The text surface renders for
//! terminals, the JSON surface streams NDJSON for pipelines (`hub --format
//! json | hub-render`), and the recording surface keeps events in memory.

pub mod text;

pub use text::{TextRenderer, TextSurface};

use crate::error::Diagnostic;
use crate::report::Artifact;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufRead, Write};

/// Identifies the unit and entrypoint a run belongs to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunHeader {
    pub topic: String,
    pub unit: String,
    pub entrypoint: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Output emitted since `begin_run` is partial.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    BeginRun(RunHeader),
    Title { text: String },
    Markdown { text: String },
    Subheader { text: String },
    Artifact(Artifact),
    Warning { message: String },
    Diagnostic(Diagnostic),
    EndRun { status: RunStatus },
}

pub trait Surface {
    fn emit(&mut self, event: SurfaceEvent) -> io::Result<()>;

    fn begin_run(&mut self, header: &RunHeader) -> io::Result<()> {
        self.emit(SurfaceEvent::BeginRun(header.clone()))
    }

    fn title(&mut self, text: &str) -> io::Result<()> {
        self.emit(SurfaceEvent::Title {
            text: text.to_string(),
        })
    }

    fn markdown(&mut self, text: &str) -> io::Result<()> {
        self.emit(SurfaceEvent::Markdown {
            text: text.to_string(),
        })
    }

    fn subheader(&mut self, text: &str) -> io::Result<()> {
        self.emit(SurfaceEvent::Subheader {
            text: text.to_string(),
        })
    }

    fn artifact(&mut self, artifact: &Artifact) -> io::Result<()> {
        self.emit(SurfaceEvent::Artifact(artifact.clone()))
    }

    fn warning(&mut self, message: &str) -> io::Result<()> {
        self.emit(SurfaceEvent::Warning {
            message: message.to_string(),
        })
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        self.emit(SurfaceEvent::Diagnostic(diagnostic.clone()))
    }

    fn end_run(&mut self, status: RunStatus) -> io::Result<()> {
        self.emit(SurfaceEvent::EndRun { status })
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.events.iter().filter_map(|event| match event {
            SurfaceEvent::Artifact(artifact) => Some(artifact),
            _ => None,
        })
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter_map(|event| match event {
            SurfaceEvent::Diagnostic(diagnostic) => Some(diagnostic),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            SurfaceEvent::Warning { message } => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Surface for RecordingSurface {
    fn emit(&mut self, event: SurfaceEvent) -> io::Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Streams one JSON event per line.
pub struct JsonSurface<W: Write> {
    writer: W,
}

impl<W: Write> JsonSurface<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Surface for JsonSurface<W> {
    fn emit(&mut self, event: SurfaceEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &event).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Errors that can occur while reading an NDJSON event stream.
#[derive(Debug)]
pub enum EventReadError {
    Io(io::Error),
    Parse {
        line: usize,
        error: serde_json::Error,
    },
}

impl fmt::Display for EventReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventReadError::Io(err) => write!(f, "failed to read event stream: {err}"),
            EventReadError::Parse { line, error } => {
                write!(f, "line {line}: unable to parse surface event ({error})")
            }
        }
    }
}

impl std::error::Error for EventReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EventReadError::Io(err) => Some(err),
            EventReadError::Parse { error, .. } => Some(error),
        }
    }
}

/// Read surface events from an NDJSON stream.
///
/// Whitespace-only lines are skipped; parse errors carry the 1-based line
/// number.
pub fn read_surface_events<R: BufRead>(mut reader: R) -> Result<Vec<SurfaceEvent>, EventReadError> {
    let mut events = Vec::new();
    let mut line_buf = String::new();
    let mut line_number = 0usize;

    loop {
        line_buf.clear();
        let bytes = reader
            .read_line(&mut line_buf)
            .map_err(EventReadError::Io)?;
        if bytes == 0 {
            break;
        }
        line_number += 1;
        let trimmed = line_buf.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event = serde_json::from_str::<SurfaceEvent>(trimmed).map_err(|error| {
            EventReadError::Parse {
                line: line_number,
                error,
            }
        })?;
        events.push(event);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::report::ArtifactKind;
    use std::io::Cursor;

    fn header() -> RunHeader {
        RunHeader {
            topic: "topic3".into(),
            unit: "basic_stats.json".into(),
            entrypoint: "main".into(),
        }
    }

    #[test]
    fn json_surface_streams_readable_events() {
        let mut surface = JsonSurface::new(Vec::new());
        surface.begin_run(&header()).unwrap();
        surface.subheader("Top Majors").unwrap();
        surface
            .artifact(&Artifact {
                name: "majors".into(),
                caption: "ME leads".into(),
                kind: ArtifactKind::Table {
                    headers: vec!["Major".into()],
                    rows: vec![vec!["ME".into()]],
                },
            })
            .unwrap();
        surface
            .diagnostic(&Diagnostic {
                kind: ErrorKind::Run,
                topic: Some("topic3".into()),
                unit: Some("basic_stats.json".into()),
                message: "boom".into(),
            })
            .unwrap();
        surface.end_run(RunStatus::Failed).unwrap();

        let bytes = surface.into_inner();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().next().unwrap().contains("\"event\":\"begin_run\""));

        let events = read_surface_events(Cursor::new(bytes)).unwrap();
        assert_eq!(events[0], SurfaceEvent::BeginRun(header()));
        assert!(matches!(events[2], SurfaceEvent::Artifact(ref a) if a.name == "majors"));
        assert_eq!(
            events[4],
            SurfaceEvent::EndRun {
                status: RunStatus::Failed
            }
        );
    }

    #[test]
    fn read_events_reports_line_numbers() {
        let ndjson = "{\"event\":\"title\",\"text\":\"a\"}\n\n{ nope }\n";
        let err = read_surface_events(Cursor::new(ndjson)).unwrap_err();
        match err {
            EventReadError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn recording_surface_filters_by_event_type() {
        let mut surface = RecordingSurface::new();
        surface.warning("no units").unwrap();
        surface.title("Hub").unwrap();
        assert_eq!(surface.warnings().collect::<Vec<_>>(), vec!["no units"]);
        assert_eq!(surface.diagnostics().count(), 0);
        assert_eq!(surface.events().len(), 2);
        surface.clear();
        assert!(surface.events().is_empty());
    }
}

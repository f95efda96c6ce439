//! Command-line front end for the exchange hub.
//!
//! Listing commands print the catalog; `run` performs one selection cycle and
//! `session` keeps a selector loop on stdin that survives failed runs. With
//! `--format json` every surface event is written as NDJSON so the output can
//! be piped into `hub-render` or stored for later.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exchange_hub::{
    Catalog, Dispatcher, HubConfig, HubError, JsonSurface, ManifestLoader, OutputFormat,
    Registry, Selection, Selector, Surface, TextSurface, UnitDescriptor, observability,
    warn_empty,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Parser)]
#[command(
    name = "hub",
    version,
    about = "Discover and run exchange-program report units"
)]
struct Cli {
    /// Apps root holding one directory per topic (or set HUB_ROOT).
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Output format (or set HUB_FORMAT).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List topics under the apps root.
    Topics,
    /// List the runnable units of one topic.
    Units { topic: String },
    /// List every topic with its units, numbered for positional selection.
    Catalog,
    /// Run one unit. TOPIC and UNIT are names or 1-based positions.
    Run { topic: String, unit: String },
    /// Read `<topic> <unit>` selections from stdin until `quit`.
    Session,
}

fn main() {
    observability::init_tracing();
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = HubConfig::resolve(cli.root, cli.format)?;
    let registry = Registry::new(&config.root);
    let mut out = Output::new(config.format);

    match cli.command {
        Command::Topics => {
            let topics = match registry.topics() {
                Ok(topics) => topics,
                Err(err) => return out.report(&err),
            };
            if topics.is_empty() {
                out.surface.warning("no topics found under the apps root")?;
            }
            out.listing(&topics, |topics, w| {
                for topic in topics {
                    writeln!(w, "{topic}")?;
                }
                Ok(())
            })?;
            Ok(0)
        }
        Command::Units { topic } => {
            let units = match registry.units(&topic) {
                Ok(units) => units,
                Err(err) => return out.report(&err),
            };
            if units.is_empty() {
                out.surface
                    .warning(&format!("topic '{topic}' has no runnable units"))?;
            }
            out.listing(&units, |units, w| write_units(units, w))?;
            Ok(0)
        }
        Command::Catalog => {
            let catalog = match registry.catalog() {
                Ok(catalog) => catalog,
                Err(err) => return out.report(&err),
            };
            warn_empty(&catalog, out.surface.as_mut())?;
            out.listing(&catalog, write_catalog)?;
            Ok(0)
        }
        Command::Run { topic, unit } => {
            let mut hub = Dispatcher::new(registry, ManifestLoader::builtin()?);
            let selection = Selection::new(Selector::parse(&topic), Selector::parse(&unit));
            let outcome = hub.select(&selection, out.surface.as_mut());
            Ok(if outcome.is_completed() { 0 } else { 1 })
        }
        Command::Session => {
            let hub = Dispatcher::new(registry, ManifestLoader::builtin()?);
            session(hub, &mut out)
        }
    }
}

fn session(mut hub: Dispatcher<ManifestLoader>, out: &mut Output) -> Result<i32> {
    match hub.catalog() {
        Ok(catalog) => {
            warn_empty(&catalog, out.surface.as_mut())?;
            out.listing(&catalog, write_catalog)?;
        }
        Err(err) => return out.report(&err),
    }

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            eprint!("hub> ");
            io::stderr().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading selection from stdin")?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["list"] => match hub.catalog() {
                Ok(catalog) => {
                    warn_empty(&catalog, out.surface.as_mut())?;
                    out.listing(&catalog, write_catalog)?;
                }
                Err(err) => {
                    out.report(&err)?;
                }
            },
            [topic, unit] => {
                let selection = Selection::new(Selector::parse(topic), Selector::parse(unit));
                hub.select(&selection, out.surface.as_mut());
            }
            _ => out
                .surface
                .warning("expected `<topic> <unit>`, `list` or `quit`")?,
        }
    }
    Ok(0)
}

/// Stdout plus the surface built for the chosen format.
struct Output {
    format: OutputFormat,
    surface: Box<dyn Surface>,
}

impl Output {
    fn new(format: OutputFormat) -> Self {
        let surface: Box<dyn Surface> = match format {
            OutputFormat::Text => Box::new(TextSurface::new(io::stdout())),
            OutputFormat::Json => Box::new(JsonSurface::new(io::stdout())),
        };
        Self { format, surface }
    }

    /// Text listings go through `render`; JSON listings are one document
    /// per line.
    fn listing<T, F>(&mut self, value: &T, render: F) -> Result<()>
    where
        T: serde::Serialize + ?Sized,
        F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        match self.format {
            OutputFormat::Text => render(value, &mut handle)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut handle, value)?;
                writeln!(handle)?;
            }
        }
        handle.flush()?;
        Ok(())
    }

    fn report(&mut self, err: &HubError) -> Result<i32> {
        self.surface.diagnostic(&err.to_diagnostic())?;
        Ok(1)
    }
}

fn write_units(units: &[UnitDescriptor], w: &mut dyn Write) -> io::Result<()> {
    for (idx, unit) in units.iter().enumerate() {
        writeln!(w, "{:>3}. {}", idx + 1, unit.name)?;
    }
    Ok(())
}

fn write_catalog(catalog: &Catalog, w: &mut dyn Write) -> io::Result<()> {
    for (idx, (topic, units)) in catalog.iter().enumerate() {
        writeln!(w, "{:>3}. {topic}", idx + 1)?;
        if units.is_empty() {
            writeln!(w, "       (no units)")?;
        }
        for (unit_idx, unit) in units.iter().enumerate() {
            writeln!(w, "     {:>3}. {}", unit_idx + 1, unit.name)?;
        }
    }
    Ok(())
}

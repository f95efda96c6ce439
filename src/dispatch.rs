//! Resolve, load and run one selected unit at a time.
//!
//! A selection cycle walks `Idle → Resolving → Loading → Running` and ends
//! back in `Idle`, passing through `Reported` whenever a step fails. Every
//! failure, including a panic inside a unit, is folded into a [`HubError`]
//! and rendered on the surface so the host stays up for the next selection.

use crate::catalog::{Catalog, Registry, UnitDescriptor};
use crate::error::{HubError, NotFoundTarget};
use crate::surface::{RunHeader, RunStatus, Surface};
use crate::unit::{EntrypointKind, LoadedUnit, UnitLoader};
use anyhow::anyhow;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::thread;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Resolving,
    Loading,
    Running,
    Reported,
}

/// Picks a topic or unit by name or by 1-based position in the listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selector {
    Name(String),
    Index(usize),
}

impl Selector {
    /// Canonical decimal tokens select by position; anything else by name.
    ///
    /// A listed name spelled like a position still wins at resolution time.
    pub fn parse(token: &str) -> Self {
        match token.parse::<usize>() {
            Ok(index) if index.to_string() == token => Selector::Index(index),
            _ => Selector::Name(token.to_string()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(name) => f.write_str(name),
            Selector::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    pub topic: Selector,
    pub unit: Selector,
}

impl Selection {
    pub fn new(topic: impl Into<Selector>, unit: impl Into<Selector>) -> Self {
        Self {
            topic: topic.into(),
            unit: unit.into(),
        }
    }
}

#[derive(Debug)]
pub enum SelectionOutcome {
    Completed {
        descriptor: UnitDescriptor,
        entrypoint: EntrypointKind,
    },
    Reported(HubError),
}

impl SelectionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SelectionOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&HubError> {
        match self {
            SelectionOutcome::Reported(err) => Some(err),
            SelectionOutcome::Completed { .. } => None,
        }
    }
}

pub struct Dispatcher<L: UnitLoader> {
    registry: Registry,
    loader: L,
    phase: Phase,
}

impl<L: UnitLoader> Dispatcher<L> {
    pub fn new(registry: Registry, loader: L) -> Self {
        Self {
            registry,
            loader,
            phase: Phase::Idle,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fresh scan of the registry.
    pub fn catalog(&self) -> Result<Catalog, HubError> {
        self.registry.catalog()
    }

    pub fn resolve(&self, topic: &str, unit: &str) -> Result<UnitDescriptor, HubError> {
        self.registry
            .units(topic)?
            .into_iter()
            .find(|descriptor| descriptor.name == unit)
            .ok_or_else(|| HubError::not_found(NotFoundTarget::Unit, format!("{topic}/{unit}")))
    }

    /// Resolve a selection against a fresh listing of topics and units.
    pub fn resolve_selection(&self, selection: &Selection) -> Result<UnitDescriptor, HubError> {
        let topic = match &selection.topic {
            Selector::Name(name) => name.clone(),
            Selector::Index(index) => {
                let topics = self.registry.topics()?;
                let token = index.to_string();
                if topics.contains(&token) {
                    token
                } else {
                    pick(topics, *index).ok_or_else(|| {
                        HubError::not_found(NotFoundTarget::Topic, format!("#{index}"))
                    })?
                }
            }
        };
        match &selection.unit {
            Selector::Name(name) => self.resolve(&topic, name),
            Selector::Index(index) => {
                let units = self.registry.units(&topic)?;
                pick(units, *index).ok_or_else(|| {
                    HubError::not_found(NotFoundTarget::Unit, format!("{topic}/#{index}"))
                })
            }
        }
    }

    /// Delegate to the loader; a panicking loader is reported as `Load`.
    pub fn load(&self, descriptor: &UnitDescriptor) -> Result<LoadedUnit, HubError> {
        match catch_quietly(|| self.loader.load(descriptor)) {
            Ok(result) => result,
            Err(payload) => Err(HubError::load(
                &descriptor.topic,
                &descriptor.name,
                anyhow!("loader panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }

    /// Invoke `app`, else `main`. Errors and panics from the entrypoint both
    /// become `Run`.
    pub fn run(
        &self,
        unit: &LoadedUnit,
        surface: &mut dyn Surface,
    ) -> Result<EntrypointKind, HubError> {
        let descriptor = unit.descriptor();
        let Some((kind, entrypoint)) = unit.entrypoint() else {
            return Err(HubError::NoEntrypoint {
                topic: descriptor.topic.clone(),
                unit: descriptor.name.clone(),
            });
        };

        let outcome = catch_quietly(|| entrypoint.invoke(surface));
        let failure = match outcome {
            Ok(Ok(())) => return Ok(kind),
            Ok(Err(err)) => err,
            Err(payload) => anyhow!("panicked: {}", panic_message(payload.as_ref())),
        };
        Err(HubError::run(
            &descriptor.topic,
            &descriptor.name,
            kind.as_str(),
            failure,
        ))
    }

    /// One full selection cycle. Always leaves the dispatcher `Idle`.
    pub fn select(&mut self, selection: &Selection, surface: &mut dyn Surface) -> SelectionOutcome {
        let outcome = self.cycle(selection, surface);
        if let SelectionOutcome::Reported(err) = &outcome {
            self.phase = Phase::Reported;
            warn!(kind = %err.kind(), error = %err, "selection failed");
            emit(surface.diagnostic(&err.to_diagnostic()));
            if matches!(err, HubError::Run { .. }) {
                emit(surface.end_run(RunStatus::Failed));
            }
        }
        self.phase = Phase::Idle;
        outcome
    }

    fn cycle(&mut self, selection: &Selection, surface: &mut dyn Surface) -> SelectionOutcome {
        self.phase = Phase::Resolving;
        debug!(topic = %selection.topic, unit = %selection.unit, "resolving selection");
        let descriptor = match self.resolve_selection(selection) {
            Ok(descriptor) => descriptor,
            Err(err) => return SelectionOutcome::Reported(err),
        };

        self.phase = Phase::Loading;
        debug!(topic = %descriptor.topic, unit = %descriptor.name, "loading unit");
        let unit = match self.load(&descriptor) {
            Ok(unit) => unit,
            Err(err) => return SelectionOutcome::Reported(err),
        };
        let Some((kind, _)) = unit.entrypoint() else {
            return SelectionOutcome::Reported(HubError::NoEntrypoint {
                topic: descriptor.topic.clone(),
                unit: descriptor.name.clone(),
            });
        };

        self.phase = Phase::Running;
        info!(
            topic = %descriptor.topic,
            unit = %descriptor.name,
            entrypoint = kind.as_str(),
            "running unit"
        );
        emit(surface.begin_run(&RunHeader {
            topic: descriptor.topic.clone(),
            unit: descriptor.name.clone(),
            entrypoint: kind.as_str().to_string(),
        }));
        match self.run(&unit, surface) {
            Ok(entrypoint) => {
                emit(surface.end_run(RunStatus::Completed));
                SelectionOutcome::Completed {
                    descriptor,
                    entrypoint,
                }
            }
            Err(err) => SelectionOutcome::Reported(err),
        }
    }
}

impl<L: UnitLoader + fmt::Debug> fmt::Debug for Dispatcher<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.registry.root())
            .field("loader", &self.loader)
            .field("phase", &self.phase)
            .finish()
    }
}

fn pick<T>(items: Vec<T>, index: usize) -> Option<T> {
    index
        .checked_sub(1)
        .and_then(|idx| items.into_iter().nth(idx))
}

/// Surface write failures are logged; they never abort a cycle.
fn emit(result: io::Result<()>) {
    if let Err(err) = result {
        warn!(error = %err, "failed to write to surface");
    }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

/// `catch_unwind` that keeps the panic hook silent for panics on this
/// thread while `f` runs; the panic is reported as a diagnostic instead.
fn catch_quietly<R>(f: impl FnOnce() -> R) -> thread::Result<R> {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET_PANICS.with(Cell::get) {
                previous(info);
            }
        }));
    });
    let was_quiet = QUIET_PANICS.with(|quiet| quiet.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET_PANICS.with(|quiet| quiet.set(was_quiet));
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Loading a discovered unit into something the dispatcher can run.
//!
//! A unit exposes up to two entrypoints, `app` and `main`. How a descriptor
//! becomes a [`LoadedUnit`] is left to a [`UnitLoader`]: the manifest loader
//! reads JSON manifests from disk and binds them to compiled-in programs,
//! while the static loader serves a fixed table for embedding and tests.

pub mod manifest;
pub mod programs;

pub use manifest::ManifestLoader;
pub use programs::{ProgramBuilder, ProgramContext, ProgramTable};

use crate::catalog::UnitDescriptor;
use crate::error::HubError;
use crate::surface::Surface;
use anyhow::anyhow;
use std::collections::BTreeMap;
use std::fmt;

/// Zero-argument callable exposed by a unit. The surface is its only channel
/// to the user.
pub trait Entrypoint {
    fn invoke(&self, surface: &mut dyn Surface) -> anyhow::Result<()>;
}

impl<F> Entrypoint for F
where
    F: Fn(&mut dyn Surface) -> anyhow::Result<()>,
{
    fn invoke(&self, surface: &mut dyn Surface) -> anyhow::Result<()> {
        self(surface)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntrypointKind {
    App,
    Main,
}

impl EntrypointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrypointKind::App => "app",
            EntrypointKind::Main => "main",
        }
    }
}

impl fmt::Display for EntrypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit resolved for one selection. Never cached; dropped after the run.
pub struct LoadedUnit {
    descriptor: UnitDescriptor,
    title: Option<String>,
    app: Option<Box<dyn Entrypoint>>,
    main: Option<Box<dyn Entrypoint>>,
}

impl LoadedUnit {
    pub fn new(descriptor: UnitDescriptor) -> Self {
        Self {
            descriptor,
            title: None,
            app: None,
            main: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_app(self, entrypoint: impl Entrypoint + 'static) -> Self {
        self.with_boxed(EntrypointKind::App, Box::new(entrypoint))
    }

    pub fn with_main(self, entrypoint: impl Entrypoint + 'static) -> Self {
        self.with_boxed(EntrypointKind::Main, Box::new(entrypoint))
    }

    pub(crate) fn with_boxed(mut self, kind: EntrypointKind, entrypoint: Box<dyn Entrypoint>) -> Self {
        match kind {
            EntrypointKind::App => self.app = Some(entrypoint),
            EntrypointKind::Main => self.main = Some(entrypoint),
        }
        self
    }

    pub fn descriptor(&self) -> &UnitDescriptor {
        &self.descriptor
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn has(&self, kind: EntrypointKind) -> bool {
        match kind {
            EntrypointKind::App => self.app.is_some(),
            EntrypointKind::Main => self.main.is_some(),
        }
    }

    /// `app` wins over `main`; `None` when the unit exposes neither.
    pub fn entrypoint(&self) -> Option<(EntrypointKind, &dyn Entrypoint)> {
        if let Some(app) = &self.app {
            return Some((EntrypointKind::App, app.as_ref()));
        }
        self.main
            .as_deref()
            .map(|main| (EntrypointKind::Main, main))
    }
}

impl fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("descriptor", &self.descriptor)
            .field("title", &self.title)
            .field("app", &self.app.is_some())
            .field("main", &self.main.is_some())
            .finish()
    }
}

/// Strategy for turning a descriptor into a runnable unit.
pub trait UnitLoader {
    /// Parse, schema and binding failures are reported as `HubError::Load`.
    fn load(&self, descriptor: &UnitDescriptor) -> Result<LoadedUnit, HubError>;
}

type UnitFactory = Box<dyn Fn(&UnitDescriptor) -> anyhow::Result<LoadedUnit>>;

/// Compiled-in units keyed by `(topic, unit name)`.
#[derive(Default)]
pub struct StaticLoader {
    units: BTreeMap<(String, String), UnitFactory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, topic: &str, unit: &str, factory: F) -> Self
    where
        F: Fn(&UnitDescriptor) -> anyhow::Result<LoadedUnit> + 'static,
    {
        self.units
            .insert((topic.to_string(), unit.to_string()), Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl UnitLoader for StaticLoader {
    fn load(&self, descriptor: &UnitDescriptor) -> Result<LoadedUnit, HubError> {
        let key = (descriptor.topic.clone(), descriptor.name.clone());
        let factory = self.units.get(&key).ok_or_else(|| {
            HubError::load(
                &descriptor.topic,
                &descriptor.name,
                anyhow!("no compiled-in unit registered under this name"),
            )
        })?;
        factory(descriptor)
            .map_err(|err| HubError::load(&descriptor.topic, &descriptor.name, err))
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLoader")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

//! Shared library for the exchange hub.
//!
//! The hub discovers topics and units under an apps root, lets a caller pick
//! one, and runs it with failures reported as diagnostics instead of
//! crashing. Public items here form the contract the `hub` and `hub-render`
//! binaries depend on: discovery (`catalog`), loading (`unit`), the
//! selection cycle (`dispatch`), the output channel (`surface`) and the
//! reporting programs the bundled units bind to (`report`).
//!
//! Units are trusted, co-located manifests that bind to programs compiled
//! into this crate; nothing is loaded from outside the binary.

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observability;
pub mod report;
pub mod surface;
pub mod unit;

pub use catalog::{
    Catalog, Registry, UnitConvention, UnitDescriptor, UnitLocation, list_topics, list_units,
};
pub use config::{HubConfig, OutputFormat, find_apps_root};
pub use dispatch::{Dispatcher, Phase, Selection, SelectionOutcome, Selector};
pub use error::{Diagnostic, ErrorKind, HubError, NotFoundTarget};
pub use report::{Artifact, ArtifactKind, Dataset};
pub use surface::{
    JsonSurface, RecordingSurface, RunHeader, RunStatus, Surface, SurfaceEvent, TextSurface,
    read_surface_events,
};
pub use unit::{
    Entrypoint, EntrypointKind, LoadedUnit, ManifestLoader, ProgramTable, StaticLoader,
    UnitLoader,
};

/// Emit the empty-catalog warnings for `catalog` on `surface`.
///
/// Returns the number of warnings written. An empty root or a topic with no
/// units is a state the user should see, not an error.
pub fn warn_empty(catalog: &Catalog, surface: &mut dyn Surface) -> std::io::Result<usize> {
    if catalog.is_empty() {
        surface.warning("no topics found under the apps root")?;
        return Ok(1);
    }
    let mut warned = 0;
    for (topic, units) in catalog.iter() {
        if units.is_empty() {
            surface.warning(&format!("topic '{topic}' has no runnable units"))?;
            warned += 1;
        }
    }
    Ok(warned)
}

//! Registry side of the hub.
//!
//! Discovery walks the apps root once per selection cycle and returns
//! structured descriptors. Use `Registry` when a convention other than the
//! default `*.json` / `_` prefix is needed; the free functions cover the
//! common case.

pub mod model;
pub mod registry;

pub use model::{Catalog, UnitDescriptor, UnitLocation};
pub use registry::{
    DEFAULT_RESERVED_PREFIX, DEFAULT_UNIT_EXTENSION, Registry, UnitConvention, list_topics,
    list_units, list_units_with,
};

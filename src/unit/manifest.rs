//! JSON unit manifests bound to compiled-in programs.
//!
//! A unit file such as `apps/topic3/basic_stats.json` looks like:
//!
//! ```json
//! { "title": "Basic Statistics",
//!   "main": { "program": "basic-stats", "args": { "dataset": "Book2.ndjson" } } }
//! ```
//!
//! The manifest is validated against `schema/unit_manifest.schema.json`
//! before any binding happens, so shape errors are reported with the
//! offending JSON pointer rather than a serde message.

use crate::catalog::UnitDescriptor;
use crate::error::HubError;
use crate::unit::{EntrypointKind, LoadedUnit, ProgramContext, ProgramTable, UnitLoader};
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

const MANIFEST_SCHEMA: &str = include_str!("../../schema/unit_manifest.schema.json");

#[derive(Debug, Deserialize)]
struct UnitManifest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    app: Option<Binding>,
    #[serde(default)]
    main: Option<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    program: String,
    #[serde(default)]
    args: Map<String, Value>,
}

pub struct ManifestLoader {
    programs: ProgramTable,
    schema: JSONSchema,
}

impl ManifestLoader {
    pub fn new(programs: ProgramTable) -> Result<Self> {
        let schema_value: Value = serde_json::from_str(MANIFEST_SCHEMA)
            .context("parsing embedded unit manifest schema")?;
        let schema = JSONSchema::compile(&schema_value)
            .map_err(|err| anyhow!("compiling unit manifest schema: {err}"))?;
        Ok(Self { programs, schema })
    }

    /// Loader bound to [`ProgramTable::builtin`].
    pub fn builtin() -> Result<Self> {
        Self::new(ProgramTable::builtin())
    }

    fn load_manifest(&self, descriptor: &UnitDescriptor) -> Result<LoadedUnit> {
        let path = descriptor.location.path();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading unit manifest {}", descriptor.location))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing unit manifest {}", descriptor.location))?;

        if let Err(errors) = self.schema.validate(&value) {
            let details = errors
                .map(|err| format!("{}: {err}", err.instance_path))
                .collect::<Vec<_>>()
                .join("\n");
            bail!(
                "unit manifest {} failed schema validation:\n{}",
                descriptor.location,
                details
            );
        }

        let manifest: UnitManifest = serde_json::from_value(value)
            .with_context(|| format!("decoding unit manifest {}", descriptor.location))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));

        let mut unit = LoadedUnit::new(descriptor.clone());
        if let Some(title) = &manifest.title {
            unit = unit.with_title(title.as_str());
        }
        let bindings = [
            (EntrypointKind::App, manifest.app.as_ref()),
            (EntrypointKind::Main, manifest.main.as_ref()),
        ];
        for (kind, binding) in bindings {
            let Some(binding) = binding else {
                continue;
            };
            let ctx = ProgramContext::new(
                descriptor,
                manifest.title.as_deref(),
                base_dir,
                &binding.args,
            );
            let entrypoint = self
                .programs
                .bind(&binding.program, &ctx)
                .with_context(|| format!("`{kind}` entrypoint"))?;
            debug!(
                topic = %descriptor.topic,
                unit = %descriptor.name,
                entrypoint = kind.as_str(),
                program = %binding.program,
                "bound entrypoint"
            );
            unit = unit.with_boxed(kind, entrypoint);
        }
        Ok(unit)
    }
}

impl UnitLoader for ManifestLoader {
    fn load(&self, descriptor: &UnitDescriptor) -> Result<LoadedUnit, HubError> {
        self.load_manifest(descriptor)
            .map_err(|err| HubError::load(&descriptor.topic, &descriptor.name, err))
    }
}

impl fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestLoader")
            .field("programs", &self.programs.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::list_units;
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn unit_in(root: &Path, name: &str, manifest: &Value) -> UnitDescriptor {
        let topic = root.join("A");
        fs::create_dir_all(&topic).unwrap();
        fs::write(topic.join(name), manifest.to_string()).unwrap();
        list_units(root, "A")
            .unwrap()
            .into_iter()
            .find(|unit| unit.name == name)
            .unwrap()
    }

    fn load_error(manifest: &Value) -> String {
        let dir = TempDir::new().unwrap();
        let descriptor = unit_in(dir.path(), "x.json", manifest);
        let err = ManifestLoader::builtin().unwrap().load(&descriptor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        err.to_diagnostic().message
    }

    #[test]
    fn binds_both_entrypoints() {
        let dir = TempDir::new().unwrap();
        let descriptor = unit_in(
            dir.path(),
            "x.json",
            &json!({
                "title": "Exchange",
                "app": {"program": "exchange-report", "args": {"dataset": "Book2.ndjson"}},
                "main": {"program": "basic-stats", "args": {"dataset": "Book2.ndjson"}}
            }),
        );
        let unit = ManifestLoader::builtin().unwrap().load(&descriptor).unwrap();
        assert!(unit.has(EntrypointKind::App));
        assert!(unit.has(EntrypointKind::Main));
        assert_eq!(unit.title(), Some("Exchange"));
    }

    #[test]
    fn manifest_without_bindings_loads_with_no_entrypoint() {
        let dir = TempDir::new().unwrap();
        let descriptor = unit_in(dir.path(), "x.json", &json!({"title": "Notes"}));
        let unit = ManifestLoader::builtin().unwrap().load(&descriptor).unwrap();
        assert!(unit.entrypoint().is_none());
    }

    #[test]
    fn invalid_json_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let topic = dir.path().join("A");
        fs::create_dir_all(&topic).unwrap();
        fs::write(topic.join("x.json"), "{ \"main\": ").unwrap();
        let descriptor = list_units(dir.path(), "A").unwrap().remove(0);
        let err = ManifestLoader::builtin().unwrap().load(&descriptor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(err.to_diagnostic().message.contains("parsing unit manifest"));
    }

    #[test]
    fn schema_violations_name_the_pointer() {
        let message = load_error(&json!({"main": {"args": {}}}));
        assert!(message.contains("failed schema validation"), "{message}");
        assert!(message.contains("/main"), "{message}");
    }

    #[test]
    fn unknown_program_is_a_load_error() {
        let message = load_error(&json!({"app": {"program": "streamlit"}}));
        assert!(message.contains("`app` entrypoint"), "{message}");
        assert!(message.contains("unknown program 'streamlit'"), "{message}");
    }

    #[test]
    fn missing_required_arg_is_a_load_error() {
        let message = load_error(&json!({"main": {"program": "basic-stats"}}));
        assert!(message.contains("invalid program arguments"), "{message}");
    }
}

//! Locating the apps root and picking the output format.
//!
//! Search order for the root: explicit `--root`, then `HUB_ROOT`, then
//! climbing up from the current directory and from the executable looking
//! for an apps directory, then the build-time `HUB_ROOT_HINT` baked in by
//! `build.rs`. Env values that do not point at a directory are skipped so a
//! stale export does not shadow a working checkout.

use crate::error::{HubError, NotFoundTarget};
use anyhow::{Result, anyhow};
use clap::ValueEnum;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ROOT_ENV: &str = "HUB_ROOT";
pub const FORMAT_ENV: &str = "HUB_FORMAT";
pub const LOG_ENV: &str = "HUB_LOG";
pub const LOG_JSON_ENV: &str = "HUB_LOG_JSON";

/// Directory names recognised as an apps root while climbing.
const APPS_DIRS: &[&str] = &["apps", "demos/apps"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HubConfig {
    pub root: PathBuf,
    pub format: OutputFormat,
}

impl HubConfig {
    /// Fill unset flags from the environment and discovery.
    pub fn resolve(root: Option<PathBuf>, format: Option<OutputFormat>) -> Result<Self> {
        let root = match root {
            Some(root) => root,
            None => find_apps_root()?,
        };
        let format = match format {
            Some(format) => format,
            None => format_from_env()?,
        };
        debug!(root = %root.display(), format = format.as_str(), "resolved hub config");
        Ok(Self { root, format })
    }
}

fn format_from_env() -> Result<OutputFormat> {
    match env::var(FORMAT_ENV) {
        Ok(raw) if !raw.trim().is_empty() => OutputFormat::from_str(raw.trim(), true)
            .map_err(|err| anyhow!("invalid {FORMAT_ENV} value '{raw}': {err}")),
        _ => Ok(OutputFormat::default()),
    }
}

fn root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let path = PathBuf::from(hint);
    if !path.is_dir() {
        return None;
    }
    fs::canonicalize(path).ok()
}

/// Climb from `start` towards the filesystem root, returning the first
/// apps directory found.
pub fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        for name in APPS_DIRS {
            let candidate = dir.join(name);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}

pub fn find_apps_root() -> Result<PathBuf, HubError> {
    if let Ok(env_root) = env::var(ROOT_ENV) {
        match root_from_hint(&env_root) {
            Some(root) => return Ok(root),
            None if !env_root.is_empty() => {
                warn!(value = %env_root, "{ROOT_ENV} is not a directory; ignoring it")
            }
            None => {}
        }
    }

    if let Some(root) = env::current_dir().ok().and_then(|cwd| search_upwards(&cwd)) {
        return Ok(root);
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(root) = exe_path.parent().and_then(search_upwards) {
            return Ok(root);
        }
    }

    if let Some(root) = option_env!("HUB_ROOT_HINT").and_then(root_from_hint) {
        return Ok(root);
    }

    Err(HubError::not_found(
        NotFoundTarget::Root,
        format!("no apps directory found; pass --root or set {ROOT_ENV}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn search_upwards_finds_apps_in_an_ancestor() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("apps/topic3")).unwrap();
        let nested = dir.path().join("work/notes");
        fs::create_dir_all(&nested).unwrap();

        let found = search_upwards(&nested).unwrap();
        assert_eq!(found, fs::canonicalize(dir.path().join("apps")).unwrap());
    }

    #[test]
    fn search_upwards_accepts_demo_layout() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("demos/apps")).unwrap();
        let found = search_upwards(dir.path()).unwrap();
        assert!(found.ends_with("demos/apps"));
    }

    #[test]
    fn explicit_flags_win() {
        let dir = TempDir::new().unwrap();
        let config =
            HubConfig::resolve(Some(dir.path().to_path_buf()), Some(OutputFormat::Json)).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn hint_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("apps");
        fs::write(&file, "").unwrap();
        assert!(root_from_hint("").is_none());
        assert!(root_from_hint(&file.display().to_string()).is_none());
        assert!(root_from_hint(&dir.path().display().to_string()).is_some());
    }
}

//! Error boundary shared by the registry and the dispatcher.
//!
//! Everything below the boundary (manifest parsing, report programs, config
//! lookup) works with `anyhow` and attaches context as it goes. Crossing into
//! the registry or dispatcher API, failures are folded into one of four kinds
//! so the surface can render a diagnostic naming the topic and unit involved.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What a `NotFound` lookup was searching for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundTarget {
    Root,
    Topic,
    Unit,
}

impl NotFoundTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundTarget::Root => "root",
            NotFoundTarget::Topic => "topic",
            NotFoundTarget::Unit => "unit",
        }
    }
}

impl fmt::Display for NotFoundTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("{target} not found: {location}")]
    NotFound {
        target: NotFoundTarget,
        location: String,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("failed to load unit '{unit}' in topic '{topic}'")]
    Load {
        topic: String,
        unit: String,
        #[source]
        source: Cause,
    },
    #[error("unit '{unit}' in topic '{topic}' has no `app` or `main` entrypoint")]
    NoEntrypoint { topic: String, unit: String },
    #[error("unit '{unit}' in topic '{topic}' failed while running `{entrypoint}`")]
    Run {
        topic: String,
        unit: String,
        entrypoint: String,
        #[source]
        source: Cause,
    },
}

/// Discriminant of [`HubError`], stable across serialization.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Load,
    NoEntrypoint,
    Run,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Load => "load",
            ErrorKind::NoEntrypoint => "no_entrypoint",
            ErrorKind::Run => "run",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HubError {
    pub fn not_found(target: NotFoundTarget, location: impl Into<String>) -> Self {
        HubError::NotFound {
            target,
            location: location.into(),
            source: None,
        }
    }

    pub fn not_found_io(
        target: NotFoundTarget,
        location: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        HubError::NotFound {
            target,
            location: location.into(),
            source: Some(source),
        }
    }

    pub fn load(topic: &str, unit: &str, source: anyhow::Error) -> Self {
        HubError::Load {
            topic: topic.to_string(),
            unit: unit.to_string(),
            source: source.into(),
        }
    }

    pub fn run(topic: &str, unit: &str, entrypoint: &str, source: anyhow::Error) -> Self {
        HubError::Run {
            topic: topic.to_string(),
            unit: unit.to_string(),
            entrypoint: entrypoint.to_string(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::NotFound { .. } => ErrorKind::NotFound,
            HubError::Load { .. } => ErrorKind::Load,
            HubError::NoEntrypoint { .. } => ErrorKind::NoEntrypoint,
            HubError::Run { .. } => ErrorKind::Run,
        }
    }

    /// Render the error plus its full cause chain for the user surface.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (topic, unit) = match self {
            HubError::NotFound { .. } => (None, None),
            HubError::Load { topic, unit, .. }
            | HubError::NoEntrypoint { topic, unit }
            | HubError::Run { topic, unit, .. } => (Some(topic.clone()), Some(unit.clone())),
        };

        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Diagnostic {
            kind: self.kind(),
            topic,
            unit,
            message,
        }
    }
}

/// User-facing rendering of a [`HubError`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber once per process.
//! `RUST_LOG` overrides the verbosity-derived default filter.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Scenario lifecycle
    #[default]
    Normal,
    /// Dispatch and resolution decisions
    Verbose,
    /// Every poll attempt
    Debug,
}

impl Verbosity {
    /// Default filter directive for this level
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, for CI log collectors
    Json,
}

/// Filter used by [`init`]: `RUST_LOG` when set and valid, else the
/// verbosity default
#[must_use]
pub fn filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, so repeated
/// calls from several test binaries or scenarios are harmless.
pub fn init(verbosity: Verbosity, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_target(true);
    let installed = match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::debug!(?verbosity, ?format, "logging initialised");
    }
    installed
}

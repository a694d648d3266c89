//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor the config file sets one.
const DEFAULT_FILTER: &str = "obsidian_mcp=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to [`LogFormat::Pretty`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from file settings.
    ///
    /// `RUST_LOG` wins over the configured filter; `verbose` wins over both.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let format = settings
            .format
            .as_deref()
            .map(LogFormat::parse)
            .unwrap_or_default();

        let filter = if verbose {
            EnvFilter::new("obsidian_mcp=debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER))
            })
        };

        Self {
            format,
            filter,
            file: settings.file.clone(),
        }
    }
}

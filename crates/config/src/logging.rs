//! Logging configuration
//!
//! Controls diagnostic output of the blogstat CLI. Logs always go to stderr
//! so that stdout carries only metric rows.

use serde::Deserialize;

/// Crates whose spans and events follow the configured level
const BLOGSTAT_TARGETS: [&str; 4] = [
    "blogstat",
    "blogstat_analytics",
    "blogstat_query",
    "blogstat_config",
];

/// Verbosity, most verbose first
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive level name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `EnvFilter` directive for this level
    ///
    /// blogstat crates log at this level. Everything else (HTTP client,
    /// runtime) stays at warn unless the level is quieter still.
    pub fn directive(self) -> String {
        let others = self.max(Self::Warn).name();
        let mut directive = others.to_string();
        for target in BLOGSTAT_TARGETS {
            directive.push_str(&format!(",{}={}", target, self.name()));
        }
        directive
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Overridden by `--log-level`
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogConfig {
    /// Filter directive, preferring a CLI override
    ///
    /// A plain level name on the command line is expanded like the config
    /// level. Anything else is taken as a raw `EnvFilter` directive, e.g.
    /// `blogstat_query=trace`.
    pub fn directive(&self, cli_override: Option<&str>) -> String {
        match cli_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match LogLevel::parse(raw) {
                Some(level) => level.directive(),
                None => raw.to_string(),
            },
            None => self.level.directive(),
        }
    }
}

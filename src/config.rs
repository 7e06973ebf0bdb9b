use crate::core::{DbError, Result};
use log::warn;

pub const ENV_TELEMETRY: &str = "DBINSIGHTS_TELEMETRY";
pub const ENV_SINK: &str = "DBINSIGHTS_SINK";
pub const ENV_MAX_DETAILS: &str = "DBINSIGHTS_MAX_DETAILS";
pub const ENV_CALLABLE_PARSING: &str = "DBINSIGHTS_CALLABLE_PARSING";

/// Where the default telemetry client sends records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Tracing,
    None,
}

/// Telemetry and driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsConfig {
    /// Master switch for dependency tracking
    pub telemetry_enabled: bool,

    /// Sink used by the process-wide telemetry client
    pub sink: SinkKind,

    /// Truncate the recorded command details to this many characters
    pub max_details_length: Option<usize>,

    /// Rewrite `{ call ... }` escapes into stored procedure calls before prepare
    pub callable_parsing: bool,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsConfig {
    pub fn new() -> Self {
        Self {
            telemetry_enabled: true,
            sink: SinkKind::Tracing,
            max_details_length: None,
            callable_parsing: true,
        }
    }

    pub fn telemetry_enabled(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = enabled;
        self
    }

    pub fn sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    pub fn max_details_length(mut self, max: usize) -> Self {
        self.max_details_length = Some(max);
        self
    }

    pub fn callable_parsing(mut self, enabled: bool) -> Self {
        self.callable_parsing = enabled;
        self
    }

    /// Load from the process environment, falling back to defaults on bad values
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| {
            warn!("Ignoring invalid dbinsights environment: {}", e);
            Self::new()
        })
    }

    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_TELEMETRY) {
            config.telemetry_enabled = parse_switch(ENV_TELEMETRY, &raw)?;
        }

        if let Some(raw) = lookup(ENV_SINK) {
            config.sink = match raw.trim().to_ascii_lowercase().as_str() {
                "tracing" => SinkKind::Tracing,
                "none" | "off" => SinkKind::None,
                other => {
                    return Err(DbError::ConfigError(format!(
                        "{} must be 'tracing' or 'none', got '{}'",
                        ENV_SINK, other
                    )));
                }
            };
        }

        if let Some(raw) = lookup(ENV_MAX_DETAILS) {
            let max = raw.trim().parse::<usize>().map_err(|e| {
                DbError::ConfigError(format!("{} must be a positive integer: {}", ENV_MAX_DETAILS, e))
            })?;
            config.max_details_length = Some(max);
        }

        if let Some(raw) = lookup(ENV_CALLABLE_PARSING) {
            config.callable_parsing = parse_switch(ENV_CALLABLE_PARSING, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_details_length == Some(0) {
            return Err(DbError::ConfigError(
                "max_details_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_switch(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(DbError::ConfigError(format!(
            "{} must be on/off, got '{}'",
            key, other
        ))),
    }
}

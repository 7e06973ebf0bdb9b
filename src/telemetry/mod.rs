// ============================================================================
// Dependency Telemetry
// ============================================================================
//
// One `DependencyTelemetry` record is produced per command execution and
// handed to a `TelemetrySink`. The sink is the boundary to whatever backend
// stores the records; this crate ships a tracing-backed sink, an in-memory
// sink and a JSON-lines sink.
//
// ============================================================================

pub mod sinks;

use crate::config::{InsightsConfig, SinkKind};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

pub use sinks::{JsonLinesSink, MemorySink, TracingSink};

/// Property key the command details are stored under
pub const COMMAND_TEXT_PROPERTY: &str = "commandText";

lazy_static! {
    static ref GLOBAL_CLIENT: RwLock<TelemetryClient> =
        RwLock::new(TelemetryClient::from_config(&InsightsConfig::from_env()));
}

/// Which execution entry point produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionKind {
    NonQuery,
    Scalar,
    Reader,
}

impl ExecutionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NonQuery => "NonQuery",
            Self::Scalar => "Scalar",
            Self::Reader => "Reader",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One outbound database call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyTelemetry {
    pub id: Uuid,
    /// Concrete provider command type
    pub dependency_type_name: String,
    pub name: String,
    pub operation: ExecutionKind,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
    pub properties: BTreeMap<String, String>,
}

impl DependencyTelemetry {
    pub fn new(
        dependency_type_name: impl Into<String>,
        operation: ExecutionKind,
        start_time: DateTime<Utc>,
        duration: Duration,
        success: bool,
    ) -> Self {
        let dependency_type_name = dependency_type_name.into();
        Self {
            id: Uuid::new_v4(),
            name: dependency_type_name.clone(),
            dependency_type_name,
            operation,
            start_time,
            duration,
            success,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The command text and parameter listing, if recorded
    pub fn command_text(&self) -> Option<&str> {
        self.properties.get(COMMAND_TEXT_PROPERTY).map(String::as_str)
    }
}

/// Receiver of dependency records
pub trait TelemetrySink: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    fn track_dependency(&self, record: DependencyTelemetry);

    fn flush(&self) {}
}

/// Handle commands use to emit telemetry.
///
/// Cheap to clone. A client without a sink, or with tracking switched off,
/// reports itself disabled and commands skip measurement entirely.
#[derive(Clone, Default)]
pub struct TelemetryClient {
    sink: Option<Arc<dyn TelemetrySink>>,
    enabled: bool,
    max_details_length: Option<usize>,
}

impl TelemetryClient {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink: Some(sink),
            enabled: true,
            max_details_length: None,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &InsightsConfig) -> Self {
        let sink: Option<Arc<dyn TelemetrySink>> = match config.sink {
            SinkKind::Tracing => Some(Arc::new(TracingSink::new())),
            SinkKind::None => None,
        };

        Self {
            sink,
            enabled: config.telemetry_enabled,
            max_details_length: config.max_details_length,
        }
    }

    /// Copy of the process-wide client
    pub fn global() -> TelemetryClient {
        GLOBAL_CLIENT
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the process-wide client. Commands created afterwards use it.
    pub fn install(client: TelemetryClient) {
        info!(
            "Installing global telemetry client (enabled: {})",
            client.is_enabled()
        );
        *GLOBAL_CLIENT.write().unwrap_or_else(PoisonError::into_inner) = client;
    }

    pub fn with_max_details_length(mut self, max: Option<usize>) -> Self {
        self.max_details_length = max;
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn max_details_length(&self) -> Option<usize> {
        self.max_details_length
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.sink.as_ref().is_some_and(|s| s.is_enabled())
    }

    /// Hand `record` to the sink. A panicking sink is contained and logged.
    pub fn track_dependency(&self, record: DependencyTelemetry) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.track_dependency(record)));
        if outcome.is_err() {
            warn!("Telemetry sink panicked while tracking a dependency; record dropped");
        }
    }

    pub fn flush(&self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.flush();
        }
    }
}

impl fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("has_sink", &self.sink.is_some())
            .field("enabled", &self.enabled)
            .field("max_details_length", &self.max_details_length)
            .finish()
    }
}

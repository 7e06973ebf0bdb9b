use super::{DependencyTelemetry, TelemetrySink};
use log::warn;
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tracing::{Level, event};

/// Emits every record as a `tracing` event on the `dbinsights::dependency` target.
/// Failed calls are logged at WARN, successful ones at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for TracingSink {
    fn track_dependency(&self, record: DependencyTelemetry) {
        let duration_ms = record.duration.as_secs_f64() * 1000.0;
        let command_text = record.command_text().unwrap_or_default();

        if record.success {
            event!(
                target: "dbinsights::dependency",
                Level::INFO,
                id = %record.id,
                dependency = %record.dependency_type_name,
                operation = record.operation.label(),
                start_time = %record.start_time.to_rfc3339(),
                duration_ms,
                success = true,
                command_text,
                "dependency call succeeded"
            );
        } else {
            event!(
                target: "dbinsights::dependency",
                Level::WARN,
                id = %record.id,
                dependency = %record.dependency_type_name,
                operation = record.operation.label(),
                start_time = %record.start_time.to_rfc3339(),
                duration_ms,
                success = false,
                command_text,
                "dependency call failed"
            );
        }
    }
}

/// Keeps records in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DependencyTelemetry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DependencyTelemetry> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<DependencyTelemetry> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl TelemetrySink for MemorySink {
    fn track_dependency(&self, record: DependencyTelemetry) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Writes one JSON document per record, newline-delimited
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn track_dependency(&self, record: DependencyTelemetry) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let written = serde_json::to_writer(&mut *writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));

        if let Err(e) = written {
            warn!("Failed to write dependency record {}: {}", record.id, e);
        }
    }

    fn flush(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.flush() {
            warn!("Failed to flush dependency records: {}", e);
        }
    }
}

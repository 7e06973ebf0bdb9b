// ============================================================================
// Profiling Command Proxy
// ============================================================================
//
// `InsightsCommand` wraps a provider command and is handed to callers in its
// place. Every operation forwards to the wrapped command; the three execute
// operations additionally go through `tracker::track_dependency`, so each
// execution is timed and reported to the telemetry client.
//
// The proxy also exposes `BindByName` whether or not the provider does. When
// the provider type has the property, setting it on the proxy sets it on the
// wrapped command through the capability cache.
//
// ============================================================================

mod tracker;

use crate::capability::{BIND_BY_NAME, CapabilityCache, PropertyInfo, PropertyType, downcast_bool};
use crate::command::{DataReader, DbCommand, DbConnection, DbParameter, DbTransaction, ParameterCollection};
use crate::core::{CommandBehavior, CommandType, DbError, Result, UpdateRowSource, Value};
use crate::telemetry::{ExecutionKind, TelemetryClient};
use log::trace;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

static PROXY_PROPERTIES: [PropertyInfo; 1] =
    [PropertyInfo::public(BIND_BY_NAME, PropertyType::Boolean).with_setter(set_proxy_bind_by_name)];

fn set_proxy_bind_by_name(target: &mut dyn Any, value: Value) -> Result<()> {
    let (proxy, flag) = downcast_bool::<InsightsCommand>(target, value, BIND_BY_NAME)?;
    proxy.set_bind_by_name(flag);
    Ok(())
}

/// Command proxy that reports every execution as dependency telemetry.
///
/// Owns the wrapped command and disposes it exactly once, either through
/// [`DbCommand::dispose`] or on drop. After disposal, fallible operations
/// fail with [`DbError::ObjectDisposed`], getters return defaults and
/// setters do nothing.
///
/// Not meant to be shared between threads while in use; callers serialize
/// access the same way they would for the provider command.
pub struct InsightsCommand {
    command: Option<Box<dyn DbCommand>>,
    connection: Option<Arc<dyn DbConnection>>,
    transaction: Option<Arc<dyn DbTransaction>>,
    bind_by_name: bool,
    telemetry: TelemetryClient,
    capabilities: Arc<CapabilityCache>,
    // Stands in for the wrapped collection once disposed
    detached_parameters: ParameterCollection,
}

impl InsightsCommand {
    /// Wrap `command`, reporting to the process-wide telemetry client
    pub fn new(command: Box<dyn DbCommand>, connection: Option<Arc<dyn DbConnection>>) -> Self {
        Self {
            command: Some(command),
            connection,
            transaction: None,
            bind_by_name: false,
            telemetry: TelemetryClient::global(),
            capabilities: Arc::clone(CapabilityCache::bind_by_name()),
            detached_parameters: ParameterCollection::new(),
        }
    }

    /// Like [`InsightsCommand::new`], for factories that may not produce a command
    pub fn try_new(
        command: Option<Box<dyn DbCommand>>,
        connection: Option<Arc<dyn DbConnection>>,
    ) -> Result<Self> {
        let command = command.ok_or_else(|| {
            DbError::InvalidArgument("command: a wrapped command is required".to_string())
        })?;
        Ok(Self::new(command, connection))
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryClient) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_capability_cache(mut self, capabilities: Arc<CapabilityCache>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn telemetry(&self) -> &TelemetryClient {
        &self.telemetry
    }

    pub fn bind_by_name(&self) -> bool {
        self.bind_by_name
    }

    /// Record the flag and, when it changes and the wrapped provider type
    /// supports `BindByName`, apply it to the wrapped command.
    pub fn set_bind_by_name(&mut self, value: bool) {
        if self.bind_by_name == value {
            return;
        }

        if let Some(command) = self.command.as_deref_mut() {
            if let Some(accessor) = self.capabilities.lookup_for(&*command) {
                accessor.apply(command, value);
            }
        }

        self.bind_by_name = value;
    }

    /// The wrapped provider command, until disposal
    pub fn inner(&self) -> Option<&dyn DbCommand> {
        self.command.as_deref()
    }

    pub fn inner_mut(&mut self) -> Option<&mut (dyn DbCommand + 'static)> {
        self.command.as_deref_mut()
    }

    /// Type name of the wrapped provider command
    pub fn inner_type_name(&self) -> Option<&'static str> {
        self.command.as_deref().map(|c| c.type_name())
    }

    pub fn is_disposed(&self) -> bool {
        self.command.is_none()
    }

    /// Copy of this proxy around a clone of the wrapped command.
    ///
    /// Fails with [`DbError::NotCloneable`] when the provider command does
    /// not support cloning. The copy shares the connection, telemetry client
    /// and capability cache, and starts with the same `BindByName` flag.
    pub fn clone_command(&self) -> Result<InsightsCommand> {
        let command = self.command.as_deref().ok_or(DbError::ObjectDisposed)?;
        let cloned = command.try_clone().ok_or_else(|| DbError::NotCloneable {
            type_name: command.type_name().to_string(),
        })?;
        let transaction = cloned.transaction();

        Ok(Self {
            command: Some(cloned),
            connection: self.connection.clone(),
            transaction,
            bind_by_name: self.bind_by_name,
            telemetry: self.telemetry.clone(),
            capabilities: Arc::clone(&self.capabilities),
            detached_parameters: ParameterCollection::new(),
        })
    }

    fn command_ref(&self) -> Result<&dyn DbCommand> {
        self.command.as_deref().ok_or(DbError::ObjectDisposed)
    }

    fn execute_tracked<T, F>(&mut self, kind: ExecutionKind, execute: F) -> Result<T>
    where
        F: FnOnce(&mut dyn DbCommand) -> Result<T>,
    {
        let command = self.command.as_deref_mut().ok_or(DbError::ObjectDisposed)?;
        tracker::track_dependency(&self.telemetry, command, kind, execute)
    }
}

impl DbCommand for InsightsCommand {
    fn command_text(&self) -> &str {
        self.command.as_deref().map_or("", |c| c.command_text())
    }

    fn set_command_text(&mut self, text: &str) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_command_text(text);
        }
    }

    fn command_timeout(&self) -> u32 {
        self.command.as_deref().map_or(0, |c| c.command_timeout())
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_command_timeout(seconds);
        }
    }

    fn command_type(&self) -> CommandType {
        self.command.as_deref().map(|c| c.command_type()).unwrap_or_default()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_command_type(command_type);
        }
    }

    fn parameters(&self) -> &ParameterCollection {
        match self.command.as_deref() {
            Some(command) => command.parameters(),
            None => &self.detached_parameters,
        }
    }

    fn parameters_mut(&mut self) -> &mut ParameterCollection {
        match self.command.as_deref_mut() {
            Some(command) => command.parameters_mut(),
            None => &mut self.detached_parameters,
        }
    }

    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        self.connection.clone()
    }

    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_connection(connection.clone());
        }
        self.connection = connection;
    }

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>> {
        self.transaction.clone()
    }

    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_transaction(transaction.clone());
        }
        self.transaction = transaction;
    }

    fn design_time_visible(&self) -> bool {
        self.command.as_deref().is_some_and(|c| c.design_time_visible())
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_design_time_visible(visible);
        }
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.command
            .as_deref()
            .map(|c| c.updated_row_source())
            .unwrap_or_default()
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        if let Some(command) = self.command.as_deref_mut() {
            command.set_updated_row_source(source);
        }
    }

    fn prepare(&mut self) -> Result<()> {
        self.command
            .as_deref_mut()
            .ok_or(DbError::ObjectDisposed)?
            .prepare()
    }

    fn cancel(&mut self) {
        if let Some(command) = self.command.as_deref_mut() {
            command.cancel();
        }
    }

    fn create_parameter(&self) -> DbParameter {
        self.command_ref()
            .map(|c| c.create_parameter())
            .unwrap_or_default()
    }

    fn execute_non_query(&mut self) -> Result<i64> {
        self.execute_tracked(ExecutionKind::NonQuery, |c| c.execute_non_query())
    }

    fn execute_scalar(&mut self) -> Result<Value> {
        self.execute_tracked(ExecutionKind::Scalar, |c| c.execute_scalar())
    }

    fn execute_reader(&mut self, behavior: CommandBehavior) -> Result<Box<dyn DataReader>> {
        self.execute_tracked(ExecutionKind::Reader, |c| c.execute_reader(behavior))
    }

    fn dispose(&mut self) {
        if let Some(mut command) = self.command.take() {
            trace!("Disposing wrapped {}", command.type_name());
            command.dispose();
        }
        self.connection = None;
        self.transaction = None;
    }

    fn properties(&self) -> &'static [PropertyInfo] {
        &PROXY_PROPERTIES
    }

    fn try_clone(&self) -> Option<Box<dyn DbCommand>> {
        self.clone_command()
            .ok()
            .map(|proxy| Box::new(proxy) as Box<dyn DbCommand>)
    }
}

impl Drop for InsightsCommand {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for InsightsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightsCommand")
            .field("inner", &self.inner_type_name())
            .field("command_text", &self.command_text())
            .field("bind_by_name", &self.bind_by_name)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

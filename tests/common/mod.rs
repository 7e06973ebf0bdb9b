//! Fake provider commands shared by the integration tests
//!
//! `FakeCommand<F>` is one concrete type per flavor `F`, so each flavor has
//! its own `TypeId` and its own entry in a capability cache.
#![allow(dead_code)]

use dbinsights::{
    CommandBehavior, CommandType, DataReader, DbCommand, DbConnection, DbError, DbTransaction,
    ParameterCollection, PropertyInfo, PropertyType, Result, Row, UpdateRowSource, Value,
    downcast_bool,
};
use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shape of a fake provider type
pub trait Flavor: Send + 'static {
    const CLONEABLE: bool;

    fn properties() -> &'static [PropertyInfo];
}

/// No `BindByName`, not cloneable
pub struct Plain;

/// Writable `BindByName`, cloneable
pub struct Binding;

/// `BindByName` without a setter
pub struct ReadOnlyBinding;

/// `BindByName` typed as an integer
pub struct IntegerBinding;

impl Flavor for Plain {
    const CLONEABLE: bool = false;

    fn properties() -> &'static [PropertyInfo] {
        &[]
    }
}

static BINDING_PROPERTIES: [PropertyInfo; 2] = [
    PropertyInfo::public("FetchSize", PropertyType::Integer),
    PropertyInfo::public("BindByName", PropertyType::Boolean)
        .with_setter(set_bind_by_name::<Binding>),
];

impl Flavor for Binding {
    const CLONEABLE: bool = true;

    fn properties() -> &'static [PropertyInfo] {
        &BINDING_PROPERTIES
    }
}

static READ_ONLY_PROPERTIES: [PropertyInfo; 1] =
    [PropertyInfo::public("BindByName", PropertyType::Boolean)];

impl Flavor for ReadOnlyBinding {
    const CLONEABLE: bool = false;

    fn properties() -> &'static [PropertyInfo] {
        &READ_ONLY_PROPERTIES
    }
}

static INTEGER_PROPERTIES: [PropertyInfo; 1] = [PropertyInfo::public(
    "BindByName",
    PropertyType::Integer,
)
.with_setter(set_bind_by_name::<IntegerBinding>)];

impl Flavor for IntegerBinding {
    const CLONEABLE: bool = false;

    fn properties() -> &'static [PropertyInfo] {
        &INTEGER_PROPERTIES
    }
}

pub fn set_bind_by_name<F: Flavor>(target: &mut dyn Any, value: Value) -> Result<()> {
    let (command, flag) = downcast_bool::<FakeCommand<F>>(target, value, "BindByName")?;
    command.bind_by_name = flag;
    command.probe.bind_calls.lock().unwrap().push(flag);
    Ok(())
}

/// Observations shared between a fake command and the test holding it
#[derive(Debug, Default)]
pub struct Probe {
    pub disposed: AtomicUsize,
    pub prepared: AtomicUsize,
    pub cancelled: AtomicUsize,
    pub executions: AtomicUsize,
    pub bind_calls: Mutex<Vec<bool>>,
}

impl Probe {
    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn bind_calls(&self) -> Vec<bool> {
        self.bind_calls.lock().unwrap().clone()
    }
}

pub struct FakeCommand<F: Flavor> {
    pub text: String,
    pub timeout: u32,
    pub command_type: CommandType,
    pub parameters: ParameterCollection,
    pub connection: Option<Arc<dyn DbConnection>>,
    pub transaction: Option<Arc<dyn DbTransaction>>,
    pub design_time_visible: bool,
    pub updated_row_source: UpdateRowSource,
    pub bind_by_name: bool,
    pub failure: Option<String>,
    pub panic_on_execute: bool,
    pub affected: i64,
    pub scalar: Value,
    pub rows: Vec<Row>,
    pub probe: Arc<Probe>,
    _flavor: PhantomData<F>,
}

impl<F: Flavor> FakeCommand<F> {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            timeout: 30,
            command_type: CommandType::Text,
            parameters: ParameterCollection::new(),
            connection: None,
            transaction: None,
            design_time_visible: true,
            updated_row_source: UpdateRowSource::Both,
            bind_by_name: false,
            failure: None,
            panic_on_execute: false,
            affected: 1,
            scalar: Value::Null,
            rows: Vec::new(),
            probe: Arc::new(Probe::default()),
            _flavor: PhantomData,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_connection(mut self, connection: Arc<dyn DbConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }

    pub fn boxed(self) -> Box<dyn DbCommand> {
        Box::new(self)
    }

    fn run(&self) -> Result<()> {
        self.probe.executions.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_execute {
            panic!("provider crashed");
        }
        match &self.failure {
            Some(message) => Err(DbError::ExecutionError(message.clone())),
            None => Ok(()),
        }
    }
}

impl<F: Flavor> DbCommand for FakeCommand<F> {
    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn command_timeout(&self) -> u32 {
        self.timeout
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    fn connection(&self) -> Option<Arc<dyn DbConnection>> {
        self.connection.clone()
    }

    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>) {
        self.connection = connection;
    }

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>> {
        self.transaction.clone()
    }

    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>) {
        self.transaction = transaction;
    }

    fn design_time_visible(&self) -> bool {
        self.design_time_visible
    }

    fn set_design_time_visible(&mut self, visible: bool) {
        self.design_time_visible = visible;
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.updated_row_source
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.updated_row_source = source;
    }

    fn prepare(&mut self) -> Result<()> {
        self.probe.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&mut self) {
        self.probe.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    fn execute_non_query(&mut self) -> Result<i64> {
        self.run()?;
        Ok(self.affected)
    }

    fn execute_scalar(&mut self) -> Result<Value> {
        self.run()?;
        Ok(self.scalar.clone())
    }

    fn execute_reader(&mut self, _behavior: CommandBehavior) -> Result<Box<dyn DataReader>> {
        self.run()?;
        Ok(Box::new(VecReader::new(self.rows.clone())))
    }

    fn dispose(&mut self) {
        self.probe.disposed.fetch_add(1, Ordering::SeqCst);
    }

    fn properties(&self) -> &'static [PropertyInfo] {
        F::properties()
    }

    fn try_clone(&self) -> Option<Box<dyn DbCommand>> {
        if !F::CLONEABLE {
            return None;
        }

        let clone = FakeCommand::<F> {
            text: self.text.clone(),
            timeout: self.timeout,
            command_type: self.command_type,
            parameters: self.parameters.clone(),
            connection: self.connection.clone(),
            transaction: self.transaction.clone(),
            design_time_visible: self.design_time_visible,
            updated_row_source: self.updated_row_source,
            bind_by_name: self.bind_by_name,
            failure: self.failure.clone(),
            panic_on_execute: self.panic_on_execute,
            affected: self.affected,
            scalar: self.scalar.clone(),
            rows: self.rows.clone(),
            probe: Arc::new(Probe::default()),
            _flavor: PhantomData,
        };
        Some(Box::new(clone))
    }
}

pub struct VecReader {
    rows: VecDeque<Row>,
    field_count: usize,
    closed: bool,
}

impl VecReader {
    pub fn new(rows: Vec<Row>) -> Self {
        let field_count = rows.first().map_or(0, Vec::len);
        Self {
            rows: rows.into(),
            field_count,
            closed: false,
        }
    }
}

impl DataReader for VecReader {
    fn field_count(&self) -> usize {
        self.field_count
    }

    fn read(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return Err(DbError::ExecutionError("Reader is closed".into()));
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub struct FakeConnection {
    pub data_source: String,
}

impl FakeConnection {
    pub fn shared(data_source: &str) -> Arc<dyn DbConnection> {
        Arc::new(Self {
            data_source: data_source.to_string(),
        })
    }
}

impl DbConnection for FakeConnection {
    fn data_source(&self) -> &str {
        &self.data_source
    }

    fn is_open(&self) -> bool {
        true
    }
}

pub struct FakeTransaction;

impl DbTransaction for FakeTransaction {
    fn is_active(&self) -> bool {
        true
    }
}

/// Downcast the command wrapped by a proxy
pub fn inner<F: Flavor>(proxy: &dbinsights::InsightsCommand) -> &FakeCommand<F> {
    proxy
        .inner()
        .and_then(|c| c.as_any().downcast_ref::<FakeCommand<F>>())
        .expect("wrapped fake command")
}

// ============================================================================
// dbinsights Library
// ============================================================================
//
// Wraps provider database commands in a profiling proxy that reports every
// execution as dependency telemetry, and adapts an optional provider
// capability (`BindByName`) that is not part of the common command interface.
//
// ============================================================================

pub mod core;
pub mod command;
pub mod capability;
pub mod telemetry;
pub mod proxy;
pub mod driver;
pub mod config;

// Re-export main types for convenience
pub use crate::core::{
    CommandBehavior, CommandType, DbError, DbType, ParameterDirection, Result, Row,
    UpdateRowSource, Value,
};
pub use crate::command::{
    AsAny, DataReader, DbCommand, DbConnection, DbParameter, DbTransaction,
    ParameterCollection, ProviderDbType,
};
pub use capability::{
    BIND_BY_NAME, BoolAccessor, CapabilityCache, PropertyInfo, PropertyType, ReflectSetter,
    RuntimeType, Visibility, downcast_bool,
};
pub use telemetry::{
    DependencyTelemetry, ExecutionKind, JsonLinesSink, MemorySink, TelemetryClient,
    TelemetrySink, TracingSink,
};
pub use proxy::InsightsCommand;
pub use driver::{CallableDetail, CallableParser, CommandFactory, EscapeCallableParser, InsightsDriver};
pub use config::{InsightsConfig, SinkKind};

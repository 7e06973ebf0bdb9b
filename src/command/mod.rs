// ============================================================================
// Uniform Command Interface
// ============================================================================
//
// The shape every provider command exposes to callers. Concrete providers
// implement `DbCommand`; `InsightsCommand` implements it again by forwarding
// to a wrapped provider command.
//
// ============================================================================

pub mod parameter;

use crate::capability::PropertyInfo;
use crate::core::{CommandBehavior, CommandType, Result, Row, UpdateRowSource, Value};
use std::any::Any;
use std::sync::Arc;

pub use parameter::{DbParameter, ParameterCollection, ProviderDbType};

/// Downcasting support for trait objects.
///
/// Blanket-implemented for every `'static` type. Always call it on the trait
/// object itself (`&dyn DbCommand`), never on a `Box` holding one.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Connection a command is attached to. Commands hold it, never own it.
pub trait DbConnection: Send + Sync {
    /// Server or file the connection points at
    fn data_source(&self) -> &str;

    fn is_open(&self) -> bool;
}

/// Transaction a command enlists in. Commands hold it, never own it.
pub trait DbTransaction: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Forward-only cursor over the rows produced by a reader execution
pub trait DataReader: Send {
    fn field_count(&self) -> usize;

    /// Advance to the next row; `None` once the result is exhausted
    fn read(&mut self) -> Result<Option<Row>>;

    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// A database command.
///
/// Mirrors the classic ADO-style command: text and parameters are set
/// through accessors, then one of the three `execute_*` operations runs it.
///
/// Two optional capabilities are expressed structurally rather than as
/// required methods:
///
/// - `properties()` lists the named properties the type exposes for probing
///   (see [`crate::capability`]). The default exposes nothing.
/// - `try_clone()` returns a copy when the provider supports cloning. The
///   default reports "not cloneable".
pub trait DbCommand: AsAny + Send {
    fn command_text(&self) -> &str;
    fn set_command_text(&mut self, text: &str);

    /// Timeout in seconds, `0` meaning no limit
    fn command_timeout(&self) -> u32;
    fn set_command_timeout(&mut self, seconds: u32);

    fn command_type(&self) -> CommandType;
    fn set_command_type(&mut self, command_type: CommandType);

    fn parameters(&self) -> &ParameterCollection;
    fn parameters_mut(&mut self) -> &mut ParameterCollection;

    fn connection(&self) -> Option<Arc<dyn DbConnection>>;
    fn set_connection(&mut self, connection: Option<Arc<dyn DbConnection>>);

    fn transaction(&self) -> Option<Arc<dyn DbTransaction>>;
    fn set_transaction(&mut self, transaction: Option<Arc<dyn DbTransaction>>);

    fn design_time_visible(&self) -> bool;
    fn set_design_time_visible(&mut self, visible: bool);

    fn updated_row_source(&self) -> UpdateRowSource;
    fn set_updated_row_source(&mut self, source: UpdateRowSource);

    fn prepare(&mut self) -> Result<()>;

    fn cancel(&mut self);

    fn create_parameter(&self) -> DbParameter {
        DbParameter::default()
    }

    /// Run the command and return the number of affected rows
    fn execute_non_query(&mut self) -> Result<i64>;

    /// Run the command and return the first column of the first row
    fn execute_scalar(&mut self) -> Result<Value>;

    fn execute_reader(&mut self, behavior: CommandBehavior) -> Result<Box<dyn DataReader>>;

    /// Release provider resources held by the command
    fn dispose(&mut self);

    /// Fully-qualified name of the concrete type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn properties(&self) -> &'static [PropertyInfo] {
        &[]
    }

    fn try_clone(&self) -> Option<Box<dyn DbCommand>> {
        None
    }
}

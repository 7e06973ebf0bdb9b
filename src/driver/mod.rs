// ============================================================================
// Driver Factory
// ============================================================================
//
// `InsightsDriver` sits where an ORM driver creates provider commands. It
// wraps each command in an `InsightsCommand`, applies the provider's naming
// and type conventions to parameters, and rewrites call escapes into stored
// procedure invocations before a command is prepared.
//
// ============================================================================

pub mod callable;

use crate::capability::CapabilityCache;
use crate::command::{DbCommand, DbParameter, ProviderDbType};
use crate::config::InsightsConfig;
use crate::core::{CommandType, DbType, ParameterDirection, Result};
use crate::proxy::InsightsCommand;
use crate::telemetry::TelemetryClient;
use log::debug;
use std::fmt;
use std::sync::Arc;

pub use callable::{CallableDetail, CallableParser, EscapeCallableParser};

/// Byte width a GUID is stored as
const GUID_BINARY_LENGTH: usize = 16;

/// Produces provider commands, typically already attached to a connection
pub trait CommandFactory: Send + Sync {
    fn create_command(&self) -> Result<Box<dyn DbCommand>>;
}

impl<F> CommandFactory for F
where
    F: Fn() -> Result<Box<dyn DbCommand>> + Send + Sync,
{
    fn create_command(&self) -> Result<Box<dyn DbCommand>> {
        self()
    }
}

pub struct InsightsDriver {
    factory: Box<dyn CommandFactory>,
    telemetry: TelemetryClient,
    capabilities: Arc<CapabilityCache>,
    callable_parser: Option<Arc<dyn CallableParser>>,
}

impl InsightsDriver {
    pub const NAMED_PREFIX: &'static str = ":";

    /// Driver reporting to the process-wide telemetry client
    pub fn new(factory: impl CommandFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            telemetry: TelemetryClient::global(),
            capabilities: Arc::clone(CapabilityCache::bind_by_name()),
            callable_parser: Some(Arc::new(EscapeCallableParser)),
        }
    }

    /// Driver with its own telemetry client built from `config`
    pub fn from_config(factory: impl CommandFactory + 'static, config: &InsightsConfig) -> Result<Self> {
        config.validate()?;

        let mut driver = Self::new(factory).with_telemetry(TelemetryClient::from_config(config));
        if !config.callable_parsing {
            driver.callable_parser = None;
        }
        Ok(driver)
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryClient) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_capability_cache(mut self, capabilities: Arc<CapabilityCache>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the call-escape parser; `None` leaves command text untouched
    pub fn with_callable_parser(mut self, parser: Option<Arc<dyn CallableParser>>) -> Self {
        self.callable_parser = parser;
        self
    }

    pub fn telemetry(&self) -> &TelemetryClient {
        &self.telemetry
    }

    pub fn named_prefix(&self) -> &'static str {
        Self::NAMED_PREFIX
    }

    pub fn use_named_prefix_in_sql(&self) -> bool {
        true
    }

    pub fn use_named_prefix_in_parameter(&self) -> bool {
        true
    }

    pub fn format_name_for_parameter(&self, name: &str) -> String {
        if self.use_named_prefix_in_parameter() {
            format!("{}{}", self.named_prefix(), name)
        } else {
            name.to_string()
        }
    }

    pub fn format_name_for_sql(&self, name: &str) -> String {
        if self.use_named_prefix_in_sql() {
            format!("{}{}", self.named_prefix(), name)
        } else {
            name.to_string()
        }
    }

    /// Create a provider command and wrap it in an `InsightsCommand`
    pub fn create_insights_command(&self) -> Result<InsightsCommand> {
        let command = self.factory.create_command()?;
        let connection = command.connection();

        Ok(InsightsCommand::new(command, connection)
            .with_telemetry(self.telemetry.clone())
            .with_capability_cache(Arc::clone(&self.capabilities)))
    }

    /// Same as [`InsightsDriver::create_insights_command`], typed as a plain command
    pub fn create_command(&self) -> Result<Box<dyn DbCommand>> {
        Ok(Box::new(self.create_insights_command()?))
    }

    /// Name and type a parameter the way the provider expects.
    ///
    /// The provider has no boolean or GUID parameter types: booleans travel
    /// as `Int16` and GUIDs as 16-byte binaries. Binary and XML values use
    /// the provider's native `Blob` and `XmlType`.
    pub fn initialize_parameter(&self, parameter: &mut DbParameter, name: &str, db_type: DbType) {
        parameter.name = self.format_name_for_parameter(name);

        match db_type {
            DbType::Binary => {
                parameter.db_type = DbType::Binary;
                parameter.provider_type = Some(ProviderDbType::Blob);
            }
            DbType::Boolean => {
                parameter.db_type = DbType::Int16;
            }
            DbType::Guid => {
                parameter.db_type = DbType::Binary;
                parameter.size = Some(GUID_BINARY_LENGTH);
            }
            DbType::Xml => {
                parameter.db_type = DbType::Xml;
                parameter.provider_type = Some(ProviderDbType::XmlType);
            }
            other => {
                parameter.db_type = other;
            }
        }
    }

    /// New parameter from `command`, initialized for the provider
    pub fn generate_parameter(&self, command: &dyn DbCommand, name: &str, db_type: DbType) -> DbParameter {
        let mut parameter = command.create_parameter();
        self.initialize_parameter(&mut parameter, name, db_type);
        parameter
    }

    /// Adjust `command` right before it is prepared.
    ///
    /// Parameters are bound by name. A call escape is rewritten into a stored
    /// procedure call, which binds positionally and gets a ref cursor as its
    /// first parameter to receive the rows.
    pub fn on_before_prepare(&self, command: &mut dyn DbCommand) {
        let bind_by_name = self.capabilities.lookup_for(&*command);
        if let Some(accessor) = bind_by_name.as_ref() {
            accessor.apply(command, true);
        }

        let Some(parser) = self.callable_parser.as_ref() else {
            return;
        };

        let detail = parser.parse(command.command_text());
        if !detail.is_callable {
            return;
        }

        debug!("Rewriting call escape into procedure call {}", detail.function_name);

        command.set_command_type(CommandType::StoredProcedure);
        command.set_command_text(&detail.function_name);
        if let Some(accessor) = bind_by_name.as_ref() {
            accessor.apply(command, false);
        }

        let mut cursor = command.create_parameter();
        cursor.provider_type = Some(ProviderDbType::RefCursor);
        cursor.direction = if detail.has_return {
            ParameterDirection::ReturnValue
        } else {
            ParameterDirection::Output
        };
        command.parameters_mut().insert(0, cursor);
    }

    /// `on_before_prepare` followed by the command's own `prepare`
    pub fn prepare_command(&self, command: &mut dyn DbCommand) -> Result<()> {
        self.on_before_prepare(command);
        command.prepare()
    }
}

impl fmt::Debug for InsightsDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightsDriver")
            .field("named_prefix", &self.named_prefix())
            .field("telemetry", &self.telemetry)
            .field("callable_parsing", &self.callable_parser.is_some())
            .finish()
    }
}

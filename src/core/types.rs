use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::Value;

pub type Row = Vec<Value>;

/// How the command text is interpreted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
    TableDirect,
}

/// How command results are applied to the row that produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateRowSource {
    None,
    OutputParameters,
    FirstReturnedRecord,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Provider-neutral parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    Binary,
    Byte,
    Boolean,
    Date,
    DateTime,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Single,
    #[default]
    String,
    Xml,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Hints passed to a reader-producing execution
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandBehavior: u8 {
        const SINGLE_RESULT     = 0b0000_0001;
        const SCHEMA_ONLY       = 0b0000_0010;
        const KEY_INFO          = 0b0000_0100;
        const SINGLE_ROW        = 0b0000_1000;
        const SEQUENTIAL_ACCESS = 0b0001_0000;
        const CLOSE_CONNECTION  = 0b0010_0000;
    }
}

impl CommandBehavior {
    pub const DEFAULT: Self = Self::empty();
}

impl Default for CommandBehavior {
    fn default() -> Self {
        Self::DEFAULT
    }
}

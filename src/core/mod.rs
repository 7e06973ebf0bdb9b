pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{CommandBehavior, CommandType, DbType, ParameterDirection, Row, UpdateRowSource};
pub use value::Value;

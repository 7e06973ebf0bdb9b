use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Underlying {type_name} is not cloneable.")]
    NotCloneable { type_name: String },

    #[error("Cannot access a disposed command")]
    ObjectDisposed,

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

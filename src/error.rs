//! Unified error types for the USSD service.

use thiserror::Error;

/// Unified error type for the USSD service.
#[derive(Error, Debug)]
pub enum UssdError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Persistence error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Broken invariant inside the menu engine.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Persistence errors from the session metadata and BMI record tables.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Query or connection failure reported by the driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored enum value could not be mapped back to its Rust type.
    #[error("corrupt stored value for {column}: {value}")]
    CorruptValue {
        /// Column holding the value.
        column: &'static str,
        /// The offending value.
        value: String,
    },

    /// Injected failure from the mock repository (tests only).
    #[error("mock failure: {0}")]
    Mock(String),
}

impl From<sqlx::Error> for UssdError {
    fn from(err: sqlx::Error) -> Self {
        UssdError::Storage(StorageError::Database(err))
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, UssdError>;

//! Error types for connections, queries and schema synchronization.

use dbkit_core::{BuilderError, SchemaError, UnknownDriver, ValueError};

/// Errors raised by a [`Connection`](crate::Connection) and everything built on it.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The link could not be established or was lost.
    #[error("cannot connect to {driver}: {message}")]
    Connection {
        /// Driver name.
        driver: String,
        /// Native error text.
        message: String,
    },

    /// A statement failed. Carries the statement so callers can log it.
    #[error("{message}\nSQL: {sql}")]
    Query {
        /// The failing SQL.
        sql: String,
        /// Native error text.
        message: String,
    },

    /// The connection has been closed.
    #[error("not connected")]
    NotConnected,

    /// A table lock could not be taken and weak locking is off.
    #[error("cannot lock table '{table}': {message}")]
    Lock {
        /// Table name.
        table: String,
        /// Native error text.
        message: String,
    },

    /// Transaction misuse, such as nesting or committing without BEGIN.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A column value could not be decoded.
    #[error("cannot decode column '{column}': {message}")]
    Decode {
        /// Column name.
        column: String,
        /// Native error text.
        message: String,
    },

    /// The blocking runtime could not be started.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// Invalid driver name.
    #[error(transparent)]
    UnknownDriver(#[from] UnknownDriver),

    /// Query construction failed.
    #[error(transparent)]
    Builder(#[from] BuilderError),

    /// Invalid schema declaration or unsupported change.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A value could not be converted.
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl DbError {
    pub(crate) fn query(sql: &str, err: &sqlx::Error) -> Self {
        Self::Query {
            sql: sql.to_string(),
            message: native_message(err),
        }
    }

    pub(crate) fn connection(driver: &str, err: &sqlx::Error) -> Self {
        Self::Connection {
            driver: driver.to_string(),
            message: native_message(err),
        }
    }
}

/// The backend's own error text when there is one.
fn native_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

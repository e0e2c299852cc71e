use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The session already released its connection.
    #[error("db session is completed, no connection available")]
    SessionCompleted,

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("failed creating tables: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod session;

pub use config::DbConfig;
pub use error::{DbError, Result};
pub use migrations::ensure_tables_created;
pub use pool::DbPool;
pub use session::{DbSession, Mode, ReadOnly, ReadWrite, Resolution, SessionMode, SessionState};

//! SQLite persistence
//!
//! - [`users`]: user accounts
//! - [`messages`]: classification history

pub mod messages;
pub mod types;
pub mod users;

pub use messages::MessageStore;
pub use types::*;
pub use users::UserStore;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::Result;

/// Open a connection pool
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Create every table, users first for the message foreign key
pub async fn init_db(pool: &SqlitePool) -> Result<()> {
    UserStore::new(pool.clone()).init_db().await?;
    MessageStore::new(pool.clone()).init_db().await?;
    Ok(())
}

/// Fixed-width UTC timestamp, so text ordering is chronological
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Single-connection in-memory pool; a second connection would see an empty database
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

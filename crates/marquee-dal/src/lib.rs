pub mod error;
pub mod movie;

use std::{future::Future, str::FromStr as _, time::Duration};

pub use error::Error;
use marquee_types::config::DbConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const MAX_LIMIT: usize = 10_000;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn new_pool(config: &DbConfig) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_open_conns)
        .idle_timeout(config.max_idle_time)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

pub(crate) async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| Error::QueryTimeout(limit))?
}

// SPDX-License-Identifier: MIT

//! Database layer (SQLite via sqlx).

pub mod migrations;
mod store;

pub use store::{GrowthFields, NewUser, RecordFields, VaccinationFields};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Database handle owning the connection pool.
///
/// Constructed once at startup and passed to handlers through `AppState`;
/// there is no global connection.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the database at `path` and bring the
    /// schema up to date.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            // Cascade deletes depend on this pragma
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with the full schema applied.
    ///
    /// The pool is pinned to a single connection; every connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        migrations::run(&pool).await?;
        Ok(Self { pool })
    }

    /// Access the underlying pool (migrations, tests).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for outstanding connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

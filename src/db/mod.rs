// src/db/mod.rs

pub mod filter;
pub mod model;
pub mod page;
pub mod registry;
pub mod schema;

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub use filter::{Field, FieldPath, Filter, Order, Sort, Value};
pub use model::{Document, Model, NoRelation, Populated, Stored, Unexpanded};
pub use page::{Page, PageRequest, page_count, page_query};
pub use registry::Registry;
pub use schema::Schema;

/// Opens a connection pool, creating the database file if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
}

/// Single-connection in-memory pool. The connection never expires, so the
/// database lives as long as the pool.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await
}

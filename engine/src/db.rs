//! Database connection and schema management
//!
//! The engine owns its schema. Tables are created the first time a database
//! is opened, gated on `PRAGMA user_version` so an already initialized file
//! is left untouched.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;
use crate::error::AppResult;

/// Schema version written to `PRAGMA user_version` after initialization
pub const SCHEMA_VERSION: i32 = 1;

/// Open a connection pool and make sure the schema exists
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables if the database is still at version 0
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    let version = sqlx::query_scalar::<_, i32>("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    tracing::info!("Initializing database schema at version {}", SCHEMA_VERSION);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Inventory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            location TEXT
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventory_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            category TEXT,
            priority TEXT,
            created_at TEXT,
            last_updated TEXT,
            minimum_stock INTEGER,
            unit TEXT,
            FOREIGN KEY (inventory_id) REFERENCES Inventory (id)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_number TEXT NOT NULL UNIQUE,
            date TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('purchase', 'sale')),
            total_amount REAL NOT NULL,
            tax_amount REAL NOT NULL,
            total_with_tax REAL NOT NULL,
            notes TEXT
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // invoice_items.item_id has no foreign key on purpose: items stay
    // deletable while invoices referencing them survive
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoice_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_id INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            price_per_unit REAL NOT NULL,
            subtotal REAL NOT NULL,
            FOREIGN KEY (invoice_id) REFERENCES invoices (id)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // PRAGMA statements do not accept bound parameters
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Database schema initialized");

    Ok(())
}

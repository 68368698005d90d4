//! Database schema initialization tests
//!
//! Covers pool construction through `connect`, the `user_version` gate
//! that keeps re-initialization away from existing data, and the
//! constraints baked into the schema.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use stockroom_engine::config::DatabaseConfig;
use stockroom_engine::db;

// ============================================================================
// Test Helpers
// ============================================================================

/// One connection keeps every statement on the same in-memory database
async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    db::init_schema(&pool).await.unwrap();
    pool
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    #[test]
    fn test_init_tracing_twice_is_safe() {
        stockroom_engine::init_tracing();
        stockroom_engine::init_tracing();
    }
}

// ============================================================================
// Integration Tests (in-memory SQLite)
// ============================================================================

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_creates_schema() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            busy_timeout_secs: 5,
        };

        let pool = db::connect(&config).await.unwrap();

        let version: i32 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, db::SCHEMA_VERSION);

        // The tables are usable right away
        sqlx::query("INSERT INTO Inventory (name) VALUES ('Main Warehouse')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_init_schema_keeps_existing_data() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO Inventory (name) VALUES ('Main Warehouse')")
            .execute(&pool)
            .await
            .unwrap();

        db::init_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Inventory")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_invoice_type_check_constraint() {
        let pool = test_pool().await;

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (invoice_number, date, type, total_amount, tax_amount, total_with_tax)
            VALUES ('INV-202601-0001', '2026-01-01', 'refund', 0, 0, 0)
            "#,
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_rejected() {
        let pool = test_pool().await;

        let insert = r#"
            INSERT INTO invoices (invoice_number, date, type, total_amount, tax_amount, total_with_tax)
            VALUES ('INV-202601-0001', '2026-01-01', 'purchase', 0, 0, 0)
        "#;

        sqlx::query(insert).execute(&pool).await.unwrap();
        let second = sqlx::query(insert).execute(&pool).await;

        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_items_require_existing_inventory() {
        let pool = test_pool().await;

        let result = sqlx::query(
            "INSERT INTO items (inventory_id, name, quantity, price) VALUES (9999, 'Orphan', 1, 1.0)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}

//! Stock level evaluation and low stock alerting

use std::collections::HashSet;

use serde::Serialize;
use sqlx::SqlitePool;

use super::items::Item;
use crate::error::{AppError, AppResult};

/// Stock level service for spotting items that need restocking
#[derive(Clone)]
pub struct StockLevelService {
    db: SqlitePool,
}

/// Items of an inventory partitioned by stock state
#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub out_of_stock: Vec<Item>,
    pub low_stock: Vec<Item>,
}

/// A low stock alert for a single item
#[derive(Debug, Clone, Serialize)]
pub struct StockAlert {
    pub item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub threshold: i64,
}

/// Receives low stock alerts; delivery is up to the embedding application
pub trait Notifier {
    fn notify(&self, alert: &StockAlert) -> anyhow::Result<()>;
}

/// An item is low on stock when some quantity is left but it sits below the
/// threshold for its priority; items without a priority are never low
pub fn is_low_stock(item: &Item) -> bool {
    match item.priority {
        Some(priority) => item.quantity > 0 && item.quantity < priority.low_stock_threshold(),
        None => false,
    }
}

impl StockLevelService {
    /// Create a new StockLevelService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Partition the items of an inventory into out of stock and low stock
    pub async fn stock_report(&self, inventory_id: i64) -> AppResult<StockReport> {
        let inventory_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM Inventory WHERE id = ?")
                .bind(inventory_id)
                .fetch_one(&self.db)
                .await?;

        if inventory_exists == 0 {
            return Err(AppError::NotFound("Inventory".to_string()));
        }

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, inventory_id, name, quantity, price, category, priority,
                   created_at, last_updated, minimum_stock, unit
            FROM items
            WHERE inventory_id = ?
            ORDER BY name
            "#,
        )
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?;

        let mut out_of_stock = Vec::new();
        let mut low_stock = Vec::new();

        for item in items {
            if item.quantity == 0 {
                out_of_stock.push(item);
            } else if is_low_stock(&item) {
                low_stock.push(item);
            }
        }

        Ok(StockReport {
            out_of_stock,
            low_stock,
        })
    }

    /// Send a low stock alert for every low item not already notified
    ///
    /// `notified` carries item ids across calls so repeated checks do not
    /// alert for the same item twice. Returns the alerts raised this call.
    pub async fn check_and_notify(
        &self,
        inventory_id: i64,
        notifier: &dyn Notifier,
        notified: &mut HashSet<i64>,
    ) -> AppResult<Vec<StockAlert>> {
        let report = self.stock_report(inventory_id).await?;

        let mut alerts = Vec::new();

        for item in &report.low_stock {
            let threshold = match item.priority {
                Some(priority) => priority.low_stock_threshold(),
                None => continue,
            };

            if !notified.insert(item.id) {
                continue;
            }

            let alert = StockAlert {
                item_id: item.id,
                item_name: item.name.clone(),
                quantity: item.quantity,
                threshold,
            };

            if let Err(e) = notifier.notify(&alert) {
                tracing::warn!("Failed to deliver low stock alert for item {}: {}", item.id, e);
            }

            alerts.push(alert);
        }

        Ok(alerts)
    }
}

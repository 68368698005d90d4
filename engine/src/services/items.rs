//! Item management service for stock kept inside an inventory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};
use shared::validation::{validate_name, validate_price, validate_quantity};

/// Item service for managing the stock of an inventory
#[derive(Clone)]
pub struct ItemService {
    db: SqlitePool,
}

/// Item priority levels, each carrying its low stock threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Quantity below which an item of this priority counts as low stock
    pub fn low_stock_threshold(&self) -> i64 {
        match self {
            Priority::High => 20,
            Priority::Medium => 12,
            Priority::Low => 7,
        }
    }
}

/// A stocked item
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub inventory_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub minimum_stock: Option<i64>,
    pub unit: Option<String>,
}

/// Input for adding an item to an inventory
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub inventory_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub minimum_stock: Option<i64>,
    pub unit: Option<String>,
}

/// Input for updating an item
#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub minimum_stock: Option<i64>,
    pub unit: Option<String>,
}

impl ItemService {
    /// Create a new ItemService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Add an item to an inventory
    pub async fn add_item(&self, input: AddItemInput) -> AppResult<Item> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_price(input.price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
        })?;

        // Validate the inventory exists
        let inventory_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM Inventory WHERE id = ?",
        )
        .bind(input.inventory_id)
        .fetch_one(&self.db)
        .await?;

        if inventory_exists == 0 {
            return Err(AppError::NotFound("Inventory".to_string()));
        }

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO items (inventory_id, name, quantity, price, category, priority,
                               created_at, last_updated, minimum_stock, unit)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.inventory_id)
        .bind(input.name.trim())
        .bind(input.quantity)
        .bind(input.price)
        .bind(&input.category)
        .bind(input.priority)
        .bind(now)
        .bind(now)
        .bind(input.minimum_stock)
        .bind(&input.unit)
        .execute(&self.db)
        .await?;

        let item_id = result.last_insert_rowid();

        tracing::info!(
            "Added item {} ({}) to inventory {}",
            item_id,
            input.name.trim(),
            input.inventory_id
        );

        self.get_item(item_id).await
    }

    /// Get an item by id
    pub async fn get_item(&self, item_id: i64) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, inventory_id, name, quantity, price, category, priority,
                   created_at, last_updated, minimum_stock, unit
            FROM items
            WHERE id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        Ok(item)
    }

    /// List all items of an inventory
    pub async fn list_items(&self, inventory_id: i64) -> AppResult<Vec<Item>> {
        let inventory_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM Inventory WHERE id = ?",
        )
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

        Ok(items)
    }

    /// Update an item, refreshing its last updated timestamp
    pub async fn update_item(&self, item_id: i64, input: UpdateItemInput) -> AppResult<Item> {
        let existing = self.get_item(item_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let quantity = input.quantity.unwrap_or(existing.quantity);
        let price = input.price.unwrap_or(existing.price);
        let category = input.category.or(existing.category);
        let priority = input.priority.or(existing.priority);
        let minimum_stock = input.minimum_stock.or(existing.minimum_stock);
        let unit = input.unit.or(existing.unit);

        validate_name(&name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_quantity(quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_price(price).map_err(|msg| AppError::Validation {
            field: "price".to_string(),
            message: msg.to_string(),
        })?;

        sqlx::query(
            r#"
            UPDATE items
            SET name = ?, quantity = ?, price = ?, category = ?, priority = ?,
                minimum_stock = ?, unit = ?, last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(name.trim())
        .bind(quantity)
        .bind(price)
        .bind(&category)
        .bind(priority)
        .bind(minimum_stock)
        .bind(&unit)
        .bind(Utc::now())
        .bind(item_id)
        .execute(&self.db)
        .await?;

        self.get_item(item_id).await
    }

    /// Delete a set of items by id, returning how many rows went away
    pub async fn delete_items(&self, item_ids: &[i64]) -> AppResult<u64> {
        if item_ids.is_empty() {
            return Err(AppError::Validation {
                field: "item_ids".to_string(),
                message: "No items selected".to_string(),
            });
        }

        let placeholders = vec!["?"; item_ids.len()].join(", ");
        let sql = format!("DELETE FROM items WHERE id IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for item_id in item_ids {
            query = query.bind(item_id);
        }

        let deleted = query.execute(&self.db).await?.rows_affected();

        tracing::info!("Deleted {} of {} selected items", deleted, item_ids.len());

        Ok(deleted)
    }
}

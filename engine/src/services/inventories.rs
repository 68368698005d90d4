//! Inventory management service for creating and maintaining inventories

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};
use shared::validation::validate_name;

/// Inventory service for managing the top level storage locations
#[derive(Clone)]
pub struct InventoryService {
    db: SqlitePool,
}

/// An inventory groups items under one location
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Inventory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Input for creating an inventory
#[derive(Debug, Deserialize)]
pub struct CreateInventoryInput {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Input for updating an inventory
#[derive(Debug, Deserialize)]
pub struct UpdateInventoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create an inventory
    pub async fn create_inventory(&self, input: CreateInventoryInput) -> AppResult<Inventory> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let result = sqlx::query(
            "INSERT INTO Inventory (name, description, location) VALUES (?, ?, ?)",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.location)
        .execute(&self.db)
        .await?;

        let inventory_id = result.last_insert_rowid();

        tracing::info!("Created inventory {} ({})", inventory_id, input.name.trim());

        self.get_inventory(inventory_id).await
    }

    /// Get an inventory by id
    pub async fn get_inventory(&self, inventory_id: i64) -> AppResult<Inventory> {
        let inventory = sqlx::query_as::<_, Inventory>(
            "SELECT id, name, description, location FROM Inventory WHERE id = ?",
        )
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

        Ok(inventory)
    }

    /// List all inventories
    pub async fn list_inventories(&self) -> AppResult<Vec<Inventory>> {
        let inventories = sqlx::query_as::<_, Inventory>(
            "SELECT id, name, description, location FROM Inventory ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(inventories)
    }

    /// Update an inventory
    pub async fn update_inventory(
        &self,
        inventory_id: i64,
        input: UpdateInventoryInput,
    ) -> AppResult<Inventory> {
        let existing = self.get_inventory(inventory_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let location = input.location.or(existing.location);

        validate_name(&name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        sqlx::query("UPDATE Inventory SET name = ?, description = ?, location = ? WHERE id = ?")
            .bind(name.trim())
            .bind(&description)
            .bind(&location)
            .bind(inventory_id)
            .execute(&self.db)
            .await?;

        self.get_inventory(inventory_id).await
    }

    /// Delete an inventory together with all of its items
    pub async fn delete_inventory(&self, inventory_id: i64) -> AppResult<()> {
        // Make sure it exists before touching anything
        self.get_inventory(inventory_id).await?;

        let mut tx = self.db.begin().await?;

        let items_deleted = sqlx::query("DELETE FROM items WHERE inventory_id = ?")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM Inventory WHERE id = ?")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Deleted inventory {} and {} of its items",
            inventory_id,
            items_deleted
        );

        Ok(())
    }
}

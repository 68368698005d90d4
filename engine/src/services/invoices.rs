//! Invoice service for posting, querying, and reversing invoices
//!
//! Posting an invoice and deleting one are the two operations that move
//! stock. Both run inside a single transaction so the invoice tables and
//! the item quantities never drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::error::{AppError, AppResult};
use shared::money;
use shared::validation::{validate_line_quantity, validate_price};

/// Maximum attempts when probing for a free invoice number
const MAX_ALLOCATION_ATTEMPTS: u32 = 10;

/// Invoice service for posting and reversing invoices
#[derive(Clone)]
pub struct InvoiceService {
    db: SqlitePool,
}

/// Invoice types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    Sale,
    Purchase,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "sale",
            InvoiceType::Purchase => "purchase",
        }
    }

    /// Signed stock change a line of `quantity` units applies when posted
    pub fn stock_delta(&self, quantity: i64) -> i64 {
        match self {
            InvoiceType::Sale => -quantity,
            InvoiceType::Purchase => quantity,
        }
    }
}

/// Invoice header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub date: DateTime<Utc>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub total_amount: f64,
    pub tax_amount: f64,
    pub total_with_tax: f64,
    pub notes: Option<String>,
}

/// Invoice line item as stored
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub subtotal: f64,
}

/// Invoice line item joined with the referenced item's name
///
/// The name is `None` when the item has been deleted since posting.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceLineDetail {
    pub id: i64,
    pub invoice_id: i64,
    pub item_id: i64,
    pub item_name: Option<String>,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub subtotal: f64,
}

/// An invoice with its line items
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLineDetail>,
}

/// One line of an invoice draft
#[derive(Debug, Clone, Deserialize)]
pub struct DraftLine {
    pub item_id: i64,
    pub quantity: i64,
    pub price: f64,
}

/// Input for posting an invoice
#[derive(Debug, Deserialize)]
pub struct InvoiceDraft {
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub lines: Vec<DraftLine>,
    pub total_amount: f64,
    pub tax_amount: f64,
    pub total_with_tax: f64,
    pub notes: Option<String>,
}

/// Stock level of an item right after a posting
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PostedLineStock {
    pub item_id: i64,
    pub quantity: i64,
}

/// Result of posting an invoice
#[derive(Debug, Clone, Serialize)]
pub struct PostedInvoice {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    /// Post-write quantities of every item the posting touched, in line
    /// order, for stock level checks by the caller
    pub stock_levels: Vec<PostedLineStock>,
}

impl InvoiceService {
    /// Create a new InvoiceService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Post an invoice: allocate a number, write header and lines, and
    /// apply the stock change of every line
    pub async fn post_invoice(&self, input: InvoiceDraft) -> AppResult<PostedInvoice> {
        // Validate the draft before any write
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Invoice must have at least one line item".to_string(),
            });
        }

        for line in &input.lines {
            validate_line_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
            validate_price(line.price).map_err(|msg| AppError::Validation {
                field: "price".to_string(),
                message: msg.to_string(),
            })?;
        }

        let line_amounts: Vec<(i64, f64)> =
            input.lines.iter().map(|l| (l.quantity, l.price)).collect();
        money::validate_totals(
            &line_amounts,
            input.total_amount,
            input.tax_amount,
            input.total_with_tax,
        )
        .map_err(|msg| AppError::Validation {
            field: "totals".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        // Every line must reference an existing item, and a sale must not
        // draw more than is on hand
        for line in &input.lines {
            let available = sqlx::query_scalar::<_, i64>("SELECT quantity FROM items WHERE id = ?")
                .bind(line.item_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Item {}", line.item_id)))?;

            if input.invoice_type == InvoiceType::Sale && available < line.quantity {
                return Err(AppError::InsufficientStock {
                    item_id: line.item_id,
                    requested: line.quantity,
                    available,
                });
            }
        }

        let invoice_number = self.allocate_invoice_number(&mut tx).await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (invoice_number, date, type, total_amount, tax_amount, total_with_tax, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice_number)
        .bind(now)
        .bind(input.invoice_type)
        .bind(input.total_amount)
        .bind(input.tax_amount)
        .bind(input.total_with_tax)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Persistence {
            step: "invoice header insert",
            source: e,
        })?;

        let invoice_id = result.last_insert_rowid();

        // Write each line and move its stock, in input order
        let mut stock_levels = Vec::with_capacity(input.lines.len());

        for line in &input.lines {
            let subtotal = money::line_subtotal(line.quantity, line.price);

            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, item_id, quantity, price_per_unit, subtotal)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(invoice_id)
            .bind(line.item_id)
            .bind(line.quantity)
            .bind(line.price)
            .bind(subtotal)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence {
                step: "invoice line insert",
                source: e,
            })?;

            let delta = input.invoice_type.stock_delta(line.quantity);

            sqlx::query("UPDATE items SET quantity = quantity + ?, last_updated = ? WHERE id = ?")
                .bind(delta)
                .bind(now)
                .bind(line.item_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Persistence {
                    step: "item quantity update",
                    source: e,
                })?;

            let quantity = sqlx::query_scalar::<_, i64>("SELECT quantity FROM items WHERE id = ?")
                .bind(line.item_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::Persistence {
                    step: "item quantity update",
                    source: e,
                })?;

            // Repeated lines for one item each pass the pre-check on their
            // own, so the post-write quantity is the real oversell guard
            if input.invoice_type == InvoiceType::Sale && quantity < 0 {
                return Err(AppError::InsufficientStock {
                    item_id: line.item_id,
                    requested: line.quantity,
                    available: quantity + line.quantity,
                });
            }

            stock_levels.push(PostedLineStock {
                item_id: line.item_id,
                quantity,
            });
        }

        tx.commit().await?;

        tracing::info!(
            "Posted {} invoice {} with {} lines",
            input.invoice_type.as_str(),
            invoice_number,
            input.lines.len()
        );

        let invoice = self.fetch_header(invoice_id).await?;
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, item_id, quantity, price_per_unit, subtotal
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PostedInvoice {
            invoice,
            lines,
            stock_levels,
        })
    }

    /// Delete invoices one by one, stopping at the first failure
    ///
    /// Each invoice is reversed in its own transaction, so invoices handled
    /// before a failure stay deleted.
    pub async fn delete_invoices(&self, invoice_ids: &[i64]) -> AppResult<()> {
        if invoice_ids.is_empty() {
            return Err(AppError::Validation {
                field: "invoice_ids".to_string(),
                message: "No invoices selected".to_string(),
            });
        }

        for &invoice_id in invoice_ids {
            self.delete_invoice(invoice_id).await?;
        }
        Ok(())
    }

    /// Reverse the stock change of a single invoice and remove it
    pub async fn delete_invoice(&self, invoice_id: i64) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // The invoice type decides the direction of the restoration
        let invoice_type =
            sqlx::query_scalar::<_, InvoiceType>("SELECT type FROM invoices WHERE id = ?")
                .bind(invoice_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Invoice {}", invoice_id)))?;

        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, item_id, quantity, price_per_unit, subtotal
            FROM invoice_items
            WHERE invoice_id = ?
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::Persistence {
            step: "invoice line load",
            source: e,
        })?;

        let now = Utc::now();

        for line in &lines {
            // Undo what the posting did to this item's stock
            let delta = -invoice_type.stock_delta(line.quantity);

            let result = sqlx::query(
                "UPDATE items SET quantity = quantity + ?, last_updated = ? WHERE id = ?",
            )
            .bind(delta)
            .bind(now)
            .bind(line.item_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence {
                step: "item quantity restore",
                source: e,
            })?;

            if result.rows_affected() == 0 {
                tracing::warn!(
                    "Item {} on invoice {} no longer exists, skipping stock restore",
                    line.item_id,
                    invoice_id
                );
            }
        }

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence {
                step: "invoice line delete",
                source: e,
            })?;

        sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Persistence {
                step: "invoice header delete",
                source: e,
            })?;

        tx.commit().await?;

        tracing::info!(
            "Deleted invoice {} and reversed {} lines",
            invoice_id,
            lines.len()
        );

        Ok(())
    }

    /// List all invoices, newest first
    pub async fn list_invoices(&self) -> AppResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, date, type, total_amount, tax_amount, total_with_tax, notes
            FROM invoices
            ORDER BY date DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(invoices)
    }

    /// Get an invoice with its line items
    pub async fn get_invoice(&self, invoice_id: i64) -> AppResult<InvoiceDetails> {
        let invoice = self.fetch_header(invoice_id).await?;

        let lines = sqlx::query_as::<_, InvoiceLineDetail>(
            r#"
            SELECT ii.id, ii.invoice_id, ii.item_id, i.name AS item_name,
                   ii.quantity, ii.price_per_unit, ii.subtotal
            FROM invoice_items ii
            LEFT JOIN items i ON i.id = ii.item_id
            WHERE ii.invoice_id = ?
            ORDER BY ii.id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        Ok(InvoiceDetails { invoice, lines })
    }

    async fn fetch_header(&self, invoice_id: i64) -> AppResult<Invoice> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, date, type, total_amount, tax_amount, total_with_tax, notes
            FROM invoices
            WHERE id = ?
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice {}", invoice_id)))?;

        Ok(invoice)
    }

    /// Find a free invoice number of the form INV-YYYYMM-NNNN
    ///
    /// The sequence starts at one past the highest invoice rowid, which only
    /// grows, so deleting invoices never leads back to a reused candidate.
    /// The uniqueness probe stays as a safety net.
    async fn allocate_invoice_number(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> AppResult<String> {
        let next_seq = sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(id), 0) + 1 FROM invoices")
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AppError::Persistence {
                step: "invoice number allocation",
                source: e,
            })?;

        let prefix = Utc::now().format("INV-%Y%m").to_string();

        for attempt in 0..MAX_ALLOCATION_ATTEMPTS {
            let candidate = format!("{}-{:04}", prefix, next_seq + attempt as i64);

            let taken =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE invoice_number = ?")
                    .bind(&candidate)
                    .fetch_one(&mut **tx)
                    .await
                    .map_err(|e| AppError::Persistence {
                        step: "invoice number allocation",
                        source: e,
                    })?;

            if taken == 0 {
                return Ok(candidate);
            }
        }

        Err(AppError::AllocationExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}

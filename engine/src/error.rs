//! Error handling for the Stockroom engine

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Invoice number allocation exhausted after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    // Database errors
    #[error("{step} failed: {source}")]
    Persistence {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error")]
    InternalError(#[from] anyhow::Error),
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;

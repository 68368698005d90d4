//! User account service for registration and credential checks

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};
use shared::validation::{validate_email, validate_password, validate_username};

/// User account service
#[derive(Clone)]
pub struct UserService {
    db: SqlitePool,
}

/// A user account, safe to hand to callers
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Database row including the password hash
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateAccountInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new account
    pub async fn register(&self, input: CreateAccountInput) -> AppResult<User> {
        validate_username(&input.username).map_err(|msg| AppError::Validation {
            field: "username".to_string(),
            message: msg.to_string(),
        })?;
        validate_email(&input.email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
        })?;
        validate_password(&input.password).map_err(|msg| AppError::Validation {
            field: "password".to_string(),
            message: msg.to_string(),
        })?;

        // Check if the email is already taken
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&input.email)
            .fetch_one(&self.db)
            .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        // Hash password
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(input.username.trim())
        .bind(&input.email)
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let user_id = result.last_insert_rowid();

        tracing::info!("Registered user {} ({})", user_id, input.email);

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    /// Check credentials and return the matching account
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

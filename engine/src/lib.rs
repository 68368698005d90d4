//! Stockroom - embedded inventory and invoicing engine
//!
//! The storage and business core behind a small inventory management app:
//! inventories and their items, invoice posting with stock reconciliation,
//! invoice reversal, stock level alerts, and local user accounts, all over
//! an embedded SQLite database.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Initialize tracing for applications and tests embedding the engine
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom_engine=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

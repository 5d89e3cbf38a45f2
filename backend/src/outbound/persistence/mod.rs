//! PostgreSQL persistence adapters using Diesel.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and
//!   domain types. No business logic resides here.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Async pooling**: `bb8` pools through `diesel-async`.
//! - **Typed errors**: Diesel errors map into each port's error enum.
//!
//! # Example
//!
//! ```ignore
//! use recruit_backend::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/recruit")).await?;
//! let accounts = DieselAccountRepository::new(pool);
//! ```

mod diesel_account_repository;
mod diesel_email_token_repository;
mod diesel_points_ledger;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use diesel_email_token_repository::DieselEmailTokenRepository;
pub use diesel_points_ledger::DieselPointsLedger;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

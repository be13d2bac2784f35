//! Shared infrastructure for the book store workspace
//!
//! This crate owns PostgreSQL connectivity: pool configuration, health
//! checks, the schema migrations and the error type used while bootstrapping
//! the database.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! # async fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::from_env()?;
//! let pool = init_pool(&config).await?;
//! run_migrations(&pool).await?;
//! assert!(health_check(&pool).await?);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;

//! SQLite persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the record store ports
//! backed by an embedded SQLite database.
//!
//! # Architecture
//!
//! - **Thin adapters**: Repository implementations only translate between
//!   Diesel models and domain types. No business logic resides here.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) never leave this module.
//! - **Blocking isolation**: Diesel's synchronous SQLite connection runs on
//!   Tokio's blocking pool, one transaction per port call.
//! - **Strongly typed errors**: Database errors are mapped to the port error
//!   enums.
//!
//! # Example
//!
//! ```no_run
//! use access_codes::domain::ports::UserRepository;
//! use access_codes::outbound::persistence::{SqliteStore, StoreConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open(StoreConfig::file("codes.db")).await?;
//! let users = store.users().list().await?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

mod diesel_access_code_repository;
mod diesel_basic_error_mapping;
mod diesel_user_repository;
mod models;
mod schema;
mod store;

pub use diesel_access_code_repository::DieselAccessCodeRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use store::{SqliteStore, StoreConfig, StoreError, StoreLocation, StoreUnavailable};

//! # Coinscope Database Crate
//!
//! This crate is the PostgreSQL adapter behind the analytics engine's `PriceSource`.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** All SQL lives here. The analytics core sees only `PricePoint`s
//!   and `SourceError`s; `DbError` is converted at the trait boundary.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a shared `PgPool`.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies the embedded schema migrations.
//! - `DbRepository`: Reads `market_data` and implements `analytics::PriceSource`.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::DbRepository;

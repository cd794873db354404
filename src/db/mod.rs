//! Database layer for data persistence and access.
//!
//! Built on SQLx with PostgreSQL, following the repository pattern the rest of
//! the crate relies on:
//!
//! - [`handlers`]: repository implementations for CRUD operations
//! - [`models`]: database record structures matching table schemas
//! - [`errors`]: database-specific error types
//!
//! Repositories wrap a `&mut PgConnection`, so they compose with both pool
//! connections and transactions:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Subscriptions::new(&mut tx);
//! let sub = repo.create(&create_request).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and are applied on startup via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

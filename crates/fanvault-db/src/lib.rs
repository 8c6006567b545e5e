//! Fanvault DB - Subscription record store and content repositories
//!
//! SQLx-based PostgreSQL repositories, plus an in-memory store with the
//! same traits for local runs and tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanvault_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/fanvault").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let active = repos.subscriptions.find_active(user_id, creator_id).await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;

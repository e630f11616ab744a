//! # mediavault-db
//!
//! Note storage for MediaVault.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgNoteRepository`], the PostgreSQL note store
//! - [`MemoryNoteRepository`], a process-local store for development and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediavault_db::{Database, NoteRepository};
//!
//! let db = Database::connect("postgres://localhost/mediavault").await?;
//! let notes = db.notes.list("alice").await?;
//! ```
pub mod memory;
pub mod notes;
pub mod pool;

// Re-export core types
pub use mediavault_core::*;

pub use memory::MemoryNoteRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, PoolConfig};

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Per-user note store.
    pub notes: PgNoteRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given URL with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, &PoolConfig::default()).await
    }

    pub async fn connect_with_config(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

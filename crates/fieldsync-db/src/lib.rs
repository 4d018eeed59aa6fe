//! # fieldsync-db
//!
//! PostgreSQL database layer for fieldsync.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for equipment, download jobs, and
//!   list-sync backups
//!
//! ## Example
//!
//! ```rust,ignore
//! use fieldsync_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/fieldsync").await?;
//!     let stats = db.jobs.stats().await?;
//!     println!("pending jobs: {}", stats.pending);
//!     Ok(())
//! }
//! ```

pub mod backups;
pub mod equipment;
pub mod jobs;
pub mod pool;

use std::sync::Arc;

use sqlx::postgres::PgPool;

/// Embedded schema migrations, applied at startup by binaries that own the
/// schema.
#[cfg(feature = "migrations")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// Re-export core types
pub use fieldsync_core::*;

pub use backups::PgListBackupRepository;
pub use equipment::PgEquipmentRepository;
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Bundle of all repository implementations over one shared pool.
#[derive(Clone)]
pub struct Database {
    pub equipment: Arc<PgEquipmentRepository>,
    pub jobs: Arc<PgJobRepository>,
    pub backups: Arc<PgListBackupRepository>,
    pool: PgPool,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build repositories over an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            equipment: Arc::new(PgEquipmentRepository::new(pool.clone())),
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            backups: Arc::new(PgListBackupRepository::new(pool.clone())),
            pool,
        }
    }

    /// Access the underlying pool (health checks, migrations).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

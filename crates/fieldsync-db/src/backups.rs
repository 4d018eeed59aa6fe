//! Pre-push snapshots of the upstream equipment list.
//!
//! Replacing the upstream list is a destructive full overwrite, so the
//! pre-merge upstream state is saved here before every push. Retention is
//! bounded by age and by a per-agency count.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres};
use tracing::debug;
use uuid::Uuid;

use fieldsync_core::{Error, ListBackupRepository, Result};

/// PostgreSQL implementation of ListBackupRepository.
pub struct PgListBackupRepository {
    pool: Pool<Postgres>,
}

impl PgListBackupRepository {
    /// Create a new PgListBackupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListBackupRepository for PgListBackupRepository {
    async fn save(&self, agency: &str, entries: &[String]) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let snapshot = serde_json::to_value(entries)?;

        sqlx::query(
            "INSERT INTO list_backups (id, agency_code, snapshot, entry_count, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(agency)
        .bind(&snapshot)
        .bind(entries.len() as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "backups",
            agency,
            entry_count = entries.len(),
            "Saved pre-push list snapshot"
        );
        Ok(id)
    }

    async fn prune(&self, agency: &str, max_age_days: i64, keep_count: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(max_age_days);

        let result = sqlx::query(
            "DELETE FROM list_backups
             WHERE agency_code = $1
               AND (created_at < $2
                    OR id NOT IN (
                        SELECT id FROM list_backups
                        WHERE agency_code = $1
                        ORDER BY created_at DESC
                        LIMIT $3
                    ))",
        )
        .bind(agency)
        .bind(cutoff)
        .bind(keep_count)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}

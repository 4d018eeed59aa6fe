//! Job queue repository implementation.
//!
//! The queue is a durable table standing in for a message broker: ingest
//! creates rows, an external download-worker process claims and finishes
//! them, and a sweep reclaims rows abandoned by crashed workers.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use fieldsync_core::{
    Error, Job, JobRepository, JobStatus, JobType, NewJob, QueueStats, Result, VisitCode,
};

/// PostgreSQL implementation of JobRepository.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert JobType to string for database.
    fn job_type_to_str(job_type: JobType) -> &'static str {
        match job_type {
            JobType::Photo => "photo",
            JobType::Report => "report",
        }
    }

    /// Convert string from database to JobType.
    fn str_to_job_type(s: &str) -> JobType {
        match s {
            "photo" => JobType::Photo,
            "report" => JobType::Report,
            _ => JobType::Photo, // fallback
        }
    }

    /// Convert JobStatus to string for database.
    fn job_status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Convert string from database to JobStatus.
    fn str_to_job_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "done" => JobStatus::Done,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Job {
        let job_type: String = row.get("job_type");
        let status: String = row.get("status");
        let visit_code: Option<String> = row.get("visit_code");
        Job {
            id: row.get("id"),
            job_type: Self::str_to_job_type(&job_type),
            agency_code: row.get("agency_code"),
            form_id: row.get("form_id"),
            submission_id: row.get("submission_id"),
            media_name: row.get("media_name"),
            equipment_number: row.get("equipment_number"),
            contact_id: row.get("contact_id"),
            visit_year: row.get("visit_year"),
            visit_code: visit_code.and_then(|c| VisitCode::parse(&c)),
            status: Self::str_to_job_status(&status),
            priority: row.get("priority"),
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            last_error: row.get("last_error"),
            local_path: row.get("local_path"),
            file_size: row.get("file_size"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

const JOB_COLUMNS: &str = "id, job_type, agency_code, form_id, submission_id, media_name,
    equipment_number, contact_id, visit_year, visit_code, status, priority, attempts,
    max_attempts, last_error, local_path, file_size, created_at, started_at, completed_at";

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, job: NewJob) -> Result<Option<Uuid>> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO download_jobs (id, job_type, agency_code, form_id, submission_id,
                 media_name, equipment_number, contact_id, visit_year, visit_code, status,
                 priority, attempts, max_attempts, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, 0, $12, $13)",
        )
        .bind(id)
        .bind(Self::job_type_to_str(job.job_type))
        .bind(&job.agency_code)
        .bind(&job.form_id)
        .bind(&job.submission_id)
        .bind(&job.media_name)
        .bind(&job.equipment_number)
        .bind(&job.contact_id)
        .bind(job.visit_year)
        .bind(job.visit_code.map(|c| c.as_str()))
        .bind(job.priority)
        .bind(job.max_attempts)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database);

        match result {
            Ok(_) => Ok(Some(id)),
            // Natural-key collision on a re-delivered submission. Each
            // statement runs on its own pooled connection, so the caught
            // violation cannot poison subsequent writes in the batch.
            Err(e) if e.is_unique_violation() => {
                info!(
                    subsystem = "db",
                    component = "jobs",
                    form_id = %job.form_id,
                    submission_id = %job.submission_id,
                    media_name = job.media_name.as_deref().unwrap_or(""),
                    "Job already exists"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();

        // FOR UPDATE SKIP LOCKED lets concurrent workers claim without
        // blocking each other.
        let query = format!(
            "UPDATE download_jobs
             SET status = 'processing', started_at = $1
             WHERE id = (
                 SELECT id FROM download_jobs
                 WHERE status = 'pending'
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn complete(&self, job_id: Uuid, local_path: &str, file_size: i64) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE download_jobs
             SET status = 'done', completed_at = $1, local_path = $2, file_size = $3
             WHERE id = $4",
        )
        .bind(now)
        .bind(local_path)
        .bind(file_size)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (attempts, max_attempts): (i32, i32) =
            sqlx::query_as("SELECT attempts, max_attempts FROM download_jobs WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if attempts + 1 < max_attempts {
            // Attempts remain: back to pending for another try.
            sqlx::query(
                "UPDATE download_jobs
                 SET status = 'pending', attempts = $1, last_error = $2, started_at = NULL
                 WHERE id = $3",
            )
            .bind(attempts + 1)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            sqlx::query(
                "UPDATE download_jobs
                 SET status = 'failed', attempts = $1, last_error = $2, completed_at = $3
                 WHERE id = $4",
            )
            .bind(attempts + 1)
            .bind(error)
            .bind(now)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn reset_stuck(&self, older_than_minutes: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::minutes(older_than_minutes);

        // Attempts are deliberately untouched: a crashed worker is not a
        // download failure.
        let result = sqlx::query(
            "UPDATE download_jobs
             SET status = 'pending', started_at = NULL
             WHERE status = 'processing' AND started_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'processing') as processing,
                COUNT(*) FILTER (WHERE status = 'done') as done,
                COUNT(*) FILTER (WHERE status = 'failed') as failed,
                COUNT(*) as total
             FROM download_jobs",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            processing: row.get::<i64, _>("processing"),
            done: row.get::<i64, _>("done"),
            failed: row.get::<i64, _>("failed"),
            total: row.get::<i64, _>("total"),
        })
    }
}

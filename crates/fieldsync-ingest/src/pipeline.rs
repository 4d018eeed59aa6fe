//! Per-agency ingest pipeline.
//!
//! A scheduler invokes [`IngestPipeline::run_agency`] on a fixed interval.
//! The ordering contract is persist-then-mark: a submission is marked
//! consumed upstream only after its equipment rows and queue entries are
//! durable. A crash between the two costs at most one harmless,
//! dedup-absorbed reprocessing; the reverse order would silently lose data.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use fieldsync_core::{
    defaults, AgencyConfig, EquipmentRepository, FormsApi, IngestSummary, JobRepository,
    RawSubmission, Result,
};

use crate::extract::extract;
use crate::jobs::JobCreator;
use crate::numbering::NumberGenerator;
use crate::persist::Persister;

/// Configuration for the ingest pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Unread submissions fetched per agency per run.
    pub fetch_batch_size: u32,
    /// Minutes before a `processing` job is considered abandoned.
    pub stuck_job_timeout_minutes: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_batch_size: defaults::FETCH_BATCH_SIZE,
            stuck_job_timeout_minutes: defaults::STUCK_JOB_TIMEOUT_MINUTES,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `INGEST_FETCH_BATCH_SIZE` | `50` | Submissions fetched per run |
    /// | `INGEST_STUCK_JOB_TIMEOUT_MINUTES` | `30` | Stuck-job sweep cutoff |
    pub fn from_env() -> Self {
        let fetch_batch_size = std::env::var("INGEST_FETCH_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::FETCH_BATCH_SIZE);

        let stuck_job_timeout_minutes = std::env::var("INGEST_STUCK_JOB_TIMEOUT_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::STUCK_JOB_TIMEOUT_MINUTES);

        Self {
            fetch_batch_size,
            stuck_job_timeout_minutes,
        }
    }
}

/// The per-agency ingest pipeline: fetch, extract, dedup, persist, enqueue,
/// mark consumed.
pub struct IngestPipeline {
    forms: Arc<dyn FormsApi>,
    jobs: Arc<dyn JobRepository>,
    persister: Persister,
    job_creator: JobCreator,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        forms: Arc<dyn FormsApi>,
        equipment: Arc<dyn EquipmentRepository>,
        jobs: Arc<dyn JobRepository>,
        config: PipelineConfig,
    ) -> Self {
        let numbers = Arc::new(NumberGenerator::new());
        Self {
            forms,
            jobs: jobs.clone(),
            persister: Persister::new(equipment, numbers),
            job_creator: JobCreator::new(jobs),
            config,
        }
    }

    /// Process one batch of unread submissions for an agency.
    ///
    /// No single-submission failure aborts the batch: failures are logged,
    /// counted, and the submission is left unread for the next run.
    #[instrument(skip(self, agency), fields(agency = %agency.code))]
    pub async fn run_agency(&self, agency: &AgencyConfig) -> Result<IngestSummary> {
        let start = Instant::now();
        let submissions = self
            .forms
            .fetch_unread(&agency.form_id, self.config.fetch_batch_size)
            .await?;

        let mut summary = IngestSummary {
            fetched: submissions.len(),
            ..Default::default()
        };

        for raw in &submissions {
            match self.process_submission(agency, raw, &mut summary).await {
                Ok(consumed) => {
                    if consumed {
                        // Persist-then-mark: only now is the submission
                        // consumed upstream.
                        if let Err(e) = self
                            .forms
                            .mark_read(&agency.form_id, &[raw.submission_id.clone()])
                            .await
                        {
                            // Data is durable; the next run reprocesses and
                            // dedup absorbs it.
                            warn!(
                                subsystem = "ingest",
                                component = "pipeline",
                                agency = %agency.code,
                                submission_id = %raw.submission_id,
                                error = %e,
                                "Failed to mark submission read"
                            );
                            summary.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    error!(
                        subsystem = "ingest",
                        component = "pipeline",
                        agency = %agency.code,
                        submission_id = %raw.submission_id,
                        error = %e,
                        "Submission processing failed, leaving unread"
                    );
                    summary.errors += 1;
                }
            }
        }

        info!(
            subsystem = "ingest",
            component = "pipeline",
            op = "run_agency",
            agency = %agency.code,
            fetched = summary.fetched,
            invalid = summary.invalid,
            created = summary.created,
            skipped = summary.skipped,
            jobs_created = summary.jobs_created,
            jobs_skipped = summary.jobs_skipped,
            errors = summary.errors,
            duration_ms = start.elapsed().as_millis() as u64,
            "Agency ingest batch complete"
        );
        Ok(summary)
    }

    /// Returns true when the submission should be marked read.
    async fn process_submission(
        &self,
        agency: &AgencyConfig,
        raw: &RawSubmission,
        summary: &mut IngestSummary,
    ) -> Result<bool> {
        let extracted = extract(raw);

        if !extracted.is_valid() {
            // Nothing persistable; consume it so it stops refetching.
            warn!(
                subsystem = "ingest",
                component = "pipeline",
                agency = %agency.code,
                submission_id = %raw.submission_id,
                "Submission missing contact identity or visit date, flagged invalid"
            );
            summary.invalid += 1;
            return Ok(true);
        }

        let persisted = self
            .persister
            .persist_submission(&agency.code, &extracted)
            .await?;
        summary.created += persisted.created;
        summary.skipped += persisted.skipped;

        // Partial job-creation failure still consumes the submission; the
        // queue's natural key makes later repair idempotent.
        let jobs = self
            .job_creator
            .create_for_submission(&agency.code, &extracted, &persisted.off_contract_numbers)
            .await;
        summary.jobs_created += jobs.created;
        summary.jobs_skipped += jobs.skipped;
        summary.errors += jobs.errors;

        Ok(true)
    }

    /// Reset jobs stuck in `processing` past the timeout. Scheduled
    /// independently of agency runs.
    pub async fn sweep_stuck_jobs(&self) -> Result<u64> {
        let reset = self
            .jobs
            .reset_stuck(self.config.stuck_job_timeout_minutes)
            .await?;
        if reset > 0 {
            info!(
                subsystem = "ingest",
                component = "pipeline",
                op = "sweep_stuck_jobs",
                reset,
                "Reclaimed stuck jobs"
            );
        }
        Ok(reset)
    }
}

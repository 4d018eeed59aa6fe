//! Download-job creation from extraction and persistence results.
//!
//! One report job per submission (urgent), one photo job per media
//! reference (normal). Placeholder owners are resolved through the
//! index→number map produced by the persister; an unresolvable placeholder
//! skips that single job with a debug log and is never created with a
//! fabricated number.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use fieldsync_core::{
    defaults, ExtractedSubmission, JobRepository, JobType, MediaOwner, NewJob,
};

/// Outcome counters for job creation over one submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobOutcome {
    pub created: usize,
    /// Already-enqueued natural keys and unresolved placeholders.
    pub skipped: usize,
    /// Individual create failures absorbed without aborting the batch.
    pub errors: usize,
}

/// Turns extraction + persistence results into queue entries.
pub struct JobCreator {
    jobs: Arc<dyn JobRepository>,
}

impl JobCreator {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self { jobs }
    }

    /// Enqueue the report and photo jobs for one persisted submission.
    ///
    /// Individual failures are logged and counted; partial job creation
    /// never fails the submission.
    pub async fn create_for_submission(
        &self,
        agency: &str,
        submission: &ExtractedSubmission,
        off_contract_numbers: &HashMap<usize, String>,
    ) -> JobOutcome {
        let mut outcome = JobOutcome::default();
        let visit_code = submission.inherited_visit_code();

        // At most one report per submission, ahead of every photo.
        let report = NewJob {
            job_type: JobType::Report,
            agency_code: agency.to_string(),
            form_id: submission.form_id.clone(),
            submission_id: submission.submission_id.clone(),
            media_name: None,
            equipment_number: None,
            contact_id: submission.contact_id.clone(),
            visit_year: submission.visit_year(),
            visit_code: Some(visit_code),
            priority: defaults::PRIORITY_URGENT,
            max_attempts: defaults::JOB_MAX_ATTEMPTS,
        };
        self.create(report, &mut outcome).await;

        for media in &submission.media {
            let equipment_number = match &media.owner {
                MediaOwner::Number(number) => number.clone(),
                MediaOwner::Placeholder(index) => match off_contract_numbers.get(index) {
                    Some(number) => number.clone(),
                    None => {
                        debug!(
                            subsystem = "ingest",
                            component = "job_creator",
                            agency,
                            submission_id = %submission.submission_id,
                            position_index = index,
                            media_name = %media.file_name,
                            "Skipping photo job with unresolvable placeholder"
                        );
                        outcome.skipped += 1;
                        continue;
                    }
                },
            };

            let photo = NewJob {
                job_type: JobType::Photo,
                agency_code: agency.to_string(),
                form_id: submission.form_id.clone(),
                submission_id: submission.submission_id.clone(),
                media_name: Some(media.file_name.clone()),
                equipment_number: Some(equipment_number),
                contact_id: submission.contact_id.clone(),
                visit_year: submission.visit_year(),
                visit_code: Some(visit_code),
                priority: defaults::PRIORITY_NORMAL,
                max_attempts: defaults::JOB_MAX_ATTEMPTS,
            };
            self.create(photo, &mut outcome).await;
        }

        outcome
    }

    async fn create(&self, job: NewJob, outcome: &mut JobOutcome) {
        let submission_id = job.submission_id.clone();
        let media_name = job.media_name.clone();
        match self.jobs.create(job).await {
            Ok(Some(_)) => outcome.created += 1,
            Ok(None) => {
                debug!(
                    subsystem = "ingest",
                    component = "job_creator",
                    submission_id = %submission_id,
                    media_name = media_name.as_deref().unwrap_or(""),
                    "Job already enqueued"
                );
                outcome.skipped += 1;
            }
            Err(e) => {
                warn!(
                    subsystem = "ingest",
                    component = "job_creator",
                    submission_id = %submission_id,
                    media_name = media_name.as_deref().unwrap_or(""),
                    error = %e,
                    "Failed to enqueue job"
                );
                outcome.errors += 1;
            }
        }
    }
}

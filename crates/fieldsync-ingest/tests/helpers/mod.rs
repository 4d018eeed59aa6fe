//! In-memory fakes for pipeline integration tests.
//!
//! Each fake mirrors the contract of its Postgres counterpart closely enough
//! for end-to-end pipeline runs: natural-key no-ops on job creation,
//! priority-then-age claim order, retry bookkeeping on failure.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use fieldsync_core::{
    EquipmentRepository, EquipmentRow, Error, FormsApi, Job, JobRepository, JobStatus, MergeKey,
    NewEquipment, NewJob, QueueStats, RawSubmission, Result, VisitCode,
};

// =============================================================================
// EQUIPMENT
// =============================================================================

#[derive(Default)]
pub struct MemoryEquipmentRepository {
    rows: Mutex<Vec<EquipmentRow>>,
}

impl MemoryEquipmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<EquipmentRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn archive(&self, number: &str) {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.number == number {
                row.archived = true;
            }
        }
    }
}

#[async_trait]
impl EquipmentRepository for MemoryEquipmentRepository {
    async fn insert(&self, equipment: NewEquipment) -> Result<Uuid> {
        let id = Uuid::now_v7();
        self.rows.lock().unwrap().push(EquipmentRow {
            id,
            agency_code: equipment.agency_code,
            contact_id: equipment.contact_id,
            company_name: equipment.company_name,
            number: equipment.number,
            visit_code: equipment.visit_code,
            visit_year: equipment.visit_year,
            visit_date: equipment.visit_date,
            is_off_contract: equipment.is_off_contract,
            form_id: equipment.form_id,
            submission_id: equipment.submission_id,
            position_index: equipment.position_index,
            attributes: equipment.attributes,
            archived: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn exists_contract(
        &self,
        agency: &str,
        contact_id: &str,
        number: &str,
        visit_code: VisitCode,
        visit_date: NaiveDate,
    ) -> Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| {
            r.agency_code == agency
                && !r.is_off_contract
                && r.contact_id == contact_id
                && r.number == number
                && r.visit_code == visit_code
                && r.visit_date == visit_date
        }))
    }

    async fn exists_off_contract(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| {
            r.agency_code == agency
                && r.is_off_contract
                && r.form_id == form_id
                && r.submission_id == submission_id
                && r.position_index == Some(position_index)
        }))
    }

    async fn max_number_for_prefix(
        &self,
        agency: &str,
        contact_id: &str,
        prefix: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.agency_code == agency
                    && r.is_off_contract
                    && r.contact_id == contact_id
                    && r.number.starts_with(prefix)
            })
            .map(|r| r.number.clone())
            .max())
    }

    async fn find_off_contract_number(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<Option<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.agency_code == agency
                    && r.is_off_contract
                    && r.form_id == form_id
                    && r.submission_id == submission_id
                    && r.position_index == Some(position_index)
            })
            .map(|r| r.number.clone()))
    }

    async fn list_active(&self, agency: &str) -> Result<Vec<EquipmentRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.agency_code == agency && !r.archived)
            .cloned()
            .collect())
    }

    async fn archived_keys(&self, agency: &str) -> Result<Vec<MergeKey>> {
        let rows = self.rows.lock().unwrap();
        let key = |r: &EquipmentRow| MergeKey {
            contact_id: r.contact_id.clone(),
            visit_code: r.visit_code.as_str().to_string(),
            equipment_number: r.number.clone(),
        };
        Ok(rows
            .iter()
            .filter(|r| r.agency_code == agency && r.archived)
            .map(key)
            .filter(|k| {
                !rows
                    .iter()
                    .any(|r| r.agency_code == agency && !r.archived && key(r) == *k)
            })
            .collect())
    }
}

// =============================================================================
// JOBS
// =============================================================================

#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn create(&self, job: NewJob) -> Result<Option<Uuid>> {
        let mut jobs = self.jobs.lock().unwrap();
        let exists = jobs.iter().any(|j| {
            j.form_id == job.form_id
                && j.submission_id == job.submission_id
                && j.media_name == job.media_name
        });
        if exists {
            return Ok(None);
        }
        let id = Uuid::now_v7();
        jobs.push(Job {
            id,
            job_type: job.job_type,
            agency_code: job.agency_code,
            form_id: job.form_id,
            submission_id: job.submission_id,
            media_name: job.media_name,
            equipment_number: job.equipment_number,
            contact_id: job.contact_id,
            visit_year: job.visit_year,
            visit_code: job.visit_code,
            status: JobStatus::Pending,
            priority: job.priority,
            attempts: 0,
            max_attempts: job.max_attempts,
            last_error: None,
            local_path: None,
            file_size: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        });
        Ok(Some(id))
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let next = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (-j.priority, j.created_at));
        Ok(next.map(|job| {
            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn complete(&self, job_id: Uuid, local_path: &str, file_size: i64) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
        job.status = JobStatus::Done;
        job.local_path = Some(local_path.to_string());
        job.file_size = Some(file_size);
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
        job.attempts += 1;
        job.last_error = Some(error.to_string());
        job.status = if job.attempts < job.max_attempts {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };
        Ok(())
    }

    // Every processing job counts as stuck; the fake has no clock to age
    // them against.
    async fn reset_stuck(&self, _older_than_minutes: i64) -> Result<u64> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut reset = 0;
        for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Processing) {
            job.status = JobStatus::Pending;
            job.started_at = None;
            reset += 1;
        }
        Ok(reset)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let jobs = self.jobs.lock().unwrap();
        let count = |s: JobStatus| jobs.iter().filter(|j| j.status == s).count() as i64;
        Ok(QueueStats {
            pending: count(JobStatus::Pending),
            processing: count(JobStatus::Processing),
            done: count(JobStatus::Done),
            failed: count(JobStatus::Failed),
            total: jobs.len() as i64,
        })
    }
}

// =============================================================================
// FORMS API
// =============================================================================

#[derive(Default)]
pub struct MockFormsApi {
    unread: Mutex<Vec<RawSubmission>>,
    read: Mutex<Vec<String>>,
    fail_mark_read: AtomicBool,
}

impl MockFormsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_unread(&self, submission: RawSubmission) {
        self.unread.lock().unwrap().push(submission);
    }

    pub fn read_ids(&self) -> Vec<String> {
        self.read.lock().unwrap().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.unread.lock().unwrap().len()
    }

    pub fn set_fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FormsApi for MockFormsApi {
    async fn fetch_unread(&self, form_id: &str, limit: u32) -> Result<Vec<RawSubmission>> {
        Ok(self
            .unread
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.form_id == form_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_submission(&self, _form_id: &str, submission_id: &str) -> Result<RawSubmission> {
        self.unread
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.submission_id == submission_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))
    }

    async fn mark_read(&self, _form_id: &str, submission_ids: &[String]) -> Result<()> {
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(Error::Upstream("mark read unavailable".into()));
        }
        self.unread
            .lock()
            .unwrap()
            .retain(|s| !submission_ids.contains(&s.submission_id));
        self.read.lock().unwrap().extend_from_slice(submission_ids);
        Ok(())
    }

    async fn mark_unread(&self, _form_id: &str, submission_ids: &[String]) -> Result<()> {
        self.read
            .lock()
            .unwrap()
            .retain(|id| !submission_ids.contains(id));
        Ok(())
    }

    async fn download_media(
        &self,
        _form_id: &str,
        _submission_id: &str,
        _media_name: &str,
    ) -> Result<Vec<u8>> {
        Err(Error::Internal("media download not wired in tests".into()))
    }

    async fn download_report(&self, _form_id: &str, _submission_id: &str) -> Result<Vec<u8>> {
        Err(Error::Internal("report download not wired in tests".into()))
    }

    async fn get_list(&self, _list_id: &str) -> Result<Vec<String>> {
        Err(Error::Internal("lists not wired in tests".into()))
    }

    async fn replace_list(&self, _list_id: &str, _entries: &[String]) -> Result<()> {
        Err(Error::Internal("lists not wired in tests".into()))
    }
}

//! Core traits for fieldsync abstractions.
//!
//! These traits define the seams between the pipeline and its
//! collaborators (relational store, upstream forms API), enabling
//! pluggable backends and testability with in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// EQUIPMENT REPOSITORY
// =============================================================================

/// Repository for durable equipment records.
///
/// One generic schema serves every agency; rows are partitioned by
/// `agency_code`.
#[async_trait]
pub trait EquipmentRepository: Send + Sync {
    /// Insert a new equipment row. Rows are immutable after insert.
    async fn insert(&self, equipment: NewEquipment) -> Result<Uuid>;

    /// True when the contract identity (contact, number, visit code) already
    /// exists with a matching visit date. Date comparison is on the date
    /// component only, never timestamp-exact.
    async fn exists_contract(
        &self,
        agency: &str,
        contact_id: &str,
        number: &str,
        visit_code: VisitCode,
        visit_date: NaiveDate,
    ) -> Result<bool>;

    /// True when the structural triple (form, submission, position index)
    /// already exists, regardless of row content. Position index is the sole
    /// discriminator: content in a re-delivered submission is irrelevant to
    /// identity.
    async fn exists_off_contract(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<bool>;

    /// Highest existing off-contract number sharing `prefix` for a contact,
    /// e.g. `Some("RID07")`. None when the contact has no number with that
    /// prefix yet.
    async fn max_number_for_prefix(
        &self,
        agency: &str,
        contact_id: &str,
        prefix: &str,
    ) -> Result<Option<String>>;

    /// Number previously assigned to an off-contract slot, used to resolve
    /// placeholders when the row itself was skipped as a duplicate.
    async fn find_off_contract_number(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<Option<String>>;

    /// All currently-active (non-archived) equipment for an agency.
    async fn list_active(&self, agency: &str) -> Result<Vec<EquipmentRow>>;

    /// Identities that are fully archived: archived rows for which no active
    /// version remains. These are the only upstream entries the merger may
    /// drop.
    async fn archived_keys(&self, agency: &str) -> Result<Vec<MergeKey>>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for the durable download queue.
///
/// Rows are claimed and completed/failed by an external download-worker
/// process; this side only creates, sweeps, and observes them.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a job unless its natural key (form, submission, media name)
    /// already exists. Returns None on the benign already-exists no-op.
    async fn create(&self, job: NewJob) -> Result<Option<Uuid>>;

    /// Claim the next pending job (priority descending, then age), moving it
    /// to `processing`.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a claimed job done, recording where the artifact landed.
    async fn complete(&self, job_id: Uuid, local_path: &str, file_size: i64) -> Result<()>;

    /// Record a failed attempt: back to `pending` while attempts remain,
    /// `failed` once exhausted.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Reset jobs stuck in `processing` longer than `older_than_minutes`
    /// back to `pending` without touching their attempt counter. Reclaims
    /// rows abandoned by crashed workers.
    async fn reset_stuck(&self, older_than_minutes: i64) -> Result<u64>;

    /// Queue health counters.
    async fn stats(&self) -> Result<QueueStats>;
}

// =============================================================================
// LIST BACKUP REPOSITORY
// =============================================================================

/// Storage for pre-push snapshots of the upstream list.
///
/// The push is a destructive full overwrite, so the pre-merge upstream state
/// is persisted before every push.
#[async_trait]
pub trait ListBackupRepository: Send + Sync {
    /// Persist a snapshot of raw upstream entries for an agency.
    async fn save(&self, agency: &str, entries: &[String]) -> Result<Uuid>;

    /// Apply bounded retention: drop snapshots older than `max_age_days` and
    /// keep at most `keep_count` per agency. Returns rows deleted.
    async fn prune(&self, agency: &str, max_age_days: i64, keep_count: i64) -> Result<u64>;
}

// =============================================================================
// UPSTREAM FORMS API
// =============================================================================

/// Client surface of the upstream mobile-forms API.
///
/// All calls are blocking network round-trips with per-category timeout
/// budgets (short for metadata, longer for media, longest for reports) and
/// fail independently without aborting the batch.
#[async_trait]
pub trait FormsApi: Send + Sync {
    /// Fetch up to `limit` unread submissions for a form.
    async fn fetch_unread(&self, form_id: &str, limit: u32) -> Result<Vec<RawSubmission>>;

    /// Fetch one submission by id.
    async fn fetch_submission(&self, form_id: &str, submission_id: &str) -> Result<RawSubmission>;

    /// Mark a set of submissions consumed.
    async fn mark_read(&self, form_id: &str, submission_ids: &[String]) -> Result<()>;

    /// Mark a set of submissions unread again (operator replay).
    async fn mark_unread(&self, form_id: &str, submission_ids: &[String]) -> Result<()>;

    /// Download a named media item as bytes.
    async fn download_media(
        &self,
        form_id: &str,
        submission_id: &str,
        media_name: &str,
    ) -> Result<Vec<u8>>;

    /// Download the generated visit report as bytes.
    async fn download_report(&self, form_id: &str, submission_id: &str) -> Result<Vec<u8>>;

    /// Fetch all raw entries of an external list.
    async fn get_list(&self, list_id: &str) -> Result<Vec<String>>;

    /// Replace all entries of an external list. Destructive full overwrite.
    async fn replace_list(&self, list_id: &str, entries: &[String]) -> Result<()>;
}

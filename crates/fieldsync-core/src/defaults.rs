//! Centralized default values for fieldsync configuration.
//!
//! Every tunable carries its default here so config structs, `from_env()`
//! constructors, and tests agree on a single source of truth.

// ─── Upstream forms API ────────────────────────────────────────────────────

/// Default base URL of the upstream forms API.
pub const FORMS_BASE_URL: &str = "https://forms.example.com/rest/v3";

/// Number of unread submissions fetched per batch.
pub const FETCH_BATCH_SIZE: u32 = 50;

/// Timeout budget for metadata calls (fetch, mark-read, list get/put), seconds.
pub const METADATA_TIMEOUT_SECS: u64 = 15;

/// Timeout budget for media downloads, seconds.
pub const MEDIA_TIMEOUT_SECS: u64 = 60;

/// Timeout budget for generated report downloads, seconds.
/// Reports are rendered server-side on demand and are the slowest calls.
pub const REPORT_TIMEOUT_SECS: u64 = 180;

// ─── Job queue ─────────────────────────────────────────────────────────────

/// Maximum download attempts before a job is parked as failed.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

/// Priority assigned to report-download jobs.
pub const PRIORITY_URGENT: i32 = 10;

/// Priority assigned to photo-download jobs.
pub const PRIORITY_NORMAL: i32 = 0;

/// Minutes a job may sit in `processing` before the sweep resets it to
/// `pending`. Covers workers that crashed mid-download.
pub const STUCK_JOB_TIMEOUT_MINUTES: i64 = 30;

// ─── List sync backups ─────────────────────────────────────────────────────

/// Days a pre-push list snapshot is retained.
pub const BACKUP_MAX_AGE_DAYS: i64 = 90;

/// Maximum snapshots retained per agency regardless of age.
pub const BACKUP_KEEP_PER_AGENCY: i64 = 30;

// ─── Extraction ────────────────────────────────────────────────────────────

/// Separator inserted between anomaly sub-fields when concatenating.
pub const ANOMALY_SEPARATOR: &str = " | ";

/// Fallback prefix for off-contract equipment whose type label matches no
/// keyword in the prefix table.
pub const GENERIC_EQUIPMENT_PREFIX: &str = "EQU";

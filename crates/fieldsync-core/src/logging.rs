//! Structured logging schema and field name constants for fieldsync.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, per-agency batch summaries, benign no-ops |
//! | DEBUG | Per-record decisions (dropped record, skipped placeholder) |
//! | TRACE | Per-field iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "ingest", "listsync", "db", "forms"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "extractor", "persister", "job_creator", "merger", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "run_agency", "claim_next", "replace_list"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Agency code owning the processed data.
pub const AGENCY: &str = "agency";

/// Upstream form identifier.
pub const FORM_ID: &str = "form_id";

/// Upstream submission identifier.
pub const SUBMISSION_ID: &str = "submission_id";

/// Contact (customer site) identifier.
pub const CONTACT_ID: &str = "contact_id";

/// Equipment number (contract or synthesized off-contract).
pub const EQUIPMENT_NUMBER: &str = "equipment_number";

/// Positional index of an off-contract entry within its submission.
pub const POSITION_INDEX: &str = "position_index";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job type enum variant.
pub const JOB_TYPE: &str = "job_type";

/// Media file name referenced by a submission.
pub const MEDIA_NAME: &str = "media_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of submissions fetched in a batch.
pub const FETCHED: &str = "fetched";

/// Number of equipment rows created.
pub const CREATED: &str = "created";

/// Number of records skipped as duplicates.
pub const SKIPPED: &str = "skipped";

/// Number of per-record failures absorbed by the batch.
pub const ERRORS: &str = "errors";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

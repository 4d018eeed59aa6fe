//! Core data models for fieldsync.
//!
//! These types are shared across all fieldsync crates and represent the
//! domain entities: submissions, equipment records, media references,
//! download jobs, and external list entries.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// VISIT CODES
// =============================================================================

/// Position of a visit in the annual maintenance cycle.
///
/// Parsed case-insensitively; anything outside the known set falls back to
/// [`VisitCode::Ce1`], which is also the default for submissions carrying no
/// usable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisitCode {
    #[default]
    Ce1,
    Ce2,
    Ce3,
    Ce4,
    Cea,
}

impl VisitCode {
    /// Parse a raw code, returning None when it is not a known visit code.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CE1" => Some(VisitCode::Ce1),
            "CE2" => Some(VisitCode::Ce2),
            "CE3" => Some(VisitCode::Ce3),
            "CE4" => Some(VisitCode::Ce4),
            "CEA" => Some(VisitCode::Cea),
            _ => None,
        }
    }

    /// Extract the visit code from a hierarchical path string attached to an
    /// equipment number field (e.g. `ACME\CE2`). Segments are scanned in
    /// order; the first valid code wins. Invalid or absent codes default to
    /// CE1 per the ingestion contract.
    pub fn from_path(path: &str) -> Self {
        path.split('\\')
            .find_map(VisitCode::parse)
            .unwrap_or_default()
    }

    /// Canonical upper-case form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitCode::Ce1 => "CE1",
            VisitCode::Ce2 => "CE2",
            VisitCode::Ce3 => "CE3",
            VisitCode::Ce4 => "CE4",
            VisitCode::Cea => "CEA",
        }
    }
}

impl std::fmt::Display for VisitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EXTRACTED SUBMISSION TYPES
// =============================================================================

/// Attributes shared by contract and off-contract equipment, extracted from
/// the fixed sub-field mapping. Every field tolerates absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentAttributes {
    pub equipment_type: Option<String>,
    pub brand: Option<String>,
    pub mode: Option<String>,
    pub dimensions: Option<String>,
    pub condition: Option<String>,
    /// Anomaly sub-fields concatenated with `" | "`; None when empty.
    pub anomalies: Option<String>,
    pub commissioning_year: Option<String>,
    pub serial: Option<String>,
}

/// Identity of an extracted equipment entry. The two schemes are disjoint:
/// contract identity is business-semantic, off-contract identity is the raw
/// slot the entry occupied in the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquipmentIdentity {
    Contract {
        number: String,
        visit_code: VisitCode,
    },
    OffContract {
        position_index: usize,
    },
}

/// One equipment entry extracted from a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEquipment {
    pub identity: EquipmentIdentity,
    pub attributes: EquipmentAttributes,
}

impl ExtractedEquipment {
    pub fn is_off_contract(&self) -> bool {
        matches!(self.identity, EquipmentIdentity::OffContract { .. })
    }
}

/// Owner of a media reference. Off-contract equipment has no number at
/// extraction time, so its media carry the positional index as a placeholder
/// until the persister assigns a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOwner {
    Number(String),
    Placeholder(usize),
}

/// A reference to a photographic artifact held upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReference {
    pub file_name: String,
    pub owner: MediaOwner,
}

/// Everything extracted from one raw submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedSubmission {
    pub form_id: String,
    pub submission_id: String,
    pub contact_id: Option<String>,
    pub company_name: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub technician_code: Option<String>,
    pub equipment: Vec<ExtractedEquipment>,
    pub media: Vec<MediaReference>,
}

impl ExtractedSubmission {
    /// A submission without contact identity or a visit year cannot be
    /// deduplicated or persisted; the caller flags it invalid and moves on.
    pub fn is_valid(&self) -> bool {
        self.contact_id.as_deref().is_some_and(|c| !c.is_empty()) && self.visit_date.is_some()
    }

    /// Audit-cycle year derived from the visit date.
    pub fn visit_year(&self) -> Option<i32> {
        self.visit_date.map(|d| d.year())
    }

    /// Visit code inherited by off-contract equipment: the code of the first
    /// contract entry in the submission, or CE1 when there is none.
    pub fn inherited_visit_code(&self) -> VisitCode {
        self.equipment
            .iter()
            .find_map(|e| match &e.identity {
                EquipmentIdentity::Contract { visit_code, .. } => Some(*visit_code),
                EquipmentIdentity::OffContract { .. } => None,
            })
            .unwrap_or_default()
    }
}

/// Raw submission envelope as fetched from the upstream forms API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubmission {
    pub form_id: String,
    pub submission_id: String,
    /// Nested field payload; shape drifts across agencies and form revisions.
    pub fields: JsonValue,
}

// =============================================================================
// PERSISTED EQUIPMENT
// =============================================================================

/// Insert payload for an equipment row.
#[derive(Debug, Clone)]
pub struct NewEquipment {
    pub agency_code: String,
    pub contact_id: String,
    pub company_name: Option<String>,
    pub number: String,
    pub visit_code: VisitCode,
    pub visit_year: i32,
    pub visit_date: NaiveDate,
    pub is_off_contract: bool,
    pub form_id: String,
    pub submission_id: String,
    /// Set only for off-contract rows; the slot the entry occupied.
    pub position_index: Option<i32>,
    pub attributes: EquipmentAttributes,
}

/// A persisted equipment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRow {
    pub id: Uuid,
    pub agency_code: String,
    pub contact_id: String,
    pub company_name: Option<String>,
    pub number: String,
    pub visit_code: VisitCode,
    pub visit_year: i32,
    pub visit_date: NaiveDate,
    pub is_off_contract: bool,
    pub form_id: String,
    pub submission_id: String,
    pub position_index: Option<i32>,
    pub attributes: EquipmentAttributes,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// JOBS
// =============================================================================

/// Kind of binary artifact a job downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    Photo,
    Report,
}

/// Job lifecycle state.
///
/// pending → processing → done, or processing → pending (retry while
/// attempts < max), or processing → failed (attempts exhausted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

/// Insert payload for a download job. Natural key is
/// (form_id, submission_id, media_name); duplicate creation is a benign
/// no-op.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: JobType,
    pub agency_code: String,
    pub form_id: String,
    pub submission_id: String,
    /// None for report jobs (one report per submission).
    pub media_name: Option<String>,
    pub equipment_number: Option<String>,
    pub contact_id: Option<String>,
    pub visit_year: Option<i32>,
    pub visit_code: Option<VisitCode>,
    pub priority: i32,
    pub max_attempts: i32,
}

/// A persisted job row, consumed by the external download worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub agency_code: String,
    pub form_id: String,
    pub submission_id: String,
    pub media_name: Option<String>,
    pub equipment_number: Option<String>,
    pub contact_id: Option<String>,
    pub visit_year: Option<i32>,
    pub visit_code: Option<VisitCode>,
    pub status: JobStatus,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub local_path: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Queue health snapshot for operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub done: i64,
    pub failed: i64,
    pub total: i64,
}

// =============================================================================
// EXTERNAL LIST
// =============================================================================

/// Identity used to reconcile local and external list entries.
///
/// Cosmetic fields (company name, brand, …) may diverge between sides and
/// never participate in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeKey {
    pub contact_id: String,
    pub visit_code: String,
    pub equipment_number: String,
}

/// One decoded entry of the externally-held equipment list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalListItem {
    pub company: String,
    pub visit_code: String,
    pub equipment_number: String,
    pub equipment_type: String,
    pub commissioning_year: String,
    pub serial: String,
    pub brand: String,
    pub dimensions: String,
    pub contact_id: String,
    pub company_id: String,
    pub agency_code: String,
}

impl ExternalListItem {
    pub fn merge_key(&self) -> MergeKey {
        MergeKey {
            contact_id: self.contact_id.clone(),
            visit_code: self.visit_code.clone(),
            equipment_number: self.equipment_number.clone(),
        }
    }
}

// =============================================================================
// AGENCY CONFIGURATION
// =============================================================================

/// Per-agency processing configuration. One entity type per agency, N times:
/// everything is parameterized by the agency code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyConfig {
    /// Short agency code, e.g. "LYO".
    pub code: String,
    /// Upstream form id whose submissions feed this agency.
    pub form_id: String,
    /// Upstream list id holding the agency's equipment snapshot, when the
    /// agency participates in list sync.
    pub list_id: Option<String>,
}

// =============================================================================
// SUMMARIES
// =============================================================================

/// Per-agency ingest outcome counters, logged at INFO after each batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub fetched: usize,
    pub invalid: usize,
    pub created: usize,
    pub skipped: usize,
    pub jobs_created: usize,
    pub jobs_skipped: usize,
    pub errors: usize,
}

/// Per-agency list sync outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub kept: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_code_parse_case_insensitive() {
        assert_eq!(VisitCode::parse("ce2"), Some(VisitCode::Ce2));
        assert_eq!(VisitCode::parse("CEA"), Some(VisitCode::Cea));
        assert_eq!(VisitCode::parse(" ce4 "), Some(VisitCode::Ce4));
        assert_eq!(VisitCode::parse("CE5"), None);
        assert_eq!(VisitCode::parse(""), None);
    }

    #[test]
    fn test_visit_code_from_path() {
        assert_eq!(VisitCode::from_path("ACME\\CE2"), VisitCode::Ce2);
        assert_eq!(VisitCode::from_path("ACME\\Depot 3\\cea"), VisitCode::Cea);
        // Invalid or absent code defaults to CE1.
        assert_eq!(VisitCode::from_path("ACME\\CE9"), VisitCode::Ce1);
        assert_eq!(VisitCode::from_path(""), VisitCode::Ce1);
    }

    #[test]
    fn test_visit_code_display_is_canonical() {
        assert_eq!(VisitCode::Cea.to_string(), "CEA");
        assert_eq!(VisitCode::default().to_string(), "CE1");
    }

    #[test]
    fn test_submission_validity() {
        let mut sub = ExtractedSubmission {
            contact_id: Some("C042".into()),
            visit_date: NaiveDate::from_ymd_opt(2026, 3, 14),
            ..Default::default()
        };
        assert!(sub.is_valid());
        assert_eq!(sub.visit_year(), Some(2026));

        sub.contact_id = Some(String::new());
        assert!(!sub.is_valid());

        sub.contact_id = Some("C042".into());
        sub.visit_date = None;
        assert!(!sub.is_valid());
    }

    #[test]
    fn test_inherited_visit_code_from_first_contract_entry() {
        let sub = ExtractedSubmission {
            equipment: vec![
                ExtractedEquipment {
                    identity: EquipmentIdentity::OffContract { position_index: 0 },
                    attributes: EquipmentAttributes::default(),
                },
                ExtractedEquipment {
                    identity: EquipmentIdentity::Contract {
                        number: "SEC03".into(),
                        visit_code: VisitCode::Ce3,
                    },
                    attributes: EquipmentAttributes::default(),
                },
                ExtractedEquipment {
                    identity: EquipmentIdentity::Contract {
                        number: "RID01".into(),
                        visit_code: VisitCode::Ce4,
                    },
                    attributes: EquipmentAttributes::default(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(sub.inherited_visit_code(), VisitCode::Ce3);
    }

    #[test]
    fn test_inherited_visit_code_defaults_without_contract_equipment() {
        let sub = ExtractedSubmission {
            equipment: vec![ExtractedEquipment {
                identity: EquipmentIdentity::OffContract { position_index: 0 },
                attributes: EquipmentAttributes::default(),
            }],
            ..Default::default()
        };
        assert_eq!(sub.inherited_visit_code(), VisitCode::Ce1);
    }

    #[test]
    fn test_merge_key_ignores_cosmetic_fields() {
        let a = ExternalListItem {
            company: "ACME SARL".into(),
            visit_code: "CE2".into(),
            equipment_number: "SEC03".into(),
            contact_id: "C042".into(),
            ..Default::default()
        };
        let b = ExternalListItem {
            company: "ACME (renamed)".into(),
            brand: "Hormann".into(),
            ..a.clone()
        };
        assert_eq!(a.merge_key(), b.merge_key());
    }
}

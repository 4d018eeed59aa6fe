//! Duplicate detection for extracted equipment records.
//!
//! Two disjoint identity schemes, never conflated:
//!
//! - Contract identity is business-semantic: the same physical unit in the
//!   same audit cycle, i.e. (contact, number, visit code) with a matching
//!   visit date (date component only).
//! - Off-contract identity is purely mechanical: the same raw slot of the
//!   same submission, i.e. (form, submission, position index). Content is
//!   irrelevant, because a re-delivered submission may carry edited text for
//!   what is still the same detection.

use std::sync::Arc;

use fieldsync_core::{
    EquipmentIdentity, EquipmentRepository, Error, ExtractedEquipment, ExtractedSubmission, Result,
};

/// Decides whether an equivalent equipment record already exists.
pub struct Deduplicator {
    equipment: Arc<dyn EquipmentRepository>,
}

impl Deduplicator {
    pub fn new(equipment: Arc<dyn EquipmentRepository>) -> Self {
        Self { equipment }
    }

    /// True when `entry` already has an equivalent persisted row.
    ///
    /// The submission must be valid (contact id and visit date present);
    /// the pipeline filters invalid submissions before reaching this point.
    pub async fn is_duplicate(
        &self,
        agency: &str,
        submission: &ExtractedSubmission,
        entry: &ExtractedEquipment,
    ) -> Result<bool> {
        match &entry.identity {
            EquipmentIdentity::Contract { number, visit_code } => {
                let contact_id = submission
                    .contact_id
                    .as_deref()
                    .ok_or_else(|| Error::InvalidInput("submission without contact id".into()))?;
                let visit_date = submission
                    .visit_date
                    .ok_or_else(|| Error::InvalidInput("submission without visit date".into()))?;
                self.equipment
                    .exists_contract(agency, contact_id, number, *visit_code, visit_date)
                    .await
            }
            EquipmentIdentity::OffContract { position_index } => {
                self.equipment
                    .exists_off_contract(
                        agency,
                        &submission.form_id,
                        &submission.submission_id,
                        *position_index as i32,
                    )
                    .await
            }
        }
    }
}

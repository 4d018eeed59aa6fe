//! Equipment persistence.
//!
//! Writes non-duplicate extracted records with their full attribute set and
//! returns, for every off-contract slot in the submission, the final
//! assigned number. Duplicates are re-looked-up so downstream placeholder
//! resolution still succeeds even when the row itself was skipped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, info};

use fieldsync_core::{
    EquipmentIdentity, EquipmentRepository, Error, ExtractedEquipment, ExtractedSubmission,
    NewEquipment, Result, VisitCode,
};

use crate::dedup::Deduplicator;
use crate::numbering::{next_number, prefix_for_type, NumberGenerator};

/// Outcome of persisting one submission.
#[derive(Debug, Default)]
pub struct PersistOutcome {
    /// Equipment rows inserted.
    pub created: usize,
    /// Records skipped as duplicates.
    pub skipped: usize,
    /// Final number for every off-contract slot, duplicates included.
    pub off_contract_numbers: HashMap<usize, String>,
}

/// Writes extracted equipment records.
pub struct Persister {
    equipment: Arc<dyn EquipmentRepository>,
    dedup: Deduplicator,
    numbers: Arc<NumberGenerator>,
}

impl Persister {
    pub fn new(equipment: Arc<dyn EquipmentRepository>, numbers: Arc<NumberGenerator>) -> Self {
        let dedup = Deduplicator::new(equipment.clone());
        Self {
            equipment,
            dedup,
            numbers,
        }
    }

    /// Persist every non-duplicate record of a valid submission.
    pub async fn persist_submission(
        &self,
        agency: &str,
        submission: &ExtractedSubmission,
    ) -> Result<PersistOutcome> {
        let contact_id = submission
            .contact_id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("submission without contact id".into()))?;
        let visit_date = submission
            .visit_date
            .ok_or_else(|| Error::InvalidInput("submission without visit date".into()))?;
        let visit_year = visit_date.year();

        let inherited = submission.inherited_visit_code();
        let mut outcome = PersistOutcome::default();

        for entry in &submission.equipment {
            if self.dedup.is_duplicate(agency, submission, entry).await? {
                outcome.skipped += 1;
                if let EquipmentIdentity::OffContract { position_index } = entry.identity {
                    self.resolve_existing_number(agency, submission, position_index, &mut outcome)
                        .await?;
                }
                continue;
            }

            match &entry.identity {
                EquipmentIdentity::Contract { number, visit_code } => {
                    self.insert_row(
                        agency,
                        submission,
                        entry,
                        contact_id,
                        number.clone(),
                        *visit_code,
                        visit_year,
                        None,
                        &mut outcome,
                    )
                    .await?;
                }
                EquipmentIdentity::OffContract { position_index } => {
                    let prefix = prefix_for_type(entry.attributes.equipment_type.as_deref());

                    // Critical section: the max-number lookup and the insert
                    // must not interleave with another allocation for the
                    // same (contact, prefix).
                    let guard = self.numbers.lock(contact_id, prefix).await;
                    let number =
                        next_number(self.equipment.as_ref(), agency, contact_id, prefix).await?;
                    let created = self
                        .insert_row(
                            agency,
                            submission,
                            entry,
                            contact_id,
                            number.clone(),
                            inherited,
                            visit_year,
                            Some(*position_index as i32),
                            &mut outcome,
                        )
                        .await?;
                    drop(guard);

                    if created {
                        outcome
                            .off_contract_numbers
                            .insert(*position_index, number);
                    } else {
                        // Lost an insert race: the winning row owns the slot
                        // and its number.
                        self.resolve_existing_number(
                            agency,
                            submission,
                            *position_index,
                            &mut outcome,
                        )
                        .await?;
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// A duplicate off-contract slot still needs its previously assigned
    /// number so media placeholders resolve.
    async fn resolve_existing_number(
        &self,
        agency: &str,
        submission: &ExtractedSubmission,
        position_index: usize,
        outcome: &mut PersistOutcome,
    ) -> Result<()> {
        match self
            .equipment
            .find_off_contract_number(
                agency,
                &submission.form_id,
                &submission.submission_id,
                position_index as i32,
            )
            .await?
        {
            Some(number) => {
                outcome.off_contract_numbers.insert(position_index, number);
            }
            None => {
                // exists_off_contract said true, so this is a store-level
                // inconsistency worth surfacing.
                info!(
                    subsystem = "ingest",
                    component = "persister",
                    agency,
                    submission_id = %submission.submission_id,
                    position_index,
                    "Duplicate off-contract slot has no retrievable number"
                );
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_row(
        &self,
        agency: &str,
        submission: &ExtractedSubmission,
        entry: &ExtractedEquipment,
        contact_id: &str,
        number: String,
        visit_code: VisitCode,
        visit_year: i32,
        position_index: Option<i32>,
        outcome: &mut PersistOutcome,
    ) -> Result<bool> {
        let visit_date = submission
            .visit_date
            .ok_or_else(|| Error::InvalidInput("submission without visit date".into()))?;

        let result = self
            .equipment
            .insert(NewEquipment {
                agency_code: agency.to_string(),
                contact_id: contact_id.to_string(),
                company_name: submission.company_name.clone(),
                number: number.clone(),
                visit_code,
                visit_year,
                visit_date,
                is_off_contract: position_index.is_some(),
                form_id: submission.form_id.clone(),
                submission_id: submission.submission_id.clone(),
                position_index,
                attributes: entry.attributes.clone(),
            })
            .await;

        match result {
            Ok(_) => {
                outcome.created += 1;
                debug!(
                    subsystem = "ingest",
                    component = "persister",
                    agency,
                    contact_id,
                    equipment_number = %number,
                    "Inserted equipment row"
                );
                Ok(true)
            }
            // A concurrent re-delivery won the race; same benign no-op as
            // the dedup check catching it first.
            Err(e) if e.is_unique_violation() => {
                info!(
                    subsystem = "ingest",
                    component = "persister",
                    agency,
                    equipment_number = %number,
                    "Equipment row already exists"
                );
                outcome.skipped += 1;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

//! Record extraction from raw submissions.
//!
//! Submissions arrive as nested JSON whose field names drifted across
//! agencies and form revisions. Every top-level identity field therefore has
//! an ordered alias list (first non-empty wins), and every per-record defect
//! drops only that record. A submission missing its contact identity or
//! visit year is returned as-is and flagged invalid by the caller; nothing
//! here raises on shape problems.

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use tracing::debug;

use fieldsync_core::{
    defaults, EquipmentAttributes, EquipmentIdentity, ExtractedEquipment, ExtractedSubmission,
    MediaOwner, MediaReference, RawSubmission, VisitCode,
};

// ─── Field alias tables ────────────────────────────────────────────────────
// Ordered by priority: the first alias carrying a non-empty value wins.

/// Contact (customer site) identifier aliases.
pub const CONTACT_ID_ALIASES: &[&str] = &["code_client", "code_contact", "num_client", "client"];

/// Company display name aliases.
pub const COMPANY_ALIASES: &[&str] = &["societe", "nom_societe", "nom_client"];

/// Visit date aliases.
pub const VISIT_DATE_ALIASES: &[&str] = &["date_intervention", "date_visite", "date_passage"];

/// Technician code aliases.
pub const TECHNICIAN_ALIASES: &[&str] = &["code_technicien", "technicien", "intervenant"];

/// Contract-equipment table aliases.
pub const CONTRACT_TABLE_ALIASES: &[&str] = &[
    "tableau_sous_contrat",
    "equipements_contrat",
    "tableau_equipements",
];

/// Off-contract-equipment table aliases.
pub const OFF_CONTRACT_TABLE_ALIASES: &[&str] =
    &["tableau_hors_contrat", "equipements_hors_contrat"];

/// Equipment number aliases within a contract row.
const NUMBER_ALIASES: &[&str] = &["num_equipement", "numero_equipement"];

/// Photo-slot field names recognized within an equipment row.
const PHOTO_SLOT_FIELDS: &[&str] = &[
    "photo_plaque",
    "photo_equipement",
    "photo_anomalie",
    "photo_generale",
];

/// Anomaly sub-fields, concatenated in this order.
const ANOMALY_FIELDS: &[&str] = &[
    "anomalie_1",
    "anomalie_2",
    "anomalie_3",
    "observations_anomalie",
];

// ─── JSON access helpers ───────────────────────────────────────────────────

/// Inner value of a named field (`fields.name.value`).
fn field_value<'a>(fields: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    fields.get(name)?.get("value")
}

/// Non-empty trimmed text of a named field.
fn field_text(fields: &JsonValue, name: &str) -> Option<String> {
    let text = field_value(fields, name)?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// First alias carrying a non-empty text value.
fn first_alias_text(fields: &JsonValue, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|name| field_text(fields, name))
}

/// Table rows of the first matching alias.
fn first_alias_rows<'a>(fields: &'a JsonValue, aliases: &[&str]) -> &'a [JsonValue] {
    aliases
        .iter()
        .find_map(|name| field_value(fields, name)?.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Parse a visit date, accepting the two formats seen in the wild.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

// ─── Record extraction ─────────────────────────────────────────────────────

/// Fixed sub-field mapping shared by contract and off-contract rows.
fn extract_attributes(row: &JsonValue) -> EquipmentAttributes {
    let anomalies: Vec<String> = ANOMALY_FIELDS
        .iter()
        .filter_map(|name| field_text(row, name))
        .collect();

    EquipmentAttributes {
        equipment_type: field_text(row, "type_equipement"),
        brand: field_text(row, "marque"),
        mode: field_text(row, "mode_manoeuvre"),
        dimensions: field_text(row, "dimensions"),
        condition: field_text(row, "etat_general"),
        anomalies: if anomalies.is_empty() {
            None
        } else {
            Some(anomalies.join(defaults::ANOMALY_SEPARATOR))
        },
        commissioning_year: field_text(row, "annee_mise_en_service"),
        serial: field_text(row, "numero_serie"),
    }
}

/// Media filenames held by one photo-slot value.
///
/// A slot carries either a single filename or an array; when the array holds
/// more than one entry, upstream stores the downloadable items with a
/// 1-based suffix.
fn slot_file_names(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        JsonValue::Array(items) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            match names.len() {
                0 => vec![],
                1 => vec![names[0].to_string()],
                _ => names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| format!("{}_{}", name, i + 1))
                    .collect(),
            }
        }
        _ => vec![],
    }
}

/// Collect media references from one equipment row.
fn extract_media(row: &JsonValue, owner: &MediaOwner, media: &mut Vec<MediaReference>) {
    for slot in PHOTO_SLOT_FIELDS {
        if let Some(value) = field_value(row, slot) {
            for file_name in slot_file_names(value) {
                media.push(MediaReference {
                    file_name,
                    owner: owner.clone(),
                });
            }
        }
    }
}

/// Extract everything from one raw submission.
///
/// Never fails: per-record defects drop the record with a debug log, and
/// missing top-level identity leaves the corresponding option empty for the
/// caller to flag.
pub fn extract(raw: &RawSubmission) -> ExtractedSubmission {
    let fields = &raw.fields;

    let mut submission = ExtractedSubmission {
        form_id: raw.form_id.clone(),
        submission_id: raw.submission_id.clone(),
        contact_id: first_alias_text(fields, CONTACT_ID_ALIASES),
        company_name: first_alias_text(fields, COMPANY_ALIASES),
        visit_date: first_alias_text(fields, VISIT_DATE_ALIASES)
            .and_then(|raw| parse_date(&raw)),
        technician_code: first_alias_text(fields, TECHNICIAN_ALIASES),
        equipment: Vec::new(),
        media: Vec::new(),
    };

    // Contract equipment: the number is mandatory identity.
    for (row_index, row) in first_alias_rows(fields, CONTRACT_TABLE_ALIASES).iter().enumerate() {
        let Some(number) = NUMBER_ALIASES.iter().find_map(|n| field_text(row, n)) else {
            debug!(
                subsystem = "ingest",
                component = "extractor",
                form_id = %raw.form_id,
                submission_id = %raw.submission_id,
                row_index,
                "Dropping contract record without equipment number"
            );
            continue;
        };
        let number = number.trim().to_uppercase();

        // The visit code rides on the number field as a hierarchical path.
        let visit_code = NUMBER_ALIASES
            .iter()
            .find_map(|n| row.get(n)?.get("path")?.as_str())
            .map(VisitCode::from_path)
            .unwrap_or_default();

        let owner = MediaOwner::Number(number.clone());
        extract_media(row, &owner, &mut submission.media);

        submission.equipment.push(ExtractedEquipment {
            identity: EquipmentIdentity::Contract { number, visit_code },
            attributes: extract_attributes(row),
        });
    }

    // Off-contract equipment: no number exists yet, the slot index is the
    // identity and the media placeholder.
    for (position_index, row) in first_alias_rows(fields, OFF_CONTRACT_TABLE_ALIASES)
        .iter()
        .enumerate()
    {
        let owner = MediaOwner::Placeholder(position_index);
        extract_media(row, &owner, &mut submission.media);

        submission.equipment.push(ExtractedEquipment {
            identity: EquipmentIdentity::OffContract { position_index },
            attributes: extract_attributes(row),
        });
    }

    submission
}

//! Off-contract equipment number generation.
//!
//! Off-contract equipment has no client number at detection time, so one is
//! synthesized: a 3-letter prefix derived from the type label plus a
//! zero-padded 2-digit sequence per (contact, prefix). The lookup-then-insert
//! sequence is a critical section; [`NumberGenerator::lock`] serializes it
//! per contact and prefix so concurrent agency batches cannot mint the same
//! number twice.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use fieldsync_core::{defaults, EquipmentRepository, Result};

/// Ordered keyword → prefix table, most specific match first.
///
/// Labels are matched by substring against the normalized type label, so
/// multi-word entries must precede the single words they contain ("porte
/// sectionnelle" before "porte").
pub const TYPE_PREFIXES: &[(&str, &str)] = &[
    ("porte sectionnelle", "SEC"),
    ("porte rapide", "RAP"),
    ("porte basculante", "BAS"),
    ("porte pietonne", "PIE"),
    ("rideau", "RID"),
    ("grille", "GRI"),
    ("portail", "PAU"),
    ("barriere", "BAR"),
    ("borne", "BOR"),
    ("porte", "POR"),
];

/// Lower-case a type label and fold diacritics (NFD decompose, strip
/// combining marks) so "Rideau Métallique" matches "rideau".
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Prefix for a type label; the generic prefix when nothing matches.
pub fn prefix_for_type(label: Option<&str>) -> &'static str {
    let Some(label) = label else {
        return defaults::GENERIC_EQUIPMENT_PREFIX;
    };
    let normalized = normalize_label(label);
    TYPE_PREFIXES
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, prefix)| *prefix)
        .unwrap_or(defaults::GENERIC_EQUIPMENT_PREFIX)
}

/// Next number in the (contact, prefix) sequence, from the highest existing
/// one. Callers must hold the matching [`NumberGenerator::lock`] across this
/// lookup and the subsequent insert.
pub async fn next_number(
    repo: &dyn EquipmentRepository,
    agency: &str,
    contact_id: &str,
    prefix: &str,
) -> Result<String> {
    let current = repo.max_number_for_prefix(agency, contact_id, prefix).await?;

    let next = match current {
        None => 1,
        Some(number) => {
            let suffix = number.strip_prefix(prefix).unwrap_or("");
            match suffix.parse::<u32>() {
                Ok(n) => n + 1,
                Err(_) => {
                    warn!(
                        subsystem = "ingest",
                        component = "numbering",
                        contact_id,
                        number,
                        "Existing number has unparsable suffix, restarting sequence"
                    );
                    1
                }
            }
        }
    };

    // Zero-padded 2-digit suffix; sequences beyond 99 are out of scope.
    Ok(format!("{prefix}{next:02}"))
}

/// Per-(contact, prefix) async locks guarding number allocation.
///
/// The map grows with the set of (contact, prefix) pairs seen and is never
/// pruned; each entry is one `Arc<Mutex<()>>`, so memory is bounded by the
/// contact population, not by throughput.
#[derive(Default)]
pub struct NumberGenerator {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the allocation lock for one (contact, prefix) sequence. The
    /// guard must be held until the new row is inserted.
    pub async fn lock(&self, contact_id: &str, prefix: &str) -> OwnedMutexGuard<()> {
        let key = format!("{contact_id}/{prefix}");
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_diacritics_and_case() {
        assert_eq!(normalize_label("Rideau Métallique"), "rideau metallique");
        assert_eq!(normalize_label("BARRIÈRE levante"), "barriere levante");
    }

    #[test]
    fn test_prefix_for_known_types() {
        assert_eq!(prefix_for_type(Some("Rideau métallique")), "RID");
        assert_eq!(prefix_for_type(Some("Portail coulissant")), "PAU");
        assert_eq!(prefix_for_type(Some("Grille de défense")), "GRI");
    }

    #[test]
    fn test_prefix_most_specific_match_wins() {
        // "porte sectionnelle" must not fall through to the bare "porte".
        assert_eq!(prefix_for_type(Some("Porte sectionnelle motorisée")), "SEC");
        assert_eq!(prefix_for_type(Some("Porte rapide souple")), "RAP");
        assert_eq!(prefix_for_type(Some("Porte de service")), "POR");
    }

    #[test]
    fn test_prefix_fallback_for_unknown_or_missing() {
        assert_eq!(prefix_for_type(Some("Quai niveleur")), "EQU");
        assert_eq!(prefix_for_type(None), "EQU");
    }

    #[test]
    fn test_table_orders_specific_before_general() {
        let porte = TYPE_PREFIXES
            .iter()
            .position(|(k, _)| *k == "porte")
            .unwrap();
        for (i, (keyword, _)) in TYPE_PREFIXES.iter().enumerate() {
            if keyword.starts_with("porte ") {
                assert!(i < porte, "{keyword} must precede the bare 'porte'");
            }
        }
    }
}

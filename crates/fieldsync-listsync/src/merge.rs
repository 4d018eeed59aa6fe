//! Two-way list merge.
//!
//! Local is authoritative for everything it tracks; upstream data unknown
//! locally is protected. The only entries ever dropped are those whose
//! identity is known to be fully archived. The merge is a pure function so
//! the safety properties are testable without any I/O.

use std::collections::HashSet;

use fieldsync_core::{ExternalListItem, MergeKey, SyncSummary};

/// Merge the fresh active set against upstream's current list.
///
/// 1. Every locally active item whose key matches upstream replaces that
///    upstream entry ("updated"); items with no upstream match are "added".
/// 2. Every remaining unmatched upstream entry is dropped if its key is in
///    the archived set ("removed"), otherwise kept verbatim ("kept").
/// 3. Output = updated/added ∪ kept.
pub fn merge(
    upstream: &[ExternalListItem],
    active: &[ExternalListItem],
    archived: &HashSet<MergeKey>,
) -> (Vec<ExternalListItem>, SyncSummary) {
    let upstream_keys: HashSet<MergeKey> = upstream.iter().map(|i| i.merge_key()).collect();
    let active_keys: HashSet<MergeKey> = active.iter().map(|i| i.merge_key()).collect();

    let mut summary = SyncSummary::default();
    let mut output = Vec::with_capacity(active.len());

    for item in active {
        if upstream_keys.contains(&item.merge_key()) {
            summary.updated += 1;
        } else {
            summary.added += 1;
        }
        output.push(item.clone());
    }

    for item in upstream {
        let key = item.merge_key();
        if active_keys.contains(&key) {
            continue; // replaced above
        }
        if archived.contains(&key) {
            summary.removed += 1;
        } else {
            // Unknown locally and not known-archived: never dropped.
            summary.kept += 1;
            output.push(item.clone());
        }
    }

    (output, summary)
}

//! Per-agency list sync: snapshot, merge, push.
//!
//! The upstream replace is a destructive full overwrite, so the pre-merge
//! upstream list is persisted to backup storage before every push.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use fieldsync_core::{
    defaults, listwire, AgencyConfig, EquipmentRepository, Error, FormsApi, ListBackupRepository,
    Result, SyncSummary,
};

use crate::builder::ListBuilder;
use crate::merge::merge;

/// Configuration for the sync runner.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Days a pre-push snapshot is retained.
    pub backup_max_age_days: i64,
    /// Snapshots kept per agency regardless of age.
    pub backup_keep_per_agency: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backup_max_age_days: defaults::BACKUP_MAX_AGE_DAYS,
            backup_keep_per_agency: defaults::BACKUP_KEEP_PER_AGENCY,
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    pub fn from_env() -> Self {
        let days = std::env::var("SYNC_BACKUP_MAX_AGE_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::BACKUP_MAX_AGE_DAYS);
        let keep = std::env::var("SYNC_BACKUP_KEEP_PER_AGENCY")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::BACKUP_KEEP_PER_AGENCY);

        Self {
            backup_max_age_days: days,
            backup_keep_per_agency: keep,
        }
    }
}

/// Runs list sync for one agency at a time, on its own schedule.
pub struct SyncRunner {
    forms: Arc<dyn FormsApi>,
    backups: Arc<dyn ListBackupRepository>,
    builder: ListBuilder,
    config: SyncConfig,
}

impl SyncRunner {
    pub fn new(
        forms: Arc<dyn FormsApi>,
        equipment: Arc<dyn EquipmentRepository>,
        backups: Arc<dyn ListBackupRepository>,
        config: SyncConfig,
    ) -> Self {
        Self {
            forms,
            backups,
            builder: ListBuilder::new(equipment),
            config,
        }
    }

    /// Merge the agency's active snapshot into its upstream list and push.
    #[instrument(skip(self, agency), fields(agency = %agency.code))]
    pub async fn run_agency(&self, agency: &AgencyConfig) -> Result<SyncSummary> {
        let start = Instant::now();
        let list_id = agency
            .list_id
            .as_deref()
            .ok_or_else(|| Error::Config(format!("agency {} has no list id", agency.code)))?;

        let raw_entries = self.forms.get_list(list_id).await?;

        // Snapshot before anything else touches the list.
        self.backups.save(&agency.code, &raw_entries).await?;

        // Undecodable upstream entries are unknown data: preserved verbatim,
        // outside the merge.
        let mut upstream = Vec::with_capacity(raw_entries.len());
        let mut preserved = Vec::new();
        for raw in &raw_entries {
            match listwire::decode(raw) {
                Ok(item) => upstream.push(item),
                Err(e) => {
                    warn!(
                        subsystem = "listsync",
                        component = "runner",
                        agency = %agency.code,
                        error = %e,
                        "Keeping undecodable upstream entry verbatim"
                    );
                    preserved.push(raw.clone());
                }
            }
        }

        let (active, archived) = self.builder.build(&agency.code).await?;
        let (merged, mut summary) = merge(&upstream, &active, &archived);

        let mut entries: Vec<String> = merged.iter().map(listwire::encode).collect();
        summary.kept += preserved.len();
        entries.extend(preserved);

        self.forms.replace_list(list_id, &entries).await?;

        let pruned = self
            .backups
            .prune(
                &agency.code,
                self.config.backup_max_age_days,
                self.config.backup_keep_per_agency,
            )
            .await?;

        info!(
            subsystem = "listsync",
            component = "runner",
            op = "run_agency",
            agency = %agency.code,
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            kept = summary.kept,
            pruned_backups = pruned,
            duration_ms = start.elapsed().as_millis() as u64,
            "Agency list sync complete"
        );
        Ok(summary)
    }
}

//! End-to-end sync runs against in-memory fakes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use fieldsync_core::{
    listwire, AgencyConfig, EquipmentAttributes, EquipmentRepository, EquipmentRow, Error,
    ExternalListItem, FormsApi, ListBackupRepository, MergeKey, NewEquipment, RawSubmission,
    Result, VisitCode,
};
use fieldsync_listsync::{SyncConfig, SyncRunner};

// ─── Fakes ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ListFormsApi {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl ListFormsApi {
    fn set_list(&self, list_id: &str, entries: Vec<String>) {
        self.lists.lock().unwrap().insert(list_id.into(), entries);
    }

    fn list(&self, list_id: &str) -> Vec<String> {
        self.lists
            .lock()
            .unwrap()
            .get(list_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FormsApi for ListFormsApi {
    async fn fetch_unread(&self, _form_id: &str, _limit: u32) -> Result<Vec<RawSubmission>> {
        Err(Error::Internal("ingest not wired in tests".into()))
    }

    async fn fetch_submission(
        &self,
        _form_id: &str,
        _submission_id: &str,
    ) -> Result<RawSubmission> {
        Err(Error::Internal("ingest not wired in tests".into()))
    }

    async fn mark_read(&self, _form_id: &str, _submission_ids: &[String]) -> Result<()> {
        Err(Error::Internal("ingest not wired in tests".into()))
    }

    async fn mark_unread(&self, _form_id: &str, _submission_ids: &[String]) -> Result<()> {
        Err(Error::Internal("ingest not wired in tests".into()))
    }

    async fn download_media(
        &self,
        _form_id: &str,
        _submission_id: &str,
        _media_name: &str,
    ) -> Result<Vec<u8>> {
        Err(Error::Internal("downloads not wired in tests".into()))
    }

    async fn download_report(&self, _form_id: &str, _submission_id: &str) -> Result<Vec<u8>> {
        Err(Error::Internal("downloads not wired in tests".into()))
    }

    async fn get_list(&self, list_id: &str) -> Result<Vec<String>> {
        Ok(self.list(list_id))
    }

    async fn replace_list(&self, list_id: &str, entries: &[String]) -> Result<()> {
        self.set_list(list_id, entries.to_vec());
        Ok(())
    }
}

/// Equipment store stub: the sync path only reads.
#[derive(Default)]
struct StubEquipmentRepository {
    active: Vec<EquipmentRow>,
    archived: Vec<MergeKey>,
}

#[async_trait]
impl EquipmentRepository for StubEquipmentRepository {
    async fn insert(&self, _equipment: NewEquipment) -> Result<Uuid> {
        Err(Error::Internal("writes not wired in tests".into()))
    }

    async fn exists_contract(
        &self,
        _agency: &str,
        _contact_id: &str,
        _number: &str,
        _visit_code: VisitCode,
        _visit_date: NaiveDate,
    ) -> Result<bool> {
        Err(Error::Internal("writes not wired in tests".into()))
    }

    async fn exists_off_contract(
        &self,
        _agency: &str,
        _form_id: &str,
        _submission_id: &str,
        _position_index: i32,
    ) -> Result<bool> {
        Err(Error::Internal("writes not wired in tests".into()))
    }

    async fn max_number_for_prefix(
        &self,
        _agency: &str,
        _contact_id: &str,
        _prefix: &str,
    ) -> Result<Option<String>> {
        Err(Error::Internal("writes not wired in tests".into()))
    }

    async fn find_off_contract_number(
        &self,
        _agency: &str,
        _form_id: &str,
        _submission_id: &str,
        _position_index: i32,
    ) -> Result<Option<String>> {
        Err(Error::Internal("writes not wired in tests".into()))
    }

    async fn list_active(&self, _agency: &str) -> Result<Vec<EquipmentRow>> {
        Ok(self.active.clone())
    }

    async fn archived_keys(&self, _agency: &str) -> Result<Vec<MergeKey>> {
        Ok(self.archived.clone())
    }
}

#[derive(Default)]
struct MemoryBackupRepository {
    saves: Mutex<Vec<(String, Vec<String>)>>,
    prunes: Mutex<Vec<(String, i64, i64)>>,
}

#[async_trait]
impl ListBackupRepository for MemoryBackupRepository {
    async fn save(&self, agency: &str, entries: &[String]) -> Result<Uuid> {
        self.saves
            .lock()
            .unwrap()
            .push((agency.to_string(), entries.to_vec()));
        Ok(Uuid::now_v7())
    }

    async fn prune(&self, agency: &str, max_age_days: i64, keep_count: i64) -> Result<u64> {
        self.prunes
            .lock()
            .unwrap()
            .push((agency.to_string(), max_age_days, keep_count));
        Ok(0)
    }
}

// ─── Fixtures ──────────────────────────────────────────────────────────────

fn agency() -> AgencyConfig {
    AgencyConfig {
        code: "LYO".into(),
        form_id: "form-7".into(),
        list_id: Some("list-12".into()),
    }
}

fn row(number: &str, visit_code: VisitCode, company: &str) -> EquipmentRow {
    EquipmentRow {
        id: Uuid::now_v7(),
        agency_code: "LYO".into(),
        contact_id: "C042".into(),
        company_name: Some(company.into()),
        number: number.into(),
        visit_code,
        visit_year: 2026,
        visit_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        is_off_contract: false,
        form_id: "form-7".into(),
        submission_id: "sub-1".into(),
        position_index: None,
        attributes: EquipmentAttributes::default(),
        archived: false,
        created_at: Utc::now(),
    }
}

fn wire(contact: &str, visit: &str, number: &str, company: &str) -> String {
    listwire::encode(&ExternalListItem {
        company: company.into(),
        visit_code: visit.into(),
        equipment_number: number.into(),
        contact_id: contact.into(),
        agency_code: "LYO".into(),
        ..Default::default()
    })
}

fn runner(
    forms: Arc<ListFormsApi>,
    equipment: StubEquipmentRepository,
    backups: Arc<MemoryBackupRepository>,
) -> SyncRunner {
    SyncRunner::new(forms, Arc::new(equipment), backups, SyncConfig::default())
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_updates_adds_removes_and_keeps() {
    let forms = Arc::new(ListFormsApi::default());
    let upstream = vec![
        wire("C042", "CE2", "SEC03", "Old Company Name"),
        wire("C999", "CE1", "XYZ01", "Someone Else"),
        wire("C042", "CE1", "RID01", "ACME"),
    ];
    forms.set_list("list-12", upstream.clone());

    let equipment = StubEquipmentRepository {
        active: vec![
            row("SEC03", VisitCode::Ce2, "New Company Name"),
            row("GRI01", VisitCode::Ce1, "New Company Name"),
        ],
        archived: vec![MergeKey {
            contact_id: "C042".into(),
            visit_code: "CE1".into(),
            equipment_number: "RID01".into(),
        }],
    };
    let backups = Arc::new(MemoryBackupRepository::default());
    let runner = runner(forms.clone(), equipment, backups.clone());

    let summary = runner.run_agency(&agency()).await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.kept, 1);

    let pushed = forms.list("list-12");
    assert_eq!(pushed.len(), 3);
    assert!(pushed
        .iter()
        .any(|e| e.contains("SEC03") && e.contains("New Company Name")));
    assert!(pushed.iter().any(|e| e.contains("GRI01")));
    // Foreign entry preserved verbatim, archived entry gone.
    assert!(pushed.contains(&upstream[1]));
    assert!(!pushed.iter().any(|e| e.contains("RID01")));

    // Snapshot captured the pre-push upstream state.
    let saves = backups.saves.lock().unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0, "LYO");
    assert_eq!(saves[0].1, upstream);

    let prunes = backups.prunes.lock().unwrap();
    assert_eq!(prunes.len(), 1);
}

#[tokio::test]
async fn undecodable_upstream_entries_survive_the_push() {
    let forms = Arc::new(ListFormsApi::default());
    let garbage = "some legacy entry that is not pipe formatted".to_string();
    forms.set_list("list-12", vec![garbage.clone()]);

    let equipment = StubEquipmentRepository {
        active: vec![row("SEC03", VisitCode::Ce2, "ACME")],
        archived: vec![],
    };
    let backups = Arc::new(MemoryBackupRepository::default());
    let runner = runner(forms.clone(), equipment, backups);

    let summary = runner.run_agency(&agency()).await.unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.kept, 1);
    let pushed = forms.list("list-12");
    assert!(pushed.contains(&garbage));
}

#[tokio::test]
async fn agency_without_list_id_is_rejected() {
    let forms = Arc::new(ListFormsApi::default());
    let backups = Arc::new(MemoryBackupRepository::default());
    let runner = runner(forms, StubEquipmentRepository::default(), backups);

    let no_list = AgencyConfig {
        list_id: None,
        ..agency()
    };
    let err = runner.run_agency(&no_list).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

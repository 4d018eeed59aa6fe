//! Equipment repository implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fieldsync_core::{
    EquipmentAttributes, EquipmentRepository, EquipmentRow, Error, MergeKey, NewEquipment, Result,
    VisitCode,
};

/// PostgreSQL implementation of EquipmentRepository.
///
/// A single `equipment` table serves every agency, partitioned by the
/// `agency_code` column.
pub struct PgEquipmentRepository {
    pool: Pool<Postgres>,
}

impl PgEquipmentRepository {
    /// Create a new PgEquipmentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse an equipment row into an EquipmentRow struct.
    fn parse_row(row: sqlx::postgres::PgRow) -> EquipmentRow {
        let visit_code: String = row.get("visit_code");
        EquipmentRow {
            id: row.get("id"),
            agency_code: row.get("agency_code"),
            contact_id: row.get("contact_id"),
            company_name: row.get("company_name"),
            number: row.get("number"),
            visit_code: VisitCode::parse(&visit_code).unwrap_or_default(),
            visit_year: row.get("visit_year"),
            visit_date: row.get("visit_date"),
            is_off_contract: row.get("is_off_contract"),
            form_id: row.get("form_id"),
            submission_id: row.get("submission_id"),
            position_index: row.get("position_index"),
            attributes: EquipmentAttributes {
                equipment_type: row.get("equipment_type"),
                brand: row.get("brand"),
                mode: row.get("mode"),
                dimensions: row.get("dimensions"),
                condition: row.get("condition"),
                anomalies: row.get("anomalies"),
                commissioning_year: row.get("commissioning_year"),
                serial: row.get("serial"),
            },
            archived: row.get("archived"),
            created_at: row.get("created_at"),
        }
    }
}

const EQUIPMENT_COLUMNS: &str = "id, agency_code, contact_id, company_name, number, visit_code,
    visit_year, visit_date, is_off_contract, form_id, submission_id, position_index,
    equipment_type, brand, mode, dimensions, condition, anomalies, commissioning_year,
    serial, archived, created_at";

#[async_trait]
impl EquipmentRepository for PgEquipmentRepository {
    async fn insert(&self, equipment: NewEquipment) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO equipment (id, agency_code, contact_id, company_name, number,
                 visit_code, visit_year, visit_date, is_off_contract, form_id, submission_id,
                 position_index, equipment_type, brand, mode, dimensions, condition, anomalies,
                 commissioning_year, serial, archived, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19, $20, false, $21)",
        )
        .bind(id)
        .bind(&equipment.agency_code)
        .bind(&equipment.contact_id)
        .bind(&equipment.company_name)
        .bind(&equipment.number)
        .bind(equipment.visit_code.as_str())
        .bind(equipment.visit_year)
        .bind(equipment.visit_date)
        .bind(equipment.is_off_contract)
        .bind(&equipment.form_id)
        .bind(&equipment.submission_id)
        .bind(equipment.position_index)
        .bind(&equipment.attributes.equipment_type)
        .bind(&equipment.attributes.brand)
        .bind(&equipment.attributes.mode)
        .bind(&equipment.attributes.dimensions)
        .bind(&equipment.attributes.condition)
        .bind(&equipment.attributes.anomalies)
        .bind(&equipment.attributes.commissioning_year)
        .bind(&equipment.attributes.serial)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn exists_contract(
        &self,
        agency: &str,
        contact_id: &str,
        number: &str,
        visit_code: VisitCode,
        visit_date: NaiveDate,
    ) -> Result<bool> {
        // Date-component equality only; upstream timestamps are not stable
        // across re-deliveries.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM equipment
                 WHERE agency_code = $1 AND contact_id = $2 AND number = $3
                   AND visit_code = $4 AND visit_date = $5
                   AND is_off_contract = false
             )",
        )
        .bind(agency)
        .bind(contact_id)
        .bind(number)
        .bind(visit_code.as_str())
        .bind(visit_date)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(exists)
    }

    async fn exists_off_contract(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM equipment
                 WHERE agency_code = $1 AND form_id = $2 AND submission_id = $3
                   AND position_index = $4 AND is_off_contract = true
             )",
        )
        .bind(agency)
        .bind(form_id)
        .bind(submission_id)
        .bind(position_index)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(exists)
    }

    async fn max_number_for_prefix(
        &self,
        agency: &str,
        contact_id: &str,
        prefix: &str,
    ) -> Result<Option<String>> {
        // Numbers are zero-padded to a fixed width, so lexicographic order
        // matches numeric order.
        let number: Option<String> = sqlx::query_scalar(
            "SELECT number FROM equipment
             WHERE agency_code = $1 AND contact_id = $2
               AND is_off_contract = true AND number LIKE $3 || '%'
             ORDER BY number DESC
             LIMIT 1",
        )
        .bind(agency)
        .bind(contact_id)
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(number)
    }

    async fn find_off_contract_number(
        &self,
        agency: &str,
        form_id: &str,
        submission_id: &str,
        position_index: i32,
    ) -> Result<Option<String>> {
        let number: Option<String> = sqlx::query_scalar(
            "SELECT number FROM equipment
             WHERE agency_code = $1 AND form_id = $2 AND submission_id = $3
               AND position_index = $4 AND is_off_contract = true
             LIMIT 1",
        )
        .bind(agency)
        .bind(form_id)
        .bind(submission_id)
        .bind(position_index)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(number)
    }

    async fn list_active(&self, agency: &str) -> Result<Vec<EquipmentRow>> {
        let query = format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment
             WHERE agency_code = $1 AND archived = false
             ORDER BY contact_id, number"
        );
        let rows = sqlx::query(&query)
            .bind(agency)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    async fn archived_keys(&self, agency: &str) -> Result<Vec<MergeKey>> {
        // Fully archived only: an identity with any remaining active row is
        // still live and must never be reported as removable.
        let rows = sqlx::query(
            "SELECT DISTINCT e.contact_id, e.visit_code, e.number
             FROM equipment e
             WHERE e.agency_code = $1 AND e.archived = true
               AND NOT EXISTS (
                   SELECT 1 FROM equipment a
                   WHERE a.agency_code = e.agency_code
                     AND a.contact_id = e.contact_id
                     AND a.visit_code = e.visit_code
                     AND a.number = e.number
                     AND a.archived = false
               )",
        )
        .bind(agency)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| MergeKey {
                contact_id: row.get("contact_id"),
                visit_code: row.get("visit_code"),
                equipment_number: row.get("number"),
            })
            .collect())
    }
}

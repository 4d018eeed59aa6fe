//! Builds the full active-equipment snapshot for one agency.

use std::collections::HashSet;
use std::sync::Arc;

use fieldsync_core::{
    EquipmentRepository, EquipmentRow, ExternalListItem, MergeKey, Result,
};

/// One serialized-list entry per currently-active equipment row.
pub fn item_from_row(row: &EquipmentRow) -> ExternalListItem {
    ExternalListItem {
        company: row.company_name.clone().unwrap_or_default(),
        visit_code: row.visit_code.as_str().to_string(),
        equipment_number: row.number.clone(),
        equipment_type: row.attributes.equipment_type.clone().unwrap_or_default(),
        commissioning_year: row.attributes.commissioning_year.clone().unwrap_or_default(),
        serial: row.attributes.serial.clone().unwrap_or_default(),
        brand: row.attributes.brand.clone().unwrap_or_default(),
        dimensions: row.attributes.dimensions.clone().unwrap_or_default(),
        contact_id: row.contact_id.clone(),
        company_id: String::new(),
        agency_code: row.agency_code.clone(),
    }
}

/// Builds the active set and the fully-archived identity set.
pub struct ListBuilder {
    equipment: Arc<dyn EquipmentRepository>,
}

impl ListBuilder {
    pub fn new(equipment: Arc<dyn EquipmentRepository>) -> Self {
        Self { equipment }
    }

    /// Active list entries plus the archived identities the merger may drop.
    pub async fn build(
        &self,
        agency: &str,
    ) -> Result<(Vec<ExternalListItem>, HashSet<MergeKey>)> {
        let active = self
            .equipment
            .list_active(agency)
            .await?
            .iter()
            .map(item_from_row)
            .collect();

        let archived = self
            .equipment
            .archived_keys(agency)
            .await?
            .into_iter()
            .collect();

        Ok((active, archived))
    }
}

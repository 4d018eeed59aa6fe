//! Wire codec for external list entries.
//!
//! The upstream list holds one serialized string per equipment item:
//! pipe-separated segments, each `label:value`. Segment 1 is itself
//! backslash-separated sub-keys carrying the merge identity
//! (`company:…\visitcode:…\equipnum:…`); the remaining eight segments
//! (type, commissioning year, serial, brand, dimensions, contact id,
//! company id, agency code) each repeat the value as the label. An empty
//! value serializes as a bare `:`.
//!
//! The format is positional and delimiter-based, so encode/decode live here
//! as one pure pair instead of ad hoc parsing at call sites. Values must not
//! contain `|`, `\` or `:`; upstream enforces this on entry.

use crate::error::{Error, Result};
use crate::models::ExternalListItem;

/// Number of pipe-separated segments in a well-formed entry.
const SEGMENT_COUNT: usize = 9;

/// Serialize one list item to its wire form.
pub fn encode(item: &ExternalListItem) -> String {
    let head = format!(
        "company:{}\\visitcode:{}\\equipnum:{}",
        item.company, item.visit_code, item.equipment_number
    );
    let tail = [
        &item.equipment_type,
        &item.commissioning_year,
        &item.serial,
        &item.brand,
        &item.dimensions,
        &item.contact_id,
        &item.company_id,
        &item.agency_code,
    ]
    .map(|v| format!("{v}:{v}"));

    let mut out = head;
    for seg in tail {
        out.push('|');
        out.push_str(&seg);
    }
    out
}

/// Parse one wire entry back into a list item.
pub fn decode(raw: &str) -> Result<ExternalListItem> {
    let segments: Vec<&str> = raw.split('|').collect();
    if segments.len() != SEGMENT_COUNT {
        return Err(Error::ListFormat(format!(
            "expected {} segments, got {}",
            SEGMENT_COUNT,
            segments.len()
        )));
    }

    let mut item = ExternalListItem::default();
    for sub in segments[0].split('\\') {
        let (label, value) = sub
            .split_once(':')
            .ok_or_else(|| Error::ListFormat(format!("sub-key without separator: {sub}")))?;
        match label {
            "company" => item.company = value.to_string(),
            "visitcode" => item.visit_code = value.to_string(),
            "equipnum" => item.equipment_number = value.to_string(),
            other => {
                return Err(Error::ListFormat(format!("unknown sub-key: {other}")));
            }
        }
    }

    let mut values = Vec::with_capacity(SEGMENT_COUNT - 1);
    for seg in &segments[1..] {
        let (_, value) = seg
            .split_once(':')
            .ok_or_else(|| Error::ListFormat(format!("segment without separator: {seg}")))?;
        values.push(value.to_string());
    }
    // Order is fixed by the wire format; length was checked above.
    let [equipment_type, commissioning_year, serial, brand, dimensions, contact_id, company_id, agency_code] =
        <[String; 8]>::try_from(values)
            .map_err(|_| Error::ListFormat("segment count mismatch".into()))?;
    item.equipment_type = equipment_type;
    item.commissioning_year = commissioning_year;
    item.serial = serial;
    item.brand = brand;
    item.dimensions = dimensions;
    item.contact_id = contact_id;
    item.company_id = company_id;
    item.agency_code = agency_code;

    Ok(item)
}

// ── API-to-domain type conversions ──
//
// Bridges raw `emberlink_api` discovery records into canonical domain
// types, normalizing empty strings to proper absences.

use emberlink_api::models::GrillRecord;

use crate::model::GrillDevice;

impl From<GrillRecord> for GrillDevice {
    fn from(record: GrillRecord) -> Self {
        Self {
            id: record.grill_id,
            connection_type: record.connection_type,
            name: record.grill_name.filter(|n| !n.trim().is_empty()),
            model: record.ble_name.filter(|n| !n.trim().is_empty()),
        }
    }
}

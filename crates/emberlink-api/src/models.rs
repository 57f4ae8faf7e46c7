// Cloud API response types
//
// The discovery endpoint returns JSON; per-grill state is a plaintext
// frame handled by `codec::status`. Fields use `#[serde(default)]`
// liberally because the cloud is inconsistent about field presence
// across firmware and account generations.

use serde::{Deserialize, Serialize};

/// One grill record from `GET /grill`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrillRecord {
    #[serde(default)]
    pub grill_id: String,
    #[serde(default)]
    pub grill_name: Option<String>,
    /// Transport the grill uses to reach the cloud. Older accounts omit
    /// it; `"remote"` is what the mobile app assumes.
    #[serde(default = "default_connection_type")]
    pub connection_type: String,
    /// Bluetooth advertising name, doubling as the hardware model label.
    #[serde(default)]
    pub ble_name: Option<String>,
    /// Raw sort key (`Grill|{connectionType}|{grillId}`), kept for
    /// diagnostics.
    #[serde(default)]
    pub sk: Option<String>,
}

fn default_connection_type() -> String {
    "remote".to_owned()
}

impl GrillRecord {
    /// The composite key used in state/command endpoint paths.
    pub fn path_key(&self) -> String {
        format!("{}|{}", self.connection_type, self.grill_id)
    }
}

use serde::{Deserialize, Serialize};

// ── Machines ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMachineRequest {
    pub machine_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineRequest {
    pub cloudspace_id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_id: Option<i64>,
    pub image_id: i64,
    pub disksize: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userdata: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMachineRequest {
    pub machine_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeMachineRequest {
    pub machine_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMachineRequest {
    pub machine_id: i64,
    pub permanently: bool,
}

/// Machine record as returned by `machines/get`.
///
/// The control plane mixes lowercase and camelCase keys, so most fields carry
/// an explicit rename.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineInfo {
    pub id: i64,
    #[serde(rename = "cloudspaceid")]
    pub cloudspace_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(rename = "updateTime", default)]
    pub update_time: f64,
    #[serde(rename = "creationTime", default)]
    pub creation_time: f64,
    #[serde(rename = "sizeid", default)]
    pub size_id: i64,
    #[serde(rename = "imageid", default)]
    pub image_id: i64,
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub vcpus: i64,
    #[serde(default)]
    pub storage: i64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub disks: Vec<MachineDisk>,
    #[serde(default)]
    pub accounts: Vec<MachineAccount>,
    #[serde(default)]
    pub interfaces: Vec<MachineInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineDisk {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "descr", default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub disk_type: String,
    #[serde(rename = "sizeMax", default)]
    pub size_max: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineAccount {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub guid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInterface {
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub network_id: Option<i64>,
    #[serde(default)]
    pub status: String,
}

// ── Disks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeDiskRequest {
    pub disk_id: i64,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitDiskIoRequest {
    pub disk_id: i64,
    pub iops: i64,
}

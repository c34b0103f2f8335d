//! Mapping of OVC wire records into [`ActualState`].

use chrono::{DateTime, Utc};
use ovc_api::{MachineDisk, MachineInfo};

use crate::types::{ActualState, DiskInfo, MachineId};

/// Flatten remote disk records in the order the control plane reports them.
/// Non-boot disks are kept.
pub fn flatten_disks(disks: &[MachineDisk]) -> Vec<DiskInfo> {
    disks
        .iter()
        .map(|disk| DiskInfo {
            id: disk.id,
            status: disk.status.clone(),
            name: disk.name.clone(),
            description: disk.description.clone(),
            kind: disk.disk_type.clone(),
            size_max: disk.size_max,
        })
        .collect()
}

/// OVC reports fractional epoch seconds, with `0` for "never".
fn timestamp(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

pub fn actual_state(info: MachineInfo) -> ActualState {
    let (username, password) = info
        .accounts
        .first()
        .map(|account| (account.login.clone(), account.password.clone()))
        .unwrap_or_default();

    let ip_address = info
        .interfaces
        .first()
        .map(|iface| iface.ip_address.clone())
        .unwrap_or_default();

    ActualState {
        id: MachineId(info.id.to_string()),
        cloudspace_id: info.cloudspace_id,
        disks: flatten_disks(&info.disks),
        name: info.name,
        description: info.description,
        hostname: info.hostname,
        status: info.status,
        update_time: timestamp(info.update_time),
        creation_time: timestamp(info.creation_time),
        username,
        password,
        ip_address,
        memory: info.memory,
        vcpus: info.vcpus,
        size_id: info.size_id,
        image_id: info.image_id,
    }
}

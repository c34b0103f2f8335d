use tracing::warn;

use crate::types::ActualState;
use crate::{Error, Result};

/// Find the boot disk among already-fetched machine state.
///
/// A machine should carry exactly one boot disk. If the control plane reports
/// several, the one with the lowest id is chosen.
pub fn resolve_boot_disk(state: &ActualState) -> Result<i64> {
    let mut boot = state.disks.iter().filter(|disk| disk.is_boot()).map(|disk| disk.id);

    let Some(first) = boot.next() else {
        return Err(Error::NoBootDisk {
            machine: state.id.to_string(),
        });
    };

    let mut chosen = first;
    let mut count = 1;
    for id in boot {
        chosen = chosen.min(id);
        count += 1;
    }

    if count > 1 {
        warn!(machine_id = %state.id, count, disk_id = chosen, "multiple boot disks reported, using lowest id");
    }

    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiskInfo, MachineId};

    fn disk(id: i64, kind: &str) -> DiskInfo {
        DiskInfo {
            id,
            status: "ASSIGNED".into(),
            name: format!("disk-{id}"),
            description: String::new(),
            kind: kind.into(),
            size_max: 20,
        }
    }

    fn state(disks: Vec<DiskInfo>) -> ActualState {
        ActualState {
            id: MachineId("42".into()),
            cloudspace_id: 1,
            name: "web1".into(),
            description: String::new(),
            hostname: String::new(),
            status: "RUNNING".into(),
            update_time: None,
            creation_time: None,
            username: String::new(),
            password: String::new(),
            ip_address: String::new(),
            memory: 1024,
            vcpus: 2,
            size_id: 0,
            image_id: 7,
            disks,
        }
    }

    #[test]
    fn finds_single_boot_disk_regardless_of_position() {
        for position in 0..5 {
            let mut disks: Vec<DiskInfo> = (100..104).map(|id| disk(id, "D")).collect();
            disks.insert(position, disk(7, "B"));
            assert_eq!(resolve_boot_disk(&state(disks)).unwrap(), 7);
        }
    }

    #[test]
    fn only_boot_disk() {
        assert_eq!(resolve_boot_disk(&state(vec![disk(9, "B")])).unwrap(), 9);
    }

    #[test]
    fn no_boot_disk_is_an_error() {
        let err = resolve_boot_disk(&state(vec![disk(1, "D"), disk(2, "D")])).unwrap_err();
        assert!(matches!(err, Error::NoBootDisk { ref machine } if machine == "42"));

        let err = resolve_boot_disk(&state(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::NoBootDisk { .. }));
    }

    #[test]
    fn multiple_boot_disks_pick_lowest_id() {
        let disks = vec![disk(30, "B"), disk(5, "D"), disk(12, "B")];
        assert_eq!(resolve_boot_disk(&state(disks)).unwrap(), 12);
    }
}

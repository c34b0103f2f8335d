use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::diff::{self, ChangeSet, Field, OperationGroup};
use crate::disk::resolve_boot_disk;
use crate::guard;
use crate::types::{ActualState, DesiredConfig, DiskUpdate, MachineId, MachineSpec};
use crate::{MachineGateway, Result};

/// Drives a single machine from its current remote state towards a desired
/// configuration.
///
/// Each method is one reconciliation pass. Remote calls within a pass are
/// awaited strictly in sequence; the reconciler itself keeps no state between
/// passes, so one instance may serve any number of machines concurrently.
#[derive(Clone)]
pub struct Reconciler {
    gateway: Arc<dyn MachineGateway>,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn MachineGateway>) -> Self {
        Self { gateway }
    }

    /// Advisory existence check.
    ///
    /// Every lookup error, not only "not found", is discarded and reported as
    /// `false`. Callers that need to tell a missing machine from an
    /// unreachable control plane should use [`Reconciler::read`].
    pub async fn exists(&self, id: &MachineId) -> bool {
        match self.gateway.get_machine(id).await {
            Ok(_) => true,
            Err(e) => {
                debug!(machine_id = %id, error = %e, "existence check failed, reporting absent");
                false
            }
        }
    }

    /// Refresh the machine's state. `Ok(None)` means the machine no longer
    /// exists and the caller should drop its record.
    pub async fn read(&self, id: &MachineId) -> Result<Option<ActualState>> {
        match self.gateway.get_machine(id).await {
            Ok(state) => Ok(Some(state)),
            Err(e) if e.is_not_found() => {
                info!(machine_id = %id, "machine not found, dropping record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create the machine, then apply the boot disk IO limit if one is
    /// requested.
    ///
    /// If the IO limit step fails the machine still exists remotely; the
    /// error names its id and nothing is rolled back.
    pub async fn create(&self, desired: &DesiredConfig) -> Result<(MachineId, ActualState)> {
        let id = self.gateway.create_machine(desired).await?;
        info!(machine_id = %id, name = %desired.name, "machine created");

        if let Some(iops) = desired.iops {
            let state = self.gateway.get_machine(&id).await?;
            let disk_id = resolve_boot_disk(&state)?;
            self.gateway
                .update_disk(&id, disk_id, &DiskUpdate { size: None, iops: Some(iops) })
                .await?;
            info!(machine_id = %id, disk_id, iops, "boot disk io limit applied");
        }

        let state = self.gateway.get_machine(&id).await?;
        Ok((id, state))
    }

    /// Converge an existing machine from `prior`, the configuration applied
    /// by the previous pass, to `desired`.
    ///
    /// Immutable fields are checked before any remote call. Changed groups
    /// are applied in the order metadata, resize, disk; the first failure
    /// aborts the pass and leaves earlier groups applied.
    pub async fn update(&self, id: &MachineId, prior: &DesiredConfig, desired: &DesiredConfig) -> Result<ActualState> {
        guard::check_update(id, prior, desired)?;

        let changes = ChangeSet::between(prior, desired);
        if changes.contains(Field::Userdata) {
            warn!(machine_id = %id, "userdata only applies at creation, ignoring change");
        }

        let groups = diff::classify(&changes, desired);
        debug!(machine_id = %id, changed = ?changes.iter().collect::<Vec<_>>(), groups = groups.len(), "update planned");

        for group in &groups {
            self.apply(id, group).await?;
        }

        self.gateway.get_machine(id).await
    }

    async fn apply(&self, id: &MachineId, group: &OperationGroup) -> Result<()> {
        match group {
            OperationGroup::Metadata { name, description } => {
                self.gateway.update_machine_metadata(id, name, description).await?;
            }
            OperationGroup::Resize(sizing) => {
                self.gateway.resize_machine(id, sizing).await?;
            }
            OperationGroup::Disk(update) => {
                let state = self.gateway.get_machine(id).await?;
                let disk_id = resolve_boot_disk(&state)?;
                self.gateway.update_disk(id, disk_id, update).await?;
            }
        }
        info!(machine_id = %id, group = group.label(), "operation group applied");
        Ok(())
    }

    /// Permanently delete the machine.
    pub async fn delete(&self, id: &MachineId) -> Result<()> {
        self.gateway.delete_machine(id, true).await?;
        info!(machine_id = %id, "machine deleted");
        Ok(())
    }

    /// Adopt an existing machine: read it and reconstruct the configuration
    /// it currently satisfies, to serve as `prior` for the next update.
    pub async fn import(&self, id: &MachineId) -> Result<(ActualState, DesiredConfig)> {
        let state = self.gateway.get_machine(id).await?;
        let config = imported_config(&state)?;
        info!(machine_id = %id, "machine imported");
        Ok((state, config))
    }
}

/// Configuration equivalent to what the machine currently runs.
///
/// A reported size id takes precedence over memory/vcpus. IO limits and
/// userdata are not observable and are left unset. The result goes through
/// the same validation as user input, so a machine reporting e.g. no image
/// or zero memory fails with [`crate::Error::ValidationFailed`].
pub fn imported_config(state: &ActualState) -> Result<DesiredConfig> {
    let boot_disk = resolve_boot_disk(state)?;
    let disksize = state
        .disks
        .iter()
        .find(|disk| disk.id == boot_disk)
        .map(|disk| disk.size_max)
        .unwrap_or_default();

    let (size_id, memory, vcpus) = if state.size_id > 0 {
        (Some(state.size_id), None, None)
    } else {
        (None, Some(state.memory), Some(state.vcpus))
    };

    DesiredConfig::try_from(MachineSpec {
        cloudspace_id: state.cloudspace_id,
        name: state.name.clone(),
        description: state.description.clone(),
        size_id,
        memory,
        vcpus,
        image_id: state.image_id,
        disksize,
        iops: None,
        userdata: None,
    })
}

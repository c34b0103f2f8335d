//! Local checks that run before any remote call of an update pass.

use crate::types::{DesiredConfig, MachineId};
use crate::{Error, Result};

pub fn check_immutable(machine: &MachineId, field: &'static str, existing: i64, desired: i64) -> Result<()> {
    if existing == desired {
        return Ok(());
    }
    Err(Error::ImmutableFieldChanged {
        machine: machine.to_string(),
        field,
        existing,
        desired,
    })
}

/// Reject changes to fields fixed at creation: the boot image and the
/// cloudspace the machine lives in.
pub fn check_update(machine: &MachineId, prior: &DesiredConfig, desired: &DesiredConfig) -> Result<()> {
    check_immutable(machine, "image_id", prior.image_id, desired.image_id)?;
    check_immutable(machine, "cloudspace_id", prior.cloudspace_id, desired.cloudspace_id)
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Disk type tag the control plane uses for a machine's boot disk.
pub const BOOT_DISK_TYPE: &str = "B";

/// Opaque remote machine identifier, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a machine's compute capacity is expressed. Exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMode {
    /// A named size from the control plane's catalogue.
    BySizeId(i64),
    /// Explicit memory (MiB) and vCPU count.
    ByResources { memory: i64, vcpus: i64 },
}

/// Machine configuration as written by the user, before validation.
///
/// Sizing fields are independent options here; converting into
/// [`DesiredConfig`] enforces that exactly one sizing mode is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub cloudspace_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<i64>,
    pub image_id: i64,
    pub disksize: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userdata: Option<String>,
}

/// Validated desired state for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MachineSpec", into = "MachineSpec")]
pub struct DesiredConfig {
    pub cloudspace_id: i64,
    pub name: String,
    pub description: String,
    pub sizing: SizingMode,
    pub image_id: i64,
    pub disksize: i64,
    pub iops: Option<i64>,
    pub userdata: Option<String>,
}

fn require_positive(field: &str, value: i64) -> Result<i64, Error> {
    if value > 0 {
        Ok(value)
    } else {
        Err(Error::ValidationFailed(format!("{field} must be positive, got {value}")))
    }
}

impl TryFrom<MachineSpec> for DesiredConfig {
    type Error = Error;

    fn try_from(spec: MachineSpec) -> Result<Self, Error> {
        if spec.name.trim().is_empty() {
            return Err(Error::ValidationFailed("name must not be empty".into()));
        }

        let sizing = match (spec.size_id, spec.memory, spec.vcpus) {
            (Some(size_id), None, None) => SizingMode::BySizeId(require_positive("size_id", size_id)?),
            (None, Some(memory), Some(vcpus)) => SizingMode::ByResources {
                memory: require_positive("memory", memory)?,
                vcpus: require_positive("vcpus", vcpus)?,
            },
            (Some(_), _, _) => {
                return Err(Error::ValidationFailed(
                    "size_id conflicts with memory and vcpus; set only one sizing mode".into(),
                ));
            }
            (None, None, None) => {
                return Err(Error::ValidationFailed(
                    "either size_id or both memory and vcpus must be set".into(),
                ));
            }
            (None, _, _) => {
                return Err(Error::ValidationFailed(
                    "memory and vcpus must be set together".into(),
                ));
            }
        };

        if let Some(iops) = spec.iops {
            require_positive("iops", iops)?;
        }

        Ok(Self {
            cloudspace_id: require_positive("cloudspace_id", spec.cloudspace_id)?,
            name: spec.name,
            description: spec.description,
            sizing,
            image_id: require_positive("image_id", spec.image_id)?,
            disksize: require_positive("disksize", spec.disksize)?,
            iops: spec.iops,
            userdata: spec.userdata,
        })
    }
}

impl From<DesiredConfig> for MachineSpec {
    fn from(config: DesiredConfig) -> Self {
        let (size_id, memory, vcpus) = match config.sizing {
            SizingMode::BySizeId(id) => (Some(id), None, None),
            SizingMode::ByResources { memory, vcpus } => (None, Some(memory), Some(vcpus)),
        };
        Self {
            cloudspace_id: config.cloudspace_id,
            name: config.name,
            description: config.description,
            size_id,
            memory,
            vcpus,
            image_id: config.image_id,
            disksize: config.disksize,
            iops: config.iops,
            userdata: config.userdata,
        }
    }
}

/// A disk attached to a machine, as last observed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub id: i64,
    pub status: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size_max: i64,
}

impl DiskInfo {
    pub fn is_boot(&self) -> bool {
        self.kind == BOOT_DISK_TYPE
    }
}

/// Remote truth for a machine. Every field is overwritten on each read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualState {
    pub id: MachineId,
    pub cloudspace_id: i64,
    pub name: String,
    pub description: String,
    pub hostname: String,
    pub status: String,
    pub update_time: Option<DateTime<Utc>>,
    pub creation_time: Option<DateTime<Utc>>,
    pub username: String,
    pub password: String,
    pub ip_address: String,
    pub memory: i64,
    pub vcpus: i64,
    pub size_id: i64,
    pub image_id: i64,
    pub disks: Vec<DiskInfo>,
}

/// Requested change to a single disk. `None` leaves the attribute untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUpdate {
    pub size: Option<i64>,
    pub iops: Option<i64>,
}

impl DiskUpdate {
    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.iops.is_none()
    }
}

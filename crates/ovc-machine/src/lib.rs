pub mod config;
pub mod diff;
pub mod disk;
pub mod engine;
pub mod gateway;
pub mod guard;
pub mod normalize;
pub mod types;

use async_trait::async_trait;

pub use engine::Reconciler;
pub use types::{ActualState, DesiredConfig, DiskInfo, DiskUpdate, MachineId, MachineSpec, SizingMode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid machine configuration: {0}")]
    ValidationFailed(String),

    #[error("machine {machine}: {field} cannot be changed on an existing machine ({existing} -> {desired})")]
    ImmutableFieldChanged {
        machine: String,
        field: &'static str,
        existing: i64,
        desired: i64,
    },

    #[error("machine {machine} has no boot disk")]
    NoBootDisk { machine: String },

    #[error("machine {machine} not found")]
    NotFound { machine: String },

    #[error("{operation} rejected for machine {machine}: {message}")]
    RemoteRejected {
        operation: &'static str,
        machine: String,
        message: String,
    },

    #[error("{operation} failed for machine {machine}: {message}")]
    TransientIo {
        operation: &'static str,
        machine: String,
        message: String,
    },

    #[error("invalid machine id: {0}")]
    InvalidId(String),

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("invalid value for env var {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("ovc client setup failed: {0}")]
    Client(#[source] ovc_api::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Access to the remote control plane for a single machine.
///
/// Implementations own transport, authentication and retry policy. The
/// reconciler awaits each call before issuing the next one and never assumes
/// `create_machine` is idempotent. `get_machine`, `resize_machine` and
/// `update_disk` must be safe to retry.
#[async_trait]
pub trait MachineGateway: Send + Sync + 'static {
    /// Fetch and normalize the current remote state. A missing machine is
    /// reported as [`Error::NotFound`].
    async fn get_machine(&self, id: &MachineId) -> Result<ActualState>;

    /// Create the base machine and return its remote identifier.
    async fn create_machine(&self, config: &DesiredConfig) -> Result<MachineId>;

    async fn update_machine_metadata(&self, id: &MachineId, name: &str, description: &str) -> Result<()>;

    async fn resize_machine(&self, id: &MachineId, sizing: &SizingMode) -> Result<()>;

    /// Apply a size and/or IO limit change to one of the machine's disks.
    ///
    /// Size and IO limit may be separate remote requests. When both are set
    /// and the second fails, the first stays applied; the error message says
    /// so.
    async fn update_disk(&self, id: &MachineId, disk_id: i64, update: &DiskUpdate) -> Result<()>;

    async fn delete_machine(&self, id: &MachineId, permanently: bool) -> Result<()>;
}

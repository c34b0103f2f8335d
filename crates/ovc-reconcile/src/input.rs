use std::path::Path;

use anyhow::Context;
use ovc_machine::{DesiredConfig, MachineSpec};

/// Parse a JSON machine spec and validate it into a [`DesiredConfig`].
pub fn parse_config(raw: &str) -> anyhow::Result<DesiredConfig> {
    let spec: MachineSpec = serde_json::from_str(raw).context("malformed machine spec")?;
    Ok(DesiredConfig::try_from(spec)?)
}

pub fn load_config(path: &Path) -> anyhow::Result<DesiredConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid machine spec in {}", path.display()))
}

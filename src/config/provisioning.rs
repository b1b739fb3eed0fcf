use crate::agreement::Agreement;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Startup provisioning file: the initial agreement set plus device token
/// registrations, in TOML. Agreements use the same camelCase field names as
/// the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningFile {
    #[serde(default)]
    pub agreements: Vec<Agreement>,
    #[serde(default)]
    pub device_tokens: HashMap<String, String>,
}

/// Load and parse a provisioning file.
pub fn load_provisioning(path: &str) -> Result<ProvisioningFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read provisioning file at {}", path))?;
    let file: ProvisioningFile = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse provisioning file at {}", path))?;
    Ok(file)
}

use std::path::Path;

use anyhow::{Context, Result};
use replica::NetworkConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Remote clients joining the host.
    pub clients: usize,
    pub rounds: u32,
    /// Kills needed before a trophy is spawned for the shooter.
    pub trophy_kills: i32,
    pub network: NetworkConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            clients: 3,
            rounds: 90,
            trophy_kills: 10,
            network: NetworkConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

use serde::{Deserialize, Serialize};

use crate::wire::DEFAULT_MAX_MESSAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_connections: usize,
    /// Upper bound for a single encoded frame, in bytes.
    pub max_message_size: usize,
    /// Pending calls applied per role per tick.
    pub apply_batch: usize,
    pub tick_rate: u32,
    /// Prefab spawned for every new connection when no spawn policy is set.
    pub player_prefab: Option<usize>,
    pub disconnect_on_violation: bool,
    pub server_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            apply_batch: 64,
            tick_rate: crate::DEFAULT_TICK_RATE,
            player_prefab: None,
            disconnect_on_violation: false,
            server_address: "127.0.0.1".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.max_message_size, 16 * 1024);
        assert!(!config.disconnect_on_violation);
    }

    #[test]
    fn tick_interval_guards_zero_rate() {
        let config = NetworkConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), std::time::Duration::from_secs(1));
    }
}

//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tidepool_eval::DEFAULT_GAS_LIMIT;

/// Engine-wide settings. Every field has a default, so hosts can
/// deserialize a partial config and let the rest fall through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Base URL of the remote data service.
    pub base_url: String,

    /// Initial `DBQuery.shellBatchSize` seeded into every new session's
    /// namespace. Sessions may overwrite it from shell code.
    pub shell_batch_size: f64,

    /// Seconds between keep-alive requests for each session resource.
    pub keep_alive_secs: u64,

    /// Evaluation step budget per submission.
    pub gas_limit: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            base_url: "/mws/".to_string(),
            shell_batch_size: 20.0,
            keep_alive_secs: 30,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl ShellConfig {
    /// Keep-alive period as a [`Duration`].
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.base_url, "/mws/");
        assert_eq!(config.shell_batch_size, 20.0);
        assert_eq!(config.keep_alive_interval(), Duration::from_secs(30));
        assert_eq!(config.gas_limit, DEFAULT_GAS_LIMIT);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ShellConfig =
            serde_json::from_str(r#"{ "shell_batch_size": 5 }"#).unwrap();
        assert_eq!(config.shell_batch_size, 5.0);
        assert_eq!(config.base_url, "/mws/");
        assert_eq!(config.keep_alive_secs, 30);
    }
}

// Configuration for player connectors
//
// Configuration files are JSON documents. Player specific sections live in a
// "players" subtree; a section at the top level is accepted as well.

use std::fs;
use std::path::Path;
use std::time::Duration;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Timing configuration shared by all connectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Delay between two status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// TCP connect timeout of a session in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Timeout of a single request in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Timeout of the reachability probe in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    50
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ConnectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Build the configuration from a JSON section, falling back to defaults
    /// when the section cannot be parsed
    pub fn from_json(value: &serde_json::Value) -> Self {
        match serde_json::from_value::<ConnectorConfig>(value.clone()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse connector configuration: {}. Using defaults.", e);
                ConnectorConfig::default()
            }
        }
    }
}

/// Read a JSON configuration file
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<serde_json::Value, String> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| format!("Failed to read config file: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Look up the configuration section of a player
///
/// The "players" subtree is searched first, then the top level.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use playersync::config::get_player_config;
///
/// let config = json!({
///   "players": {
///     "VLC": { "poll_interval_ms": 500 }
///   }
/// });
///
/// let vlc = get_player_config(&config, "VLC").unwrap();
/// assert_eq!(vlc["poll_interval_ms"], 500);
/// assert!(get_player_config(&config, "MPC-HC").is_none());
/// ```
pub fn get_player_config<'a>(config: &'a serde_json::Value, player_name: &str) -> Option<&'a serde_json::Value> {
    if let Some(player_config) = config.get("players").and_then(|players| players.get(player_name)) {
        debug!("Found {} configuration in players section", player_name);
        return Some(player_config);
    }

    if let Some(player_config) = config.get(player_name) {
        debug!("Found {} configuration at top level", player_name);
        return Some(player_config);
    }

    debug!("No {} configuration found", player_name);
    None
}

//! Client settings
//!
//! Read from an optional JSON file; every field has a default so partial
//! files are fine. Command line flags are applied on top by the binary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StartupError;

/// Highest multisample level a renderer is asked for
pub const MAX_MSAA: u8 = 16;

/// Placeholder endpoint on the local machine
///
/// No public room server ships with the client. Point `server_url` (or
/// `--server`) at a deployment for online play.
pub const LOCAL_SERVER_URL: &str = "http://127.0.0.1:8080/cometfall";

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Network ===
    /// Position exchange endpoint; takes `room`, `uid` and `p` query parameters
    pub server_url: String,
    /// High-latency mode: fixed request period instead of back-to-back
    pub high_ping_interval_ms: Option<u64>,
    /// Smooth peer motion between refreshes
    pub extrapolation: bool,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Floor on the gap between back-to-back requests
    pub min_update_spacing_ms: u64,
    pub user_agent: String,

    // === Presentation ===
    /// Anti-aliasing samples (0 disables)
    pub msaa: u8,
    /// Icosphere subdivision level of the generated planet shell
    pub shell_subdivisions: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: LOCAL_SERVER_URL.to_string(),
            high_ping_interval_ms: None,
            extrapolation: false,
            request_timeout_ms: 1000,
            min_update_spacing_ms: 10,
            user_agent: "cometfall-agent/1.0".to_string(),

            msaa: MAX_MSAA,
            shell_subdivisions: 4,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let json = fs::read_to_string(path).map_err(|source| StartupError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&json).map_err(|source| StartupError::ConfigFormat {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Anti-aliasing level clamped to what a renderer accepts
    pub fn effective_msaa(&self) -> u8 {
        self.msaa.min(MAX_MSAA)
    }

    /// Still pointed at the local placeholder endpoint
    pub fn uses_local_server(&self) -> bool {
        self.server_url == LOCAL_SERVER_URL
    }

    /// Whether requests are paced by the high-latency interval
    pub fn high_ping(&self) -> bool {
        self.high_ping_interval_ms.is_some_and(|ms| ms > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.msaa, 16);
        assert_eq!(s.request_timeout_ms, 1000);
        assert_eq!(s.min_update_spacing_ms, 10);
        assert_eq!(s.user_agent, "cometfall-agent/1.0");
        assert!(!s.extrapolation);
        assert!(!s.high_ping());
        assert_eq!(s.server_url, "http://127.0.0.1:8080/cometfall");
        assert!(s.uses_local_server());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"extrapolation": true, "high_ping_interval_ms": 300}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert!(s.extrapolation);
        assert!(s.high_ping());
        assert_eq!(s.server_url, Settings::default().server_url);
        assert_eq!(s.shell_subdivisions, 4);
    }

    #[test]
    fn test_msaa_is_clamped() {
        let s = Settings {
            msaa: 64,
            ..Default::default()
        };
        assert_eq!(s.effective_msaa(), 16);
    }

    #[test]
    fn test_load_from_file() {
        let name = format!("cometfall-settings-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        fs::write(&path, r#"{"msaa": 4, "server_url": "http://rooms.test/x"}"#).unwrap();
        let s = Settings::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(s.msaa, 4);
        assert_eq!(s.server_url, "http://rooms.test/x");
        assert!(!s.uses_local_server());
    }

    #[test]
    fn test_load_errors() {
        let missing = std::env::temp_dir().join("cometfall-no-such-settings.json");
        assert!(matches!(Settings::load(&missing), Err(StartupError::Config { .. })));

        let name = format!("cometfall-bad-settings-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        fs::write(&path, "{ not json").unwrap();
        let result = Settings::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(StartupError::ConfigFormat { .. })));
    }
}

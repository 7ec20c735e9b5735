use serde::{Deserialize, Serialize};

/// Root configuration structure parsed from `cuve.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CuveConfig {
    /// Where the sensor lives and how long to wait for it.
    pub device: DeviceConfig,
    /// Polling cadence and history settings.
    pub poll: PollConfig,
    /// Chart appearance.
    pub chart: ChartConfig,
}

/// Connection settings for the sensor's HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL, e.g. `"http://192.168.4.1"`.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Address of the device's fallback access point.
            base_url:   "http://192.168.4.1".to_string(),
            timeout_ms: 2_000,
        }
    }
}

/// Timers and rolling-buffer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Distance poll period in milliseconds.
    pub interval_ms: u64,
    /// Number of samples kept in the chart.
    pub history_len: usize,
    /// Estimated distances at or below this value are treated as absent.
    pub estimated_floor: f64,
    /// Calibration table refresh period in milliseconds.
    pub calibs_interval_ms: u64,
    /// Liveness ping period in milliseconds.
    pub ping_interval_ms: u64,
    /// Value of the `page` form field sent with each ping.
    pub ping_page: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms:        800,
            history_len:        60,
            estimated_floor:    -0.5,
            calibs_interval_ms: 5_000,
            ping_interval_ms:   10_000,
            ping_page:          "index".to_string(),
        }
    }
}

/// Text chart appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Plot rows (excluding axes and header).
    pub height: u16,
    /// Emit ANSI colours.
    pub color: bool,
    /// Measured distance colour (hex).
    pub measured_color: String,
    /// Estimated distance colour (hex).
    pub estimated_color: String,
    /// Pulse duration colour (hex).
    pub duration_color: String,
    /// Number of redraws a notification stays on screen.
    pub notification_ttl: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            height:           12,
            color:            true,
            measured_color:   "#4a7dff".to_string(), // blue
            estimated_color:  "#3fbf5f".to_string(), // green
            duration_color:   "#e5484d".to_string(), // red
            notification_ttl: 6,
        }
    }
}

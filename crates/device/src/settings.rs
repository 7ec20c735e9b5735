//! Device configuration document exchanged with `/api/config`.

use cuve_core::{CuveError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Placeholder the firmware returns instead of real passwords.
pub const MASKED_PASSWORD: &str = "*****";

/// Keys accepted by [`DeviceSettings::set`].
pub const SETTING_KEYS: &[&str] = &[
    "wifi_ssid", "wifi_pass",
    "mqtt_enabled", "mqtt_host", "mqtt_port", "mqtt_user", "mqtt_pass", "mqtt_topic",
    "measure_interval_ms", "measure_offset_cm",
    "avg_alpha", "median_n", "median_delay_ms", "filter_min_cm", "filter_max_cm",
    "display_brightness", "display_refresh_ms",
    "device_name", "interactive_timeout_ms", "deepsleep_interval_s",
    "admin_user", "admin_pass",
];

/// Configuration stored on the sensor.
///
/// Every field is optional: older firmware omits some of them, and the
/// device only updates the fields present in a POST body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    // ── Wi-Fi ────────────────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_pass: Option<String>,

    // ── MQTT ─────────────────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_topic: Option<String>,

    // ── Measurement ──────────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_interval_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_offset_cm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_alpha: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_n: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_delay_ms: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_min_cm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_max_cm: Option<f32>,

    // ── Display ──────────────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_refresh_ms: Option<u32>,

    // ── Device ───────────────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_timeout_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepsleep_interval_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    /// Read-only firmware version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl DeviceSettings {
    /// Set one field from its textual form, e.g. `set("mqtt_port", "1884")`.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        match key {
            "wifi_ssid"              => self.wifi_ssid = Some(raw.to_string()),
            "wifi_pass"              => self.wifi_pass = Some(raw.to_string()),
            "mqtt_enabled"           => self.mqtt_enabled = Some(parse_bool(key, raw)?),
            "mqtt_host"              => self.mqtt_host = Some(raw.to_string()),
            "mqtt_port"              => self.mqtt_port = Some(parse_value(key, raw)?),
            "mqtt_user"              => self.mqtt_user = Some(raw.to_string()),
            "mqtt_pass"              => self.mqtt_pass = Some(raw.to_string()),
            "mqtt_topic"             => self.mqtt_topic = Some(raw.to_string()),
            "measure_interval_ms"    => self.measure_interval_ms = Some(parse_value(key, raw)?),
            "measure_offset_cm"      => self.measure_offset_cm = Some(parse_value(key, raw)?),
            "avg_alpha"              => self.avg_alpha = Some(parse_value(key, raw)?),
            "median_n"               => self.median_n = Some(parse_value(key, raw)?),
            "median_delay_ms"        => self.median_delay_ms = Some(parse_value(key, raw)?),
            "filter_min_cm"          => self.filter_min_cm = Some(parse_value(key, raw)?),
            "filter_max_cm"          => self.filter_max_cm = Some(parse_value(key, raw)?),
            "display_brightness"     => self.display_brightness = Some(parse_value(key, raw)?),
            "display_refresh_ms"     => self.display_refresh_ms = Some(parse_value(key, raw)?),
            "device_name"            => self.device_name = Some(raw.to_string()),
            "interactive_timeout_ms" => self.interactive_timeout_ms = Some(parse_value(key, raw)?),
            "deepsleep_interval_s"   => self.deepsleep_interval_s = Some(parse_value(key, raw)?),
            "admin_user"             => self.admin_user = Some(raw.to_string()),
            "admin_pass"             => self.admin_pass = Some(raw.to_string()),
            "app_version" => {
                return Err(CuveError::Config("app_version is read-only".into()));
            }
            other => {
                return Err(CuveError::Config(format!(
                    "unknown setting '{other}' (expected one of: {})",
                    SETTING_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Body for `POST /api/config`.
    ///
    /// Passwords are kept only when they hold a new value: empty strings and
    /// the device's mask are dropped so saving never overwrites a stored
    /// password with a placeholder. `app_version` is never sent.
    pub fn to_update(&self) -> Self {
        let fresh = |p: &Option<String>| {
            p.as_ref()
                .filter(|p| !p.is_empty() && p.as_str() != MASKED_PASSWORD)
                .cloned()
        };
        Self {
            wifi_pass:   fresh(&self.wifi_pass),
            mqtt_pass:   fresh(&self.mqtt_pass),
            admin_pass:  fresh(&self.admin_pass),
            app_version: None,
            ..self.clone()
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes"  => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(CuveError::Config(format!("{key}: expected a boolean, got '{raw}'"))),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CuveError::Config(format!("{key}: invalid value '{raw}': {e}")))
}

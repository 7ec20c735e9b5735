//! One-shot commands against the device.

use anyhow::{bail, Context, Result};
use cuve_core::TankLevels;
use cuve_device::{DeviceClient, DeviceSettings};

pub async fn show_calibrations(client: &DeviceClient) -> Result<()> {
    let calibs = client.calibrations().await.context("fetching calibrations")?;
    if calibs.is_empty() {
        println!("No calibration slots reported.");
    }
    for c in calibs {
        let measured = c
            .captured()
            .map_or_else(|| "--".to_string(), |m| format!("{m:.1}"));
        println!("C{}: Mesuré={measured} Hauteur={:.1}", c.index + 1, c.height);
    }
    Ok(())
}

pub async fn save_calibration(client: &DeviceClient, id: u32, height: f64) -> Result<()> {
    client
        .save_calibration(id, height)
        .await
        .with_context(|| format!("saving calibration slot {id}"))?;
    println!("Saved calibration C{} at {height:.1} cm", id + 1);
    show_calibrations(client).await
}

pub async fn clear_calibrations(client: &DeviceClient) -> Result<()> {
    client.clear_calibrations().await.context("clearing calibrations")?;
    println!("Cleared");
    show_calibrations(client).await
}

pub async fn set_tank_levels(client: &DeviceClient, vide: f64, pleine: f64) -> Result<()> {
    client
        .set_tank_levels(TankLevels { vide, pleine })
        .await
        .context("saving tank levels")?;
    println!("Saved tank levels: vide {vide:.1} cm, pleine {pleine:.1} cm");
    Ok(())
}

pub async fn send_mqtt(client: &DeviceClient) -> Result<()> {
    client.send_mqtt().await.context("MQTT publish failed")?;
    println!("MQTT sent");
    Ok(())
}

pub async fn show_settings(client: &DeviceClient, json: bool) -> Result<()> {
    let settings = client.settings().await.context("loading device configuration")?;
    let text = if json {
        serde_json::to_string_pretty(&settings)?
    } else {
        toml::to_string_pretty(&settings)?
    };
    println!("{text}");
    Ok(())
}

/// Split `key=value` arguments, rejecting malformed ones up front.
fn parse_assignments(assignments: &[String]) -> Result<Vec<(&str, &str)>> {
    assignments
        .iter()
        .map(|a| match a.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim(), v)),
            _ => bail!("expected key=value, got '{a}'"),
        })
        .collect()
}

/// Apply `assignments` on top of `settings`. Nothing is changed on error.
fn apply_assignments(settings: &DeviceSettings, assignments: &[String]) -> Result<DeviceSettings> {
    let mut updated = settings.clone();
    for (key, value) in parse_assignments(assignments)? {
        updated.set(key, value)?;
    }
    Ok(updated)
}

pub async fn update_settings(client: &DeviceClient, assignments: &[String]) -> Result<()> {
    // Validate before touching the network.
    apply_assignments(&DeviceSettings::default(), assignments)?;

    let current = client.settings().await.context("loading device configuration")?;
    let updated = apply_assignments(&current, assignments)?;
    client
        .update_settings(&updated)
        .await
        .context("saving device configuration")?;
    println!("Configuration saved");
    Ok(())
}

use cuve_core::TankLevels;

/// Tank fill level in percent, as drawn by the device's own gauge.
///
/// Returns 0 when there is no measurement or when the empty and full
/// distances are too close to tell apart.
pub fn fill_percent(measured: Option<f64>, levels: TankLevels) -> u8 {
    let Some(measured) = measured.filter(|m| *m > 0.0) else {
        return 0;
    };

    let span = levels.vide - levels.pleine;
    if span.abs() < 1e-3 {
        return 0;
    }

    let ratio = ((levels.vide - measured) / span).clamp(0.0, 1.0);
    (ratio * 100.0).round() as u8
}

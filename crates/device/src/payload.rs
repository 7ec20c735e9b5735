use cuve_core::{CuveError, Result, TankLevels};
use serde::{Deserialize, Deserializer};

/// JSON shape returned by `GET /distance`.
///
/// The firmware emits `null` when the sensor saw no echo. Anything that is
/// not a finite number is read as absent rather than failing the whole
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DistanceReading {
    #[serde(default, deserialize_with = "lenient_number")]
    pub measured_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub estimated_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration_us: Option<f64>,
    #[serde(default, rename = "cuveVide", deserialize_with = "lenient_number")]
    pub cuve_vide: Option<f64>,
    #[serde(default, rename = "cuvePleine", deserialize_with = "lenient_number")]
    pub cuve_pleine: Option<f64>,
}

impl DistanceReading {
    /// Tank extremes, when the device reported both.
    pub fn levels(&self) -> Option<TankLevels> {
        Some(TankLevels {
            vide:   self.cuve_vide?,
            pleine: self.cuve_pleine?,
        })
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
}

/// JSON shape returned by `GET /calibs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibsResponse {
    pub calibs: Vec<cuve_core::Calibration>,
}

/// `{"ok": bool, "err"?: string}` acknowledgement returned by every POST.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default)]
    pub err: Option<String>,
}

impl Ack {
    /// Turn `ok: false` into [`CuveError::Rejected`].
    pub fn into_result(self) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(CuveError::Rejected(self.err))
        }
    }
}

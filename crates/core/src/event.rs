use crate::sink::Notice;
use crate::state::Calibration;

/// Control messages delivered to the task that owns the rolling series.
///
/// Sources:
/// - Calibration refresh timer → `Calibrations`
/// - Ping timer / commands     → `Notify`
/// - Config watcher task       → `Reconfigure`
/// - Ctrl-C handler            → `Shutdown`
#[derive(Debug, Clone)]
pub enum Message {
    /// Latest calibration table fetched from the device.
    Calibrations(Vec<Calibration>),
    /// Transient notification for the operator.
    Notify(Notice, String),
    /// Settings reloaded from disk.
    Reconfigure {
        history_len:     usize,
        estimated_floor: f64,
    },
    /// Graceful shutdown requested.
    Shutdown,
}

use crate::state::{Calibration, RollingSeries, TankLevels};

/// Severity of a transient operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Error,
}

/// Anything that can draw the rolling series.
///
/// The poller calls [`render`](Self::render) synchronously after every
/// mutation, on the task that owns the series. The remaining hooks are
/// optional; the defaults log or ignore.
pub trait RenderSink: Send {
    /// Redraw from the updated series.
    fn render(&mut self, series: &RollingSeries);

    /// Show a short-lived message (fetch failures, command results).
    fn notify(&mut self, notice: Notice, message: &str) {
        match notice {
            Notice::Info  => tracing::info!("{message}"),
            Notice::Error => tracing::warn!("{message}"),
        }
    }

    /// Tank extremes reported alongside the latest reading.
    fn on_levels(&mut self, _levels: TankLevels) {}

    /// Fresh calibration table from the device.
    fn on_calibrations(&mut self, _calibs: &[Calibration]) {}
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn render(&mut self, series: &RollingSeries) {
        (**self).render(series);
    }

    fn notify(&mut self, notice: Notice, message: &str) {
        (**self).notify(notice, message);
    }

    fn on_levels(&mut self, levels: TankLevels) {
        (**self).on_levels(levels);
    }

    fn on_calibrations(&mut self, calibs: &[Calibration]) {
        (**self).on_calibrations(calibs);
    }
}

use crate::chart::{render_chart, ChartLayout};
use cuve_config::ChartConfig;
use cuve_core::{Calibration, Notice, RenderSink, RollingSeries, TankLevels};
use cuve_telemetry::{
    fill_percent,
    format::{format_cm, format_us},
};
use std::io::Write;
use tracing::{info, warn};

const CLEAR: &str = "\x1b[2J\x1b[H";

struct Banner {
    notice:    Notice,
    text:      String,
    remaining: u32,
}

/// Full-screen dashboard drawn on a terminal (or any writer).
///
/// Layout, top to bottom: latest values and fill gauge, chart, calibration
/// table, transient notification.
pub struct TerminalSink<W> {
    out:        W,
    layout:     ChartLayout,
    clear:      bool,
    ttl:        u32,
    levels:     Option<TankLevels>,
    calibs:     Vec<Calibration>,
    banner:     Option<Banner>,
    header:     String,
    chart:      String,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, cfg: &ChartConfig) -> Self {
        Self {
            out,
            layout:  ChartLayout::from_config(cfg),
            clear:   true,
            ttl:     cfg.notification_ttl,
            levels:  None,
            calibs:  Vec::new(),
            banner:  None,
            header:  "Waiting for the first reading…".to_string(),
            chart:   String::new(),
        }
    }

    /// Skip the clear-screen escape (useful for logs and tests).
    pub fn without_clear(mut self) -> Self {
        self.clear = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header_for(&self, series: &RollingSeries) -> String {
        let latest = series.latest();
        let measured = latest.as_ref().and_then(|s| s.measured);
        let estimated = latest.as_ref().and_then(|s| s.estimated);
        let duration = latest.as_ref().and_then(|s| s.duration);

        let mut header = format!(
            "Mes {} cm   Est {} cm   Dur {} us",
            format_cm(measured),
            format_cm(estimated),
            format_us(duration),
        );
        if let Some(levels) = self.levels {
            header.push_str(&format!(
                "   Fill {:>3}%  (vide {:.1} / pleine {:.1})",
                fill_percent(measured, levels),
                levels.vide,
                levels.pleine,
            ));
        }
        header
    }

    fn calibration_lines(&self) -> Vec<String> {
        self.calibs
            .iter()
            .map(|c| {
                format!(
                    "C{}: Mesuré={} Hauteur={:.1}",
                    c.index + 1,
                    format_cm(c.captured()),
                    c.height
                )
            })
            .collect()
    }

    fn redraw(&mut self) {
        let mut frame = String::new();
        if self.clear {
            frame.push_str(CLEAR);
        }
        frame.push_str(&self.header);
        frame.push_str("\n\n");
        frame.push_str(&self.chart);
        frame.push('\n');

        let calibs = self.calibration_lines();
        if !calibs.is_empty() {
            frame.push('\n');
            frame.push_str(&calibs.join("\n"));
            frame.push('\n');
        }

        if let Some(banner) = &self.banner {
            let tag = match banner.notice {
                Notice::Info  => "info",
                Notice::Error => "error",
            };
            frame.push_str(&format!("\n[{tag}] {}\n", banner.text));
        }

        if let Err(e) = self.out.write_all(frame.as_bytes()).and_then(|()| self.out.flush()) {
            warn!("Cannot draw dashboard: {e}");
        }
    }
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn render(&mut self, series: &RollingSeries) {
        self.header = self.header_for(series);
        self.chart = render_chart(series, &self.layout);
        self.redraw();

        if let Some(banner) = &mut self.banner {
            banner.remaining = banner.remaining.saturating_sub(1);
            if banner.remaining == 0 {
                self.banner = None;
            }
        }
    }

    fn notify(&mut self, notice: Notice, message: &str) {
        match notice {
            Notice::Info  => info!("{message}"),
            Notice::Error => warn!("{message}"),
        }
        self.banner = Some(Banner {
            notice,
            text: message.to_string(),
            remaining: self.ttl.max(1),
        });
        self.redraw();
    }

    fn on_levels(&mut self, levels: TankLevels) {
        self.levels = Some(levels);
    }

    fn on_calibrations(&mut self, calibs: &[Calibration]) {
        self.calibs = calibs.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuve_core::Sample;

    fn sink() -> TerminalSink<Vec<u8>> {
        let cfg = ChartConfig { color: false, height: 4, notification_ttl: 2, ..Default::default() };
        TerminalSink::new(Vec::new(), &cfg).without_clear()
    }

    fn last_frame(sink: TerminalSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    fn series_with(m: Option<f64>, e: Option<f64>, d: Option<f64>) -> RollingSeries {
        let mut series = RollingSeries::new(4);
        series.push(Sample { time: "09:00:00".into(), measured: m, estimated: e, duration: d });
        series
    }

    #[test]
    fn header_shows_latest_values_and_gauge() {
        let mut sink = sink();
        sink.on_levels(TankLevels { vide: 180.0, pleine: 20.0 });
        sink.render(&series_with(Some(100.0), Some(75.26), Some(5800.0)));
        let out = last_frame(sink);
        assert!(out.contains("Mes 100.0 cm   Est 75.3 cm   Dur 5800 us"), "{out}");
        assert!(out.contains("Fill  50%"));
    }

    #[test]
    fn absent_values_show_dashes() {
        let mut sink = sink();
        sink.render(&series_with(None, None, None));
        assert!(last_frame(sink).contains("Mes -- cm   Est -- cm   Dur -- us"));
    }

    #[test]
    fn calibrations_are_listed() {
        let mut sink = sink();
        sink.on_calibrations(&[
            Calibration { index: 0, measured: 150.0, height: 50.0 },
            Calibration { index: 1, measured: 0.0, height: 100.0 },
        ]);
        sink.render(&series_with(Some(1.0), None, None));
        let out = last_frame(sink);
        assert!(out.contains("C1: Mesuré=150.0 Hauteur=50.0"));
        assert!(out.contains("C2: Mesuré=-- Hauteur=100.0"));
    }

    #[test]
    fn notification_draws_immediately_and_expires() {
        let mut sink = sink();
        sink.notify(Notice::Error, "distance: network error: refused");
        assert!(sink.banner.is_some());

        let series = series_with(Some(1.0), None, None);
        sink.render(&series);
        assert!(sink.banner.is_some());
        sink.render(&series);
        assert!(sink.banner.is_none());

        let out = last_frame(sink);
        assert!(out.contains("[error] distance: network error: refused"));
    }
}

//! Two-axis text line chart.
//!
//! Left axis: measured and estimated distance (cm). Right axis: pulse
//! duration (µs). One column per sample, oldest on the left. Absent values
//! leave their column empty.

use crate::colors::Color;
use cuve_config::ChartConfig;
use cuve_core::RollingSeries;
use std::collections::VecDeque;

const AXIS_WIDTH: usize = 7;

/// Which trace a plotted point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace {
    Measured,
    Estimated,
    Duration,
}

impl Trace {
    fn glyph(self) -> char {
        match self {
            Self::Measured  => 'm',
            Self::Estimated => 'e',
            Self::Duration  => 'd',
        }
    }
}

/// Trace colours; `None` on [`ChartLayout`] means plain text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    pub measured:  Color,
    pub estimated: Color,
    pub duration:  Color,
}

impl ChartStyle {
    fn color(&self, trace: Trace) -> Color {
        match trace {
            Trace::Measured  => self.measured,
            Trace::Estimated => self.estimated,
            Trace::Duration  => self.duration,
        }
    }
}

/// Chart geometry and styling.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    /// Plot rows.
    pub height: usize,
    pub style:  Option<ChartStyle>,
}

impl ChartLayout {
    /// Build from the `[chart]` config section. Invalid colours fall back to
    /// the defaults.
    pub fn from_config(cfg: &ChartConfig) -> Self {
        let style = cfg.color.then(|| ChartStyle {
            measured:  Color::from_hex(&cfg.measured_color).unwrap_or(Color::BLUE),
            estimated: Color::from_hex(&cfg.estimated_color).unwrap_or(Color::GREEN),
            duration:  Color::from_hex(&cfg.duration_color).unwrap_or(Color::RED),
        });
        Self {
            height: usize::from(cfg.height).max(2),
            style,
        }
    }
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self::from_config(&ChartConfig::default())
    }
}

/// Value range of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    fn fit<'a>(values: impl Iterator<Item = &'a Option<f64>>) -> Self {
        let (min, max) = values
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        if !min.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if (max - min).abs() < f64::EPSILON {
            return Self { min: min - 1.0, max: max + 1.0 };
        }
        Self { min, max }
    }

    /// Row index for `v`, 0 = top.
    fn row(&self, v: f64, height: usize) -> usize {
        let frac = ((self.max - v) / (self.max - self.min)).clamp(0.0, 1.0);
        (frac * (height - 1) as f64).round() as usize
    }

    /// Value at row `row`, for axis labels.
    fn value_at(&self, row: usize, height: usize) -> f64 {
        self.max - (self.max - self.min) * row as f64 / (height - 1) as f64
    }
}

type Grid = Vec<Vec<Option<Trace>>>;

/// Lay out the traces; later traces overwrite earlier ones on collision, so
/// the measured trace stays on top.
fn plot(series: &RollingSeries, height: usize, left: Scale, right: Scale) -> Grid {
    let mut grid = vec![vec![None; series.len()]; height];

    let mut draw = |values: &VecDeque<Option<f64>>, scale: Scale, trace: Trace| {
        for (col, v) in values.iter().enumerate() {
            if let Some(v) = v {
                grid[scale.row(*v, height)][col] = Some(trace);
            }
        }
    };

    draw(series.durations(), right, Trace::Duration);
    draw(series.estimated(), left, Trace::Estimated);
    draw(series.measured(), left, Trace::Measured);
    grid
}

/// Render `series` as text lines (no trailing newline).
pub fn render_chart(series: &RollingSeries, layout: &ChartLayout) -> String {
    let height = layout.height.max(2);
    let left = Scale::fit(series.measured().iter().chain(series.estimated()));
    let right = Scale::fit(series.durations().iter());
    let grid = plot(series, height, left, right);
    let width = series.capacity().max(series.len());
    let label_rows = [0, height / 2, height - 1];

    let mut lines = Vec::with_capacity(height + 3);
    lines.push(format!("{:>AXIS_WIDTH$}  {:<width$}  {}", "cm", "", "us"));

    for (row, cells) in grid.iter().enumerate() {
        let (l, r) = if label_rows.contains(&row) {
            (
                format!("{:.1}", left.value_at(row, height)),
                format!("{:.0}", right.value_at(row, height)),
            )
        } else {
            (String::new(), String::new())
        };

        let mut plot_line = String::with_capacity(width);
        for cell in cells {
            match (cell, layout.style) {
                (Some(trace), Some(style)) => {
                    plot_line.push_str(&style.color(*trace).paint(&trace.glyph().to_string()));
                }
                (Some(trace), None) => plot_line.push(trace.glyph()),
                (None, _) => plot_line.push(' '),
            }
        }
        // Pad to the full history width so the right axis doesn't move.
        plot_line.extend(std::iter::repeat(' ').take(width - cells.len()));

        lines.push(format!("{l:>AXIS_WIDTH$} │{plot_line}│ {r}"));
    }

    lines.push(format!("{:>AXIS_WIDTH$} └{}┘", "", "─".repeat(width)));

    let first = series.times().front().map(String::as_str).unwrap_or("");
    let last = series.times().back().map(String::as_str).unwrap_or("");
    let gap = width.saturating_sub(first.len() + last.len());
    if series.len() > 1 {
        lines.push(format!("{:>AXIS_WIDTH$}  {first}{}{last}", "", " ".repeat(gap)));
    } else {
        lines.push(format!("{:>AXIS_WIDTH$}  {first}", ""));
    }

    lines.push(legend(layout.style));
    lines.join("\n")
}

fn legend(style: Option<ChartStyle>) -> String {
    let entry = |trace: Trace, label: &str| {
        let glyph = trace.glyph().to_string();
        let glyph = match style {
            Some(style) => style.color(trace).paint(&glyph),
            None => glyph,
        };
        format!("{glyph} {label}")
    };
    format!(
        "{:>AXIS_WIDTH$}  {}   {}   {}",
        "",
        entry(Trace::Measured, "Mes (cm)"),
        entry(Trace::Estimated, "Est (cm)"),
        entry(Trace::Duration, "Dur (us)"),
    )
}

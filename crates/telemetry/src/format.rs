/// Placeholder shown for absent values.
pub const ABSENT: &str = "--";

/// Format a distance with one decimal (e.g. `"123.4"`), or `"--"`.
pub fn format_cm(value: Option<f64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| format!("{v:.1}"))
}

/// Format a pulse duration as whole microseconds, or `"--"`.
pub fn format_us(value: Option<f64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| format!("{v:.0}"))
}

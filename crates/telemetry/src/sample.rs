use chrono::Local;
use cuve_core::Sample;
use cuve_device::DistanceReading;

/// Estimated distances at or below this are the firmware's "no estimate" marker.
pub const DEFAULT_ESTIMATED_FLOOR: f64 = -0.5;

/// Rules for turning a raw `/distance` payload into a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePolicy {
    /// Estimated values must be strictly greater than this to be kept.
    pub estimated_floor: f64,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self { estimated_floor: DEFAULT_ESTIMATED_FLOOR }
    }
}

impl SamplePolicy {
    /// Build a sample stamped with `time`.
    ///
    /// - no measurement ⇒ duration is dropped too, whatever the device sent;
    /// - estimate kept only above [`estimated_floor`](Self::estimated_floor).
    pub fn interpret(&self, reading: &DistanceReading, time: String) -> Sample {
        let measured = reading.measured_cm;
        let duration = measured.and(reading.duration_us);
        let estimated = reading.estimated_cm.filter(|e| *e > self.estimated_floor);

        Sample { time, measured, estimated, duration }
    }
}

/// Current local time as shown on the chart's x axis.
pub fn now_label() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(measured: Option<f64>, estimated: Option<f64>, duration: Option<f64>) -> DistanceReading {
        DistanceReading {
            measured_cm: measured,
            estimated_cm: estimated,
            duration_us: duration,
            ..Default::default()
        }
    }

    fn interpret(r: &DistanceReading) -> Sample {
        SamplePolicy::default().interpret(r, "12:00:00".into())
    }

    #[test]
    fn missing_measurement_drops_duration() {
        let s = interpret(&reading(None, Some(40.0), Some(5800.0)));
        assert_eq!(s.measured, None);
        assert_eq!(s.duration, None);
        assert_eq!(s.estimated, Some(40.0));
    }

    #[test]
    fn duration_kept_with_measurement() {
        let s = interpret(&reading(Some(100.0), None, Some(5800.0)));
        assert_eq!(s.duration, Some(5800.0));
    }

    #[test]
    fn sentinel_estimates_are_absent() {
        assert_eq!(interpret(&reading(Some(1.0), Some(-1.0), None)).estimated, None);
        assert_eq!(interpret(&reading(Some(1.0), Some(-0.5), None)).estimated, None);
    }

    #[test]
    fn non_negative_estimates_are_kept() {
        assert_eq!(interpret(&reading(Some(1.0), Some(0.0), None)).estimated, Some(0.0));
        assert_eq!(interpret(&reading(Some(1.0), Some(87.3), None)).estimated, Some(87.3));
        assert_eq!(interpret(&reading(Some(1.0), Some(-0.4), None)).estimated, Some(-0.4));
    }

    #[test]
    fn custom_floor() {
        let policy = SamplePolicy { estimated_floor: 10.0 };
        let s = policy.interpret(&reading(Some(1.0), Some(10.0), None), String::new());
        assert_eq!(s.estimated, None);
    }

    #[test]
    fn label_is_clock_time() {
        let label = now_label();
        assert_eq!(label.len(), 8);
        assert_eq!(label.matches(':').count(), 2);
    }
}

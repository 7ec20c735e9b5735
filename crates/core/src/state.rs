use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of samples kept for the chart.
pub const DEFAULT_HISTORY_LEN: usize = 60;

/// Largest bound a series accepts; one chart column per sample.
pub const MAX_HISTORY_LEN: usize = 3_600;

/// One time-stamped reading. Any component may be absent; absent values are
/// drawn as gaps and never coerced to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Display-formatted wall-clock time (e.g. `"14:03:27"`).
    pub time: String,
    /// Raw measured distance in cm.
    pub measured: Option<f64>,
    /// Calibrated estimate in cm.
    pub estimated: Option<f64>,
    /// Echo pulse duration in µs.
    pub duration: Option<f64>,
}

/// Bounded rolling history stored as four parallel sequences.
///
/// All four sequences always have the same length, which never exceeds
/// [`capacity`](Self::capacity). Pushing past the bound evicts the oldest
/// entry of every sequence together.
#[derive(Debug, Clone)]
pub struct RollingSeries {
    time:      VecDeque<String>,
    measured:  VecDeque<Option<f64>>,
    estimated: VecDeque<Option<f64>>,
    duration:  VecDeque<Option<f64>>,
    capacity:  usize,
}

fn clamp_capacity(capacity: usize) -> usize {
    capacity.clamp(1, MAX_HISTORY_LEN)
}

impl RollingSeries {
    /// Create an empty series. The bound is clamped to
    /// `1..=MAX_HISTORY_LEN`.
    pub fn new(capacity: usize) -> Self {
        Self {
            time:      VecDeque::new(),
            measured:  VecDeque::new(),
            estimated: VecDeque::new(),
            duration:  VecDeque::new(),
            capacity:  clamp_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest one if the bound is exceeded.
    pub fn push(&mut self, sample: Sample) {
        self.time.push_back(sample.time);
        self.measured.push_back(sample.measured);
        self.estimated.push_back(sample.estimated);
        self.duration.push_back(sample.duration);
        self.evict_overflow();
    }

    /// Change the bound. Shrinking drops the oldest samples.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = clamp_capacity(capacity);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.time.len() > self.capacity {
            self.time.pop_front();
            self.measured.pop_front();
            self.estimated.pop_front();
            self.duration.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn times(&self) -> &VecDeque<String> {
        &self.time
    }

    pub fn measured(&self) -> &VecDeque<Option<f64>> {
        &self.measured
    }

    pub fn estimated(&self) -> &VecDeque<Option<f64>> {
        &self.estimated
    }

    pub fn durations(&self) -> &VecDeque<Option<f64>> {
        &self.duration
    }

    /// Reassemble the sample at `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            time:      self.time.get(index)?.clone(),
            measured:  *self.measured.get(index)?,
            estimated: *self.estimated.get(index)?,
            duration:  *self.duration.get(index)?,
        })
    }

    /// Most recently appended sample.
    pub fn latest(&self) -> Option<Sample> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate samples oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl Default for RollingSeries {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

/// One calibration point stored on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Zero-based slot on the device.
    pub index: u32,
    /// Distance captured when the point was saved; `<= 0` means not captured.
    pub measured: f64,
    /// Water height associated with this point (cm).
    pub height: f64,
}

impl Calibration {
    /// The measured distance, or `None` if the slot was never captured.
    pub fn captured(&self) -> Option<f64> {
        (self.measured > 0.0).then_some(self.measured)
    }
}

/// Distances from the sensor to the water surface at both tank extremes (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankLevels {
    /// Distance when the tank is empty.
    pub vide: f64,
    /// Distance when the tank is full.
    pub pleine: f64,
}

pub mod client;
pub mod payload;
pub mod settings;

pub use client::DeviceClient;
pub use payload::{Ack, CalibsResponse, DistanceReading};
pub use settings::{DeviceSettings, MASKED_PASSWORD, SETTING_KEYS};

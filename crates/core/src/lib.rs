pub mod error;
pub mod event;
pub mod sink;
pub mod state;

pub use error::{CuveError, Result};
pub use event::Message;
pub use sink::{Notice, RenderSink};
pub use state::{Calibration, RollingSeries, Sample, TankLevels, MAX_HISTORY_LEN};

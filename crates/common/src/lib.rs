pub mod clock;
pub mod config;
pub mod error;
pub mod sink;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use sink::{SignalAlert, SignalSink};
pub use types::*;

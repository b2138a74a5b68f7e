pub mod dispatch;
pub mod engine;
pub mod registry;

pub use dispatch::{AlertDispatcher, LogSink};
pub use engine::{Evaluation, IngestReport, SmcEngine};
pub use registry::{CycleOutcome, EngineRegistry};

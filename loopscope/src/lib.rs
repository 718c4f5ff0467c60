pub mod adapter;
pub mod display;
mod error;
mod profiler;
pub mod registry;
pub mod report;
pub mod routine;

pub use loopscope_host as host;

pub use error::LoopscopeError;
pub use profiler::Profiler;
pub use registry::{LoopOwner, LoopRecord, LoopRegistry};
pub use report::ReportRow;
pub use routine::RoutineAccounting;

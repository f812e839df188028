//! Score model and time resolution.

pub mod timing;
pub mod types;

pub use timing::{to_real_time, TempoMap};
pub use types::{ParamValue, RealTimeEvent, RealTimeScore, Score, ScoreEvent};

pub mod aggregate;
pub mod timeframe;

pub use aggregate::*;
pub use timeframe::{divide_timeframe_into_segments, interval_start, Segment};

//! Execution primitives shared by the synchronizers and the logo pipeline.

mod coalescer;
mod throttle;

pub use coalescer::{Participation, RequestCoalescer};
pub use throttle::{Pacing, RetryExecutor, Throttle};

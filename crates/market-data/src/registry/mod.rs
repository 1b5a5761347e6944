//! Client-side request pacing for upstream providers.

mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, RateLimiter};

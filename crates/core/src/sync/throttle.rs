//! Throttled execution: one pacing abstraction behind both retry backoff and
//! rate-limited sequential iteration.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

/// How long to pause before step `n` of a throttled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Same pause every time.
    Fixed(Duration),
    /// `base * 2^n`.
    Exponential { base: Duration },
}

impl Pacing {
    pub fn delay_for(&self, step: u32) -> Duration {
        match *self {
            Pacing::Fixed(delay) => delay,
            Pacing::Exponential { base } => {
                let factor = 1u32.checked_shl(step).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    pacing: Pacing,
}

impl Throttle {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(Pacing::Fixed(delay))
    }

    pub fn exponential(base: Duration) -> Self {
        Self::new(Pacing::Exponential { base })
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Sleep for the delay of the given step.
    pub async fn pause(&self, step: u32) {
        let delay = self.pacing.delay_for(step);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Run `f` over `items` strictly one at a time, pausing between items.
    ///
    /// The pause follows every item except the last, whatever the item's
    /// outcome was, so the call rate never exceeds the pacing.
    pub async fn for_each<I, F, Fut, O>(&self, items: I, mut f: F) -> Vec<O>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = O>,
    {
        let mut items = items.into_iter().peekable();
        let mut outputs = Vec::new();
        let mut step = 0u32;

        while let Some(item) = items.next() {
            outputs.push(f(item).await);

            if items.peek().is_some() {
                self.pause(step).await;
                step = step.saturating_add(1);
            }
        }

        outputs
    }
}

/// Exponential-backoff wrapper around a fallible async call.
///
/// `max_retries` counts retries, so an always-failing operation runs
/// `max_retries + 1` times before the last error is returned.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    max_retries: u32,
    throttle: Throttle,
}

impl RetryExecutor {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            throttle: Throttle::exponential(base_delay),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = self.throttle.pacing().delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    self.throttle.pause(attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_exponential_delays() {
        let pacing = Pacing::Exponential {
            base: Duration::from_secs(2),
        };
        assert_eq!(pacing.delay_for(0), Duration::from_secs(2));
        assert_eq!(pacing.delay_for(1), Duration::from_secs(4));
        assert_eq!(pacing.delay_for(2), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_delay_saturates() {
        let pacing = Pacing::Exponential {
            base: Duration::from_secs(1),
        };
        assert!(pacing.delay_for(64) >= pacing.delay_for(31));
    }

    #[test]
    fn test_fixed_delay_ignores_step() {
        let pacing = Pacing::Fixed(Duration::from_millis(1100));
        assert_eq!(pacing.delay_for(0), pacing.delay_for(9));
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_max_plus_one_attempts() {
        let retry = RetryExecutor::new(3, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result: Result<(), String> = retry
            .run("always failing", || {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure #{}", n + 1))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err(), "failure #4");
    }

    #[tokio::test]
    async fn test_retry_stops_on_success() {
        let retry = RetryExecutor::new(3, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result: Result<usize, String> = retry
            .run("flaky", || {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_backs_off_exponentially() {
        let retry = RetryExecutor::new(2, Duration::from_millis(10));
        let start = Instant::now();

        let _: Result<(), &str> = retry.run("slow", || async { Err("nope") }).await;

        // 10ms + 20ms
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_for_each_pauses_between_items_only() {
        let throttle = Throttle::fixed(Duration::from_millis(20));
        let start = Instant::now();

        let out = throttle.for_each(vec![1, 2, 3], |n| async move { n * 10 }).await;

        let elapsed = start.elapsed();
        assert_eq!(out, vec![10, 20, 30]);
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(60 + 200));
    }

    #[tokio::test]
    async fn test_for_each_empty_does_not_sleep() {
        let throttle = Throttle::fixed(Duration::from_secs(5));
        let out: Vec<()> = throttle.for_each(Vec::<u8>::new(), |_| async {}).await;
        assert!(out.is_empty());
    }
}

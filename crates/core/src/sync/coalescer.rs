//! At-most-one in-flight execution per key.
//!
//! The first caller for a key starts the operation on a spawned task; callers
//! arriving while it runs await the same shared outcome. The spawned task
//! removes the key when the operation settles, so a later call starts fresh
//! and a failure never leaves a stale entry behind, even if every caller
//! stopped waiting.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};

use crate::errors::{Error, Result};

type SharedOutcome<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<Error>>>>;
type InFlight<T> = Arc<Mutex<HashMap<String, SharedOutcome<T>>>>;

/// How a caller took part in a coalesced execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    /// This caller started the operation.
    Leader,
    /// This caller joined an execution that was already running.
    Follower,
}

/// Merges concurrent requests for the same key into one execution.
pub struct RequestCoalescer<T> {
    in_flight: InFlight<T>,
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `operation` under `key`, or await the execution already running under it.
    ///
    /// Every caller of one execution sees the same value. A failure reaches
    /// every caller as [`Error::Shared`] wrapping the one original error.
    pub async fn execute<F, Fut>(&self, key: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.execute_observed(key, operation).await.1
    }

    /// Like [`execute`](Self::execute), also reporting whether this caller led or joined.
    pub async fn execute_observed<F, Fut>(
        &self,
        key: &str,
        operation: F,
    ) -> (Participation, Result<T>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (participation, outcome) = {
            let mut in_flight = lock_in_flight(&self.in_flight);

            match in_flight.get(key) {
                Some(existing) => {
                    debug!("Coalescing request for '{}'", key);
                    (Participation::Follower, existing.clone())
                }
                None => {
                    let outcome = self.spawn(key.to_string(), operation());
                    in_flight.insert(key.to_string(), outcome.clone());
                    (Participation::Leader, outcome)
                }
            }
        };

        (participation, outcome.await.map_err(Error::Shared))
    }

    /// Number of keys with an execution still running.
    pub fn in_flight_count(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        lock_in_flight(&self.in_flight).contains_key(key)
    }

    /// Drive the operation on its own task so it settles (and frees its key)
    /// regardless of which callers are still polling.
    fn spawn<Fut>(&self, key: String, operation: Fut) -> SharedOutcome<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            let result = operation.await.map_err(Arc::new);
            // The inserting caller holds the lock until the entry exists,
            // so this always removes our own entry.
            lock_in_flight(&in_flight).remove(&key);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => Err(Arc::new(Error::Unexpected(format!(
                    "coalesced task failed: {}",
                    join_error
                )))),
            }
        }
        .boxed()
        .shared()
    }
}

impl<T> Default for RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock_in_flight<T>(in_flight: &InFlight<T>) -> MutexGuard<'_, HashMap<String, SharedOutcome<T>>> {
    in_flight.lock().unwrap_or_else(|poisoned| {
        warn!("Coalescer mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

//! Lifecycle of the single shared browser session.
//!
//! ```text
//! Uninitialized --get_session--> Initializing --launched--> Ready
//!       ^                              |                      |
//!       +--------- launch failed ------+                      |
//!       +--------- found disconnected ------------------------+
//!
//! any state --shutdown--> Closed
//! ```
//!
//! Initialization is shared: concurrent callers all await one launch and
//! all observe its outcome.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use super::browser::{BrowserLauncher, BrowserSession, PageHandle, Viewport};
use crate::constants::BROWSER_TIMEOUT;
use crate::errors::{Error, Result};

type LaunchOutcome = std::result::Result<Arc<dyn BrowserSession>, Arc<Error>>;
type LaunchFuture = Shared<BoxFuture<'static, LaunchOutcome>>;

enum SessionState {
    Uninitialized,
    Initializing(LaunchFuture),
    Ready(Arc<dyn BrowserSession>),
    Closed,
}

enum Step {
    Check(Arc<dyn BrowserSession>),
    Await(LaunchFuture),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub launch_timeout: Duration,
    pub viewport: Viewport,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            launch_timeout: BROWSER_TIMEOUT,
            viewport: Viewport::default(),
        }
    }
}

/// Owns the one browser session and hands out per-operation pages.
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: SessionConfig) -> Self {
        Self {
            launcher,
            config,
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Return the live session, launching (or relaunching) it when needed.
    pub async fn get_session(&self) -> Result<Arc<dyn BrowserSession>> {
        loop {
            let step = {
                let mut state = self.state.lock().await;
                match &mut *state {
                    SessionState::Closed => {
                        return Err(Error::Browser("browser session is shut down".to_string()))
                    }
                    SessionState::Ready(session) => Step::Check(Arc::clone(session)),
                    SessionState::Initializing(launch) => Step::Await(launch.clone()),
                    SessionState::Uninitialized => {
                        debug!("Launching browser session");
                        let launch = self.start_launch();
                        *state = SessionState::Initializing(launch.clone());
                        Step::Await(launch)
                    }
                }
            };

            match step {
                Step::Check(session) => {
                    if session.is_connected().await {
                        return Ok(session);
                    }
                    warn!("Browser session disconnected, relaunching");
                    self.invalidate(&session).await;
                }
                Step::Await(launch) => {
                    let outcome = launch.clone().await;
                    return self.settle(&launch, outcome).await;
                }
            }
        }
    }

    /// Open an isolated page on the shared session with the fixed viewport.
    pub async fn create_handle(&self) -> Result<Box<dyn PageHandle>> {
        let session = self.get_session().await?;
        session.new_page(self.config.viewport).await
    }

    /// Close a page. Failures are logged and swallowed.
    pub async fn release_handle(&self, handle: Box<dyn PageHandle>) {
        if let Err(e) = handle.close().await {
            warn!("Failed to close browser page: {}", e);
        }
    }

    /// Close the session for good. Safe to call more than once.
    pub async fn shutdown(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, SessionState::Closed)
        };

        match previous {
            SessionState::Ready(session) => {
                info!("Shutting down browser session");
                close_quietly(session.as_ref()).await;
            }
            SessionState::Initializing(_) => {
                // The launch settles into Closed and closes its own session.
                debug!("Browser shutdown requested during launch");
            }
            SessionState::Uninitialized | SessionState::Closed => {}
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, SessionState::Ready(_))
    }

    fn start_launch(&self) -> LaunchFuture {
        let launcher = Arc::clone(&self.launcher);
        let timeout = self.config.launch_timeout;

        async move {
            match tokio::time::timeout(timeout, launcher.launch()).await {
                Ok(Ok(session)) => Ok(session),
                Ok(Err(e)) => Err(Arc::new(e)),
                Err(_) => Err(Arc::new(Error::Timeout(format!(
                    "browser launch exceeded {:?}",
                    timeout
                )))),
            }
        }
        .boxed()
        .shared()
    }

    /// Record a launch outcome, but only if the state still refers to that launch.
    async fn settle(
        &self,
        launch: &LaunchFuture,
        outcome: LaunchOutcome,
    ) -> Result<Arc<dyn BrowserSession>> {
        let mut state = self.state.lock().await;
        let current = matches!(&*state, SessionState::Initializing(pending) if pending.ptr_eq(launch));
        let closed = matches!(*state, SessionState::Closed);

        match outcome {
            Ok(session) if current => {
                info!("Browser session ready");
                *state = SessionState::Ready(Arc::clone(&session));
                Ok(session)
            }
            Err(e) if current => {
                warn!("Browser launch failed: {}", e);
                *state = SessionState::Uninitialized;
                Err(Error::Shared(e))
            }
            Ok(session) if closed => {
                drop(state);
                close_quietly(session.as_ref()).await;
                Err(Error::Browser("browser session is shut down".to_string()))
            }
            // Another waiter already settled this launch.
            Ok(session) => Ok(session),
            Err(e) => Err(Error::Shared(e)),
        }
    }

    /// Forget a dead session unless someone already replaced it.
    async fn invalidate(&self, dead: &Arc<dyn BrowserSession>) {
        let removed = {
            let mut state = self.state.lock().await;
            let stale = matches!(&*state, SessionState::Ready(current) if same_session(current, dead));
            if stale {
                *state = SessionState::Uninitialized;
            }
            stale
        };

        if removed {
            close_quietly(dead.as_ref()).await;
        }
    }
}

fn same_session(a: &Arc<dyn BrowserSession>, b: &Arc<dyn BrowserSession>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

async fn close_quietly(session: &dyn BrowserSession) {
    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSession {
        connected: AtomicBool,
        closes: AtomicUsize,
        pages: AtomicUsize,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn new_page(&self, _viewport: Viewport) -> Result<Box<dyn PageHandle>> {
            self.pages.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePage::default()))
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePage {
        fail_close: bool,
    }

    #[async_trait]
    impl PageHandle for FakePage {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        async fn close(&self) -> Result<()> {
            if self.fail_close {
                Err(Error::Browser("already closed".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeLauncher {
        launches: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
        sessions: std::sync::Mutex<Vec<Arc<FakeSession>>>,
    }

    impl FakeLauncher {
        fn last_session(&self) -> Arc<FakeSession> {
            Arc::clone(self.sessions.lock().unwrap().last().unwrap())
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Arc<dyn BrowserSession>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Browser("chrome not found".into()));
            }
            let session = Arc::new(FakeSession::default());
            session.connected.store(true, Ordering::SeqCst);
            self.sessions.lock().unwrap().push(Arc::clone(&session));
            Ok(session)
        }
    }

    fn manager(launcher: Arc<FakeLauncher>) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(launcher, SessionConfig::default()))
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_launch() {
        let launcher = Arc::new(FakeLauncher {
            delay: Duration::from_millis(30),
            ..Default::default()
        });
        let manager = manager(Arc::clone(&launcher));

        let (a, b, c) = tokio::join!(
            manager.get_session(),
            manager.get_session(),
            manager.get_session()
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert!(manager.is_ready().await);
    }

    #[tokio::test]
    async fn test_launch_failure_reaches_all_waiters_and_allows_retry() {
        let launcher = Arc::new(FakeLauncher {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        launcher.fail.store(true, Ordering::SeqCst);
        let manager = manager(Arc::clone(&launcher));

        let (a, b) = tokio::join!(manager.get_session(), manager.get_session());
        assert!(a.is_err() && b.is_err());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert!(!manager.is_ready().await);

        launcher.fail.store(false, Ordering::SeqCst);
        assert!(manager.get_session().await.is_ok());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disconnected_session_is_relaunched() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = manager(Arc::clone(&launcher));

        manager.get_session().await.unwrap();
        let first = launcher.last_session();
        first.connected.store(false, Ordering::SeqCst);

        manager.get_session().await.unwrap();
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
        assert_eq!(first.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_timeout() {
        let launcher = Arc::new(FakeLauncher {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let manager = SessionManager::new(
            launcher,
            SessionConfig {
                launch_timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let err = manager.get_session().await.err().unwrap();
        assert!(matches!(err, Error::Shared(ref inner) if matches!(**inner, Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_handles_come_from_the_shared_session() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = manager(Arc::clone(&launcher));

        let first = manager.create_handle().await.unwrap();
        let second = manager.create_handle().await.unwrap();
        manager.release_handle(first).await;
        manager.release_handle(second).await;

        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.last_session().pages.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_release_swallows_close_errors() {
        let manager = manager(Arc::new(FakeLauncher::default()));
        manager
            .release_handle(Box::new(FakePage { fail_close: true }))
            .await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let launcher = Arc::new(FakeLauncher::default());
        let manager = manager(Arc::clone(&launcher));
        manager.get_session().await.unwrap();

        manager.shutdown().await;
        manager.shutdown().await;

        assert_eq!(launcher.last_session().closes.load(Ordering::SeqCst), 1);
        assert!(manager.get_session().await.is_err());
    }
}

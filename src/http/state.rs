use crate::config::Config;
use crate::upstream::JoinUrlProvider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared application state for HTTP handlers
///
/// Sessions themselves are never stored here; each lives in its own
/// connection task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Where each new session gets its upstream target from
    pub join_urls: Arc<dyn JoinUrlProvider>,
    active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config, join_urls: Arc<dyn JoinUrlProvider>) -> Self {
        Self {
            config: Arc::new(config),
            join_urls,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Count a session as active until the returned guard is dropped
    pub(crate) fn session_guard(&self) -> ActiveSessionGuard {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        ActiveSessionGuard {
            counter: Arc::clone(&self.active_sessions),
        }
    }
}

pub(crate) struct ActiveSessionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

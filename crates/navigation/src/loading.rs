//! Page-transition loading flag with a self-clearing timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use proto::{DEFAULT_LOADING_TEXT, NavigationLoadingState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long the flag stays up when nobody calls `stop_loading`.
pub const DEFAULT_LOADING_DURATION: Duration = Duration::from_millis(800);

/// Owns the process-wide [`NavigationLoadingState`].
///
/// Each `start_loading` arms a timer that clears the flag after the
/// configured duration. A later `start_loading` or `stop_loading` cancels the
/// pending timer and bumps the cycle number; a timer only clears the flag
/// while its own cycle is still the current one.
pub struct LoadingCoordinator {
    state: Arc<watch::Sender<NavigationLoadingState>>,
    /// Current cycle. Only read or bumped inside the watch sender's lock.
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<CancellationToken>>,
    duration: Duration,
}

impl LoadingCoordinator {
    pub fn new(duration: Duration, default_text: impl Into<String>) -> Self {
        let (state, _) = watch::channel(NavigationLoadingState {
            is_loading: false,
            loading_text: default_text.into(),
        });
        Self {
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> NavigationLoadingState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn loading_text(&self) -> String {
        self.state.borrow().loading_text.clone()
    }

    /// Receiver notified on every flag or label change.
    pub fn subscribe(&self) -> watch::Receiver<NavigationLoadingState> {
        self.state.subscribe()
    }

    /// Raises the flag for the default duration, replacing the label when
    /// `text` is given.
    pub fn start_loading(&self, text: Option<&str>) {
        self.start_loading_for(text, self.duration);
    }

    /// Raises the flag for `duration`.
    pub fn start_loading_for(&self, text: Option<&str>, duration: Duration) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }
        let mut cycle = 0;
        self.state.send_modify(|s| {
            cycle = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(text) = text {
                s.loading_text = text.to_string();
            }
            s.is_loading = true;
        });
        debug!(text = ?text, cycle, duration_ms = duration.as_millis() as u64, "Loading started");
        *timer = self.arm_timer(cycle, duration);
    }

    /// Clears the flag now and cancels the pending timer.
    pub fn stop_loading(&self) {
        let mut timer = self.timer.lock();
        if let Some(token) = timer.take() {
            token.cancel();
        }
        self.state.send_modify(|s| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            s.is_loading = false;
        });
        debug!("Loading stopped");
    }

    /// Changes the label without touching the flag.
    pub fn set_loading_text(&self, text: &str) {
        self.state.send_modify(|s| s.loading_text = text.to_string());
    }

    fn arm_timer(&self, cycle: u64, duration: Duration) -> Option<CancellationToken> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; loading flag will not clear itself");
            return None;
        };
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);
        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    let cleared = state.send_if_modified(|s| {
                        if generation.load(Ordering::SeqCst) != cycle || !s.is_loading {
                            return false;
                        }
                        s.is_loading = false;
                        true
                    });
                    if cleared {
                        debug!(cycle, "Loading cleared by timer");
                    }
                }
            }
        });
        Some(token)
    }
}

impl Default for LoadingCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_LOADING_DURATION, DEFAULT_LOADING_TEXT)
    }
}

impl Drop for LoadingCoordinator {
    fn drop(&mut self) {
        if let Some(token) = self.timer.get_mut().take() {
            token.cancel();
        }
    }
}

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::loading::LoadingCoordinator;
use crate::router::{Page, breadcrumbs};

/// Oldest entries fall off once `back()` history reaches this length.
pub const MAX_HISTORY: usize = 50;

/// Where the user is and where they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_path: String,
    pub current_page: Page,
    /// Last page different from the current one.
    pub previous_page: Option<Page>,
    pub breadcrumbs: Vec<String>,
}

impl NavigationState {
    fn at(path: &str) -> Self {
        Self {
            current_path: path.to_string(),
            current_page: Page::from_path(path),
            previous_page: None,
            breadcrumbs: breadcrumbs(path),
        }
    }
}

/// Per-call navigation tweaks
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    pub show_loading: bool,
    /// Defaults to the target page's own loading label.
    pub loading_text: Option<String>,
    /// Defaults to the coordinator's duration.
    pub loading_duration: Option<Duration>,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            show_loading: true,
            loading_text: None,
            loading_duration: None,
        }
    }
}

impl NavigationOptions {
    /// Navigation without the loading indicator.
    pub fn instant() -> Self {
        Self {
            show_loading: false,
            ..Self::default()
        }
    }
}

/// Tracks the current location and drives the loading indicator on moves
pub struct Navigator {
    loading: Arc<LoadingCoordinator>,
    state: RwLock<NavigationState>,
    history: RwLock<VecDeque<String>>,
}

impl Navigator {
    /// Starts at `/`.
    pub fn new(loading: Arc<LoadingCoordinator>) -> Self {
        Self {
            loading,
            state: RwLock::new(NavigationState::at("/")),
            history: RwLock::new(VecDeque::new()),
        }
    }

    pub fn loading(&self) -> &Arc<LoadingCoordinator> {
        &self.loading
    }

    pub fn state(&self) -> NavigationState {
        self.state.read().clone()
    }

    pub fn current_page(&self) -> Page {
        self.state.read().current_page.clone()
    }

    pub fn is_page_active(&self, page: &Page) -> bool {
        &self.state.read().current_page == page
    }

    /// Moves to `path` and returns the new state.
    pub fn navigate(&self, path: &str, options: NavigationOptions) -> NavigationState {
        let path = normalize(path);
        let page = Page::from_path(&path);

        if options.show_loading {
            let text = options
                .loading_text
                .unwrap_or_else(|| page.loading_text().to_string());
            let duration = options
                .loading_duration
                .unwrap_or_else(|| self.loading.duration());
            self.loading.start_loading_for(Some(&text), duration);
        }

        let previous_path = {
            let state = self.state.read();
            state.current_path.clone()
        };
        {
            let mut history = self.history.write();
            if history.len() == MAX_HISTORY {
                history.pop_front();
            }
            history.push_back(previous_path);
        }
        self.apply(&path)
    }

    /// Returns to the previous location, if any, without the loading indicator.
    pub fn back(&self) -> Option<NavigationState> {
        let path = self.history.write().pop_back()?;
        Some(self.apply(&path))
    }

    fn apply(&self, path: &str) -> NavigationState {
        let page = Page::from_path(path);
        let mut state = self.state.write();
        if state.current_page != page {
            state.previous_page = Some(state.current_page.clone());
        }
        state.current_page = page;
        state.current_path = path.to_string();
        state.breadcrumbs = breadcrumbs(path);
        debug!(path, page = %state.current_page, "Navigated");
        state.clone()
    }
}

/// Ensures a leading `/`.
fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

//! Navigation loading coordinator, page router, and navigator.

pub mod loading;
pub mod navigator;
pub mod router;

/// Loading indicator with auto-clear timer.
pub use loading::{DEFAULT_LOADING_DURATION, LoadingCoordinator};
/// Location tracking.
pub use navigator::{NavigationOptions, NavigationState, Navigator};
/// Page resolution helpers.
pub use router::{Page, breadcrumbs, display_name, is_path_active};

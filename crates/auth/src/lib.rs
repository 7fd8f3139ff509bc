//! Auth state holder, its backends, and the local session cache.

pub mod backend;
pub mod cache;
pub mod http;
pub mod mock;
pub mod store;
mod validation;

/// Backend abstraction and sign-in result.
pub use backend::{AuthBackend, AuthSession};
/// On-disk session cache.
pub use cache::{CachedSession, ProfileCache};
/// REST backend.
pub use http::HttpAuthBackend;
/// Development bypass backend.
pub use mock::MockAuthBackend;
/// Process-wide auth state.
pub use store::AuthStore;

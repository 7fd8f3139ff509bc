//! Chat session store, message dispatcher, and response collaborators.

pub mod dispatcher;
pub mod remote;
pub mod responder;
pub mod simulated;
pub mod store;

/// Dispatch loop and its options.
pub use dispatcher::{
    DEFAULT_RESPONSE_TIMEOUT, DispatchOutcome, DispatcherOptions, MessageDispatcher,
};
/// Remote chat API responder.
pub use remote::RemoteResponder;
/// Responder abstraction.
pub use responder::{ResponseRequest, Responder};
/// Offline canned-reply responder.
pub use simulated::{DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS, SimulatedResponder};
/// In-memory session list.
pub use store::SessionStore;

//! Session lifecycle events.
//!
//! Events fire from login, organization switch, logout, session
//! invalidation and invitation acceptance. If no listeners are registered
//! they are silently ignored.
//!
//! ```rust,ignore
//! use orgsession::register_event_listeners;
//! use orgsession::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::SessionEvent;
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};

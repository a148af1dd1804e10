use async_trait::async_trait;

use super::SessionEvent;

/// Handles session events asynchronously.
///
/// # Example
///
/// ```rust,ignore
/// use orgsession::events::{Listener, SessionEvent};
/// use async_trait::async_trait;
///
/// struct ToastListener;
///
/// #[async_trait]
/// impl Listener for ToastListener {
///     async fn handle(&self, event: &SessionEvent) {
///         if let SessionEvent::CredentialNotPersisted { .. } = event {
///             // tell the user to allow cookies
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Called for every dispatched event. Filter by matching on the variant.
    async fn handle(&self, event: &SessionEvent);
}

//! View navigation as seen by the interceptor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// A top-level view of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    /// Any other view, by route or tab name.
    Page(String),
}

impl View {
    pub fn is_login(&self) -> bool {
        matches!(self, Self::Login)
    }
}

/// What the interceptor needs from the host's router.
pub trait Navigator: Send + Sync {
    fn current_view(&self) -> View;

    /// Queues a redirect to the login view.
    ///
    /// Must not navigate synchronously: the caller is in the middle of
    /// handling a response.
    fn schedule_login_redirect(&self);
}

#[derive(Default)]
struct NavigatorState {
    view: RwLock<Option<View>>,
    pending: AtomicBool,
    scheduled: AtomicUsize,
    performed: AtomicUsize,
}

/// Navigator for headless hosts and tests.
///
/// A scheduled redirect is performed on a later turn of the tokio runtime,
/// or by an explicit [`flush`](HeadlessNavigator::flush) when no runtime is
/// running.
#[derive(Clone, Default)]
pub struct HeadlessNavigator {
    state: Arc<NavigatorState>,
}

impl HeadlessNavigator {
    /// Starts on the login view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts on the given view.
    pub fn at(view: View) -> Self {
        let navigator = Self::default();
        navigator.navigate(view);
        navigator
    }

    pub fn navigate(&self, view: View) {
        if let Ok(mut current) = self.state.view.write() {
            *current = Some(view);
        }
    }

    /// Performs a pending redirect, if any. Returns whether one was performed.
    pub fn flush(&self) -> bool {
        Self::perform(&self.state)
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Number of redirects ever scheduled.
    pub fn scheduled_redirects(&self) -> usize {
        self.state.scheduled.load(Ordering::SeqCst)
    }

    /// Number of redirects actually carried out.
    pub fn performed_redirects(&self) -> usize {
        self.state.performed.load(Ordering::SeqCst)
    }

    fn perform(state: &NavigatorState) -> bool {
        if !state.pending.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Ok(mut current) = state.view.write() {
            *current = Some(View::Login);
        }
        state.performed.fetch_add(1, Ordering::SeqCst);
        true
    }
}

impl Navigator for HeadlessNavigator {
    fn current_view(&self) -> View {
        self.state
            .view
            .read()
            .ok()
            .and_then(|view| view.clone())
            .unwrap_or(View::Login)
    }

    fn schedule_login_redirect(&self) {
        if self.state.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.scheduled.fetch_add(1, Ordering::SeqCst);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            handle.spawn(async move {
                tokio::task::yield_now().await;
                Self::perform(&state);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_login() {
        let navigator = HeadlessNavigator::new();
        assert!(navigator.current_view().is_login());
    }

    #[test]
    fn test_redirect_is_deferred_without_runtime() {
        let navigator = HeadlessNavigator::at(View::Page("clients".to_owned()));

        navigator.schedule_login_redirect();
        assert_eq!(navigator.current_view(), View::Page("clients".to_owned()));
        assert!(navigator.has_pending_redirect());

        assert!(navigator.flush());
        assert!(navigator.current_view().is_login());
        assert!(!navigator.flush());
    }

    #[test]
    fn test_schedule_collapses_while_pending() {
        let navigator = HeadlessNavigator::at(View::Page("clients".to_owned()));

        navigator.schedule_login_redirect();
        navigator.schedule_login_redirect();
        navigator.schedule_login_redirect();

        assert_eq!(navigator.scheduled_redirects(), 1);
        navigator.flush();
        assert_eq!(navigator.performed_redirects(), 1);
    }

    #[tokio::test]
    async fn test_redirect_runs_on_later_turn() {
        let navigator = HeadlessNavigator::at(View::Page("funnels".to_owned()));

        navigator.schedule_login_redirect();
        // still on the page in the current turn
        assert!(!navigator.current_view().is_login());

        for _ in 0..16 {
            if navigator.current_view().is_login() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(navigator.current_view().is_login());
        assert_eq!(navigator.performed_redirects(), 1);
    }
}

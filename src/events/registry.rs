use std::sync::OnceLock;

use super::{Listener, SessionEvent};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

/// Listeners registered for the process.
pub struct EventRegistry {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventRegistry {
    fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Listeners are called in registration order.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    async fn dispatch(&self, event: &SessionEvent) {
        log::trace!(
            target: "orgsession::events",
            "msg=\"dispatching event\" event={} listeners={}",
            event.name(),
            self.listeners.len()
        );
        for listener in &self.listeners {
            listener.handle(event).await;
        }
    }
}

/// Registers event listeners once, at application startup.
///
/// Only the first call takes effect; later calls log a warning.
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::new();
    f(&mut registry);
    if REGISTRY.set(registry).is_err() {
        log::warn!(
            target: "orgsession::events",
            "msg=\"register_event_listeners called more than once, ignoring\""
        );
    }
}

/// Sends an event to every registered listener. No-op without listeners.
pub async fn dispatch(event: SessionEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.dispatch(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Listener for Recorder {
        async fn handle(&self, event: &SessionEvent) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.tag, event.name()));
        }
    }

    #[tokio::test]
    async fn test_listeners_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventRegistry::new();
        registry
            .listen(Recorder {
                tag: "first",
                seen: Arc::clone(&seen),
            })
            .listen(Recorder {
                tag: "second",
                seen: Arc::clone(&seen),
            });
        assert_eq!(registry.len(), 2);

        registry
            .dispatch(&SessionEvent::CredentialNotPersisted { at: Utc::now() })
            .await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first:session.credential.not_persisted".to_owned(),
                "second:session.credential.not_persisted".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_registry_is_noop() {
        // nothing registered in this test binary's global registry is required
        dispatch(SessionEvent::LoggedOut {
            user_id: None,
            at: Utc::now(),
        })
        .await;
    }
}

use async_trait::async_trait;

use crate::events::{Listener, SessionEvent};

/// Logs every session event through the `log` facade.
///
/// Routine events go out at the configured level. Events that mean the user
/// lost their session or cannot keep one are always logged at WARN.
///
/// ```rust,ignore
/// use orgsession::register_event_listeners;
/// use orgsession::events::listeners::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::new());
/// });
/// ```
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Logs routine events at INFO.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }

    fn level_for(&self, event: &SessionEvent) -> log::Level {
        if event.is_failure() {
            log::Level::Warn.min(self.level)
        } else {
            self.level
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &SessionEvent) {
        log::log!(
            target: "orgsession::events",
            self.level_for(event),
            "msg=\"session event\" event={} org_id={:?} at={} detail=\"{:?}\"",
            event.name(),
            event.org_id(),
            event.timestamp().to_rfc3339(),
            event
        );
    }
}

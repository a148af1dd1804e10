use async_trait::async_trait;

use crate::events::{Listener, SessionEvent};

/// Emits session events as tracing events. Requires the `tracing` feature.
///
/// ```rust,ignore
/// register_event_listeners(|registry| {
///     registry.listen(TracingListener);
/// });
/// ```
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SessionInvalidated { reason, .. } => tracing::warn!(
                target: "orgsession::events",
                event_name = event.name(),
                reason = %reason,
                "session invalidated"
            ),
            _ if event.is_failure() => tracing::warn!(
                target: "orgsession::events",
                event_name = event.name(),
                ?event,
                "session event"
            ),
            _ => tracing::info!(
                target: "orgsession::events",
                event_name = event.name(),
                org_id = ?event.org_id(),
                "session event"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_tracing_listener_handle() {
        let listener = TracingListener;

        listener
            .handle(&SessionEvent::OrganizationSwitched {
                from: Some(1),
                to: 2,
                at: Utc::now(),
            })
            .await;
        listener
            .handle(&SessionEvent::SessionInvalidated {
                reason: "403 on GET /funnels".to_owned(),
                at: Utc::now(),
            })
            .await;
    }
}

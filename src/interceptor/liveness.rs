//! Periodic `GET /auth/me` probe.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::RequestInterceptor;
use crate::ClientConfig;
use crate::transport::ApiRequest;

const PROBE_PATH: &str = "/auth/me";
const MIN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive,
    /// The session is gone; the probe loop stops.
    SessionInvalid,
    /// Non-auth failure. Logged, counted, otherwise ignored.
    Failed,
    /// Nothing sent: no credential, hidden tab, or on the login view.
    Skipped,
}

struct ProbeState {
    interceptor: Arc<RequestInterceptor>,
    visible: AtomicBool,
    failures: AtomicU32,
    max_failures: Option<u32>,
    sent: AtomicUsize,
}

impl ProbeState {
    fn should_probe(&self) -> bool {
        self.interceptor.credentials().is_present()
            && self.visible.load(Ordering::SeqCst)
            && !self.interceptor.navigator().current_view().is_login()
    }

    async fn probe(&self) -> ProbeOutcome {
        if !self.should_probe() {
            return ProbeOutcome::Skipped;
        }
        self.sent.fetch_add(1, Ordering::SeqCst);

        match self.interceptor.dispatch(ApiRequest::get(PROBE_PATH)).await {
            Ok(Some(_)) => {
                self.failures.store(0, Ordering::SeqCst);
                ProbeOutcome::Alive
            }
            Ok(None) if !self.interceptor.credentials().is_present() => {
                ProbeOutcome::SessionInvalid
            }
            // answered for a credential that has since been replaced
            Ok(None) => ProbeOutcome::Skipped,
            Err(e) => {
                let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                log::warn!(
                    target: "orgsession::interceptor",
                    "msg=\"liveness probe failed\" consecutive_failures={failures} error=\"{e}\""
                );
                match self.max_failures {
                    Some(max) if failures >= max => {
                        self.interceptor
                            .invalidate_session(&format!("liveness probe failed {failures} times"))
                            .await;
                        ProbeOutcome::SessionInvalid
                    }
                    _ => ProbeOutcome::Failed,
                }
            }
        }
    }
}

/// Keeps a session honest while the user sits on a page.
///
/// While a credential exists, the tab is visible and the view is not the
/// login view, a probe is sent every interval (half the credential TTL by
/// default) and again whenever the tab becomes visible. A 401/403 goes
/// through the interceptor like any other call. The loop ends on its own once
/// the credential is gone and is aborted by [`stop`](Self::stop) on logout.
pub struct LivenessProbe {
    state: Arc<ProbeState>,
    interval: std::time::Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LivenessProbe {
    pub fn new(interceptor: Arc<RequestInterceptor>, config: &ClientConfig) -> Self {
        let configured = config.probe_interval();
        let interval = configured.to_std().unwrap_or_default().max(MIN_INTERVAL);
        if configured < chrono::Duration::seconds(1) {
            log::warn!(
                target: "orgsession::interceptor",
                "msg=\"probe interval too short, clamped\" configured_ms={} interval_ms={}",
                configured.num_milliseconds(),
                interval.as_millis()
            );
        }

        Self {
            state: Arc::new(ProbeState {
                interceptor,
                visible: AtomicBool::new(true),
                failures: AtomicU32::new(0),
                max_failures: config.liveness.max_consecutive_failures,
                sent: AtomicUsize::new(0),
            }),
            interval,
            task: Mutex::new(None),
        }
    }

    /// Starts the probe loop. No-op if it is already running or if there is
    /// no tokio runtime.
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::debug!(
                target: "orgsession::interceptor",
                "msg=\"no runtime, liveness probe not started\""
            );
            return;
        };

        self.state.failures.store(0, Ordering::SeqCst);
        let state = Arc::clone(&self.state);
        let interval = self.interval;

        *task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !state.interceptor.credentials().is_present() {
                    break;
                }
                if state.probe().await == ProbeOutcome::SessionInvalid {
                    break;
                }
            }
            log::debug!(
                target: "orgsession::interceptor",
                "msg=\"liveness probe stopped\""
            );
        }));
    }

    /// Aborts the probe loop.
    pub fn stop(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    pub fn interval(&self) -> std::time::Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .ok()
            .is_some_and(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
    }

    /// Records tab visibility. Becoming visible triggers an immediate probe.
    pub async fn set_visibility(&self, visible: bool) -> ProbeOutcome {
        let was_visible = self.state.visible.swap(visible, Ordering::SeqCst);
        if visible && !was_visible {
            self.state.probe().await
        } else {
            ProbeOutcome::Skipped
        }
    }

    /// Probes once, outside the schedule.
    pub async fn probe_now(&self) -> ProbeOutcome {
        self.state.probe().await
    }

    /// Probes actually sent so far.
    pub fn probes_sent(&self) -> usize {
        self.state.sent.load(Ordering::SeqCst)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.failures.load(Ordering::SeqCst)
    }
}

impl Drop for LivenessProbe {
    fn drop(&mut self) {
        self.stop();
    }
}

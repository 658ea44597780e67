//! Session observer registry.
//!
//! Manages one recurring watch per observed remote session ID. Interest is
//! reference-counted: multiple callers observing the same ID share one
//! underlying poll task, and the task is torn down (aborting any in-flight
//! fetch) only when the last caller stops observing.
//!
//! Each watch publishes strictly newer snapshots to subscribers as
//! [`SessionEvent::SnapshotReceived`]. Publication is revision-gated under
//! a per-session lock, so snapshots are observed in order and stale ones
//! are dropped silently. Transient fetch failures are retried with
//! exponential backoff and never surfaced to callers; observation is
//! best-effort refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use overlap_core::remote::RemoteSessionStore;
use overlap_core::session::{HostedSession, SessionEvent};

use crate::config::SyncConfig;

type SharedSnapshot = Arc<RwLock<Option<HostedSession>>>;

struct Observation {
    /// Number of callers interested in this session ID.
    interest: usize,
    /// Latest snapshot seen for this session.
    latest: SharedSnapshot,
    /// The recurring poll task.
    task: JoinHandle<()>,
}

/// Registry of active session observations.
pub struct SessionObserverRegistry {
    store: Arc<dyn RemoteSessionStore>,
    events: broadcast::Sender<SessionEvent>,
    observations: RwLock<HashMap<String, Observation>>,
    poll_interval: Duration,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl SessionObserverRegistry {
    /// Creates a registry with the given collaborators and configuration.
    pub fn new(
        store: Arc<dyn RemoteSessionStore>,
        events: broadcast::Sender<SessionEvent>,
        config: &SyncConfig,
    ) -> Self {
        Self::with_timing(
            store,
            events,
            config.poll_interval(),
            config.backoff_base(),
            config.backoff_max(),
        )
    }

    /// Creates a registry with explicit timing, bypassing `SyncConfig`.
    pub fn with_timing(
        store: Arc<dyn RemoteSessionStore>,
        events: broadcast::Sender<SessionEvent>,
        poll_interval: Duration,
        backoff_base: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            store,
            events,
            observations: RwLock::new(HashMap::new()),
            poll_interval,
            backoff_base,
            backoff_max,
        }
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Registers interest in a session, starting its watch if not active.
    ///
    /// Starting observation for an ID that is already observed is a no-op
    /// on the underlying watch but still counts the caller's interest.
    pub async fn start_observation(&self, session_id: &str) {
        let mut observations = self.observations.write().await;
        if let Some(entry) = observations.get_mut(session_id) {
            entry.interest += 1;
            tracing::debug!(
                target: "observer",
                "Observation interest for session {} now {}",
                session_id,
                entry.interest
            );
            return;
        }

        let latest: SharedSnapshot = Arc::new(RwLock::new(None));
        let task = tokio::spawn(Self::poll_loop(
            Arc::clone(&self.store),
            session_id.to_string(),
            Arc::clone(&latest),
            self.events.clone(),
            self.poll_interval,
            self.backoff_base,
            self.backoff_max,
        ));
        observations.insert(
            session_id.to_string(),
            Observation {
                interest: 1,
                latest,
                task,
            },
        );
        tracing::debug!(target: "observer", "Observation started for session {}", session_id);
    }

    /// Releases one caller's interest in a session; tears the watch down
    /// when no interest remains.
    pub async fn stop_observation(&self, session_id: &str) {
        let mut observations = self.observations.write().await;
        let Some(entry) = observations.get_mut(session_id) else {
            return;
        };
        entry.interest = entry.interest.saturating_sub(1);
        if entry.interest > 0 {
            return;
        }
        if let Some(entry) = observations.remove(session_id) {
            entry.task.abort();
            tracing::debug!(target: "observer", "Observation stopped for session {}", session_id);
        }
    }

    /// Whether a session ID currently has an active watch.
    pub async fn is_observing(&self, session_id: &str) -> bool {
        self.observations.read().await.contains_key(session_id)
    }

    /// IDs of all currently observed sessions.
    pub async fn observed_sessions(&self) -> Vec<String> {
        self.observations.read().await.keys().cloned().collect()
    }

    /// The latest snapshot known for a session, if any has arrived.
    pub async fn latest(&self, session_id: &str) -> Option<HostedSession> {
        let latest = {
            let observations = self.observations.read().await;
            Arc::clone(&observations.get(session_id)?.latest)
        };
        let snapshot = latest.read().await;
        snapshot.clone()
    }

    /// Fetches every observed session once, immediately.
    ///
    /// Used for pull-to-refresh. Failures are logged and skipped;
    /// observation is best-effort. Returns how many sessions yielded a new
    /// snapshot.
    pub async fn refresh_all(&self) -> usize {
        let targets: Vec<(String, SharedSnapshot)> = {
            let observations = self.observations.read().await;
            observations
                .iter()
                .map(|(id, entry)| (id.clone(), Arc::clone(&entry.latest)))
                .collect()
        };

        let mut refreshed = 0;
        for (session_id, latest) in targets {
            match self.store.fetch_session(&session_id).await {
                Ok(hosted) => {
                    if Self::publish_if_newer(&latest, &self.events, hosted).await {
                        refreshed += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        target: "observer",
                        "Manual refresh failed for session {}: {}",
                        session_id,
                        err
                    );
                }
            }
        }
        refreshed
    }

    /// Tears down every watch. Used on shutdown.
    pub async fn shutdown(&self) {
        let mut observations = self.observations.write().await;
        for (session_id, entry) in observations.drain() {
            entry.task.abort();
            tracing::debug!(target: "observer", "Observation stopped for session {}", session_id);
        }
    }

    async fn poll_loop(
        store: Arc<dyn RemoteSessionStore>,
        session_id: String,
        latest: SharedSnapshot,
        events: broadcast::Sender<SessionEvent>,
        poll_interval: Duration,
        backoff_base: Duration,
        backoff_max: Duration,
    ) {
        let mut delay = poll_interval;
        let mut backoff = backoff_base;
        loop {
            match store.fetch_session(&session_id).await {
                Ok(hosted) => {
                    delay = poll_interval;
                    backoff = backoff_base;
                    Self::publish_if_newer(&latest, &events, hosted).await;
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        target: "observer",
                        "Refresh failed for session {}: {} (retrying in {:?})",
                        session_id,
                        err,
                        backoff
                    );
                    delay = backoff;
                    backoff = (backoff * 2).min(backoff_max);
                }
                Err(err) => {
                    // The record is gone (or the failure is not worth
                    // retrying); polling cannot revive it.
                    tracing::warn!(
                        target: "observer",
                        "Stopping observation for session {}: {}",
                        session_id,
                        err
                    );
                    break;
                }
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Publishes a snapshot if it is strictly newer than the latest one.
    ///
    /// The revision gate and the send both happen under the per-session
    /// write lock, so concurrent publishers (the poll task and a manual
    /// refresh) can never deliver snapshots out of order.
    async fn publish_if_newer(
        latest: &SharedSnapshot,
        events: &broadcast::Sender<SessionEvent>,
        hosted: HostedSession,
    ) -> bool {
        let mut guard = latest.write().await;
        if let Some(current) = guard.as_ref() {
            if hosted.revision <= current.revision {
                tracing::debug!(
                    target: "observer",
                    "Stale snapshot ignored for session {} (revision {} <= {})",
                    hosted.session_id,
                    hosted.revision,
                    current.revision
                );
                return false;
            }
        }
        let event = SessionEvent::SnapshotReceived {
            session_id: hosted.session_id.clone(),
            hosted: hosted.clone(),
        };
        *guard = Some(hosted);
        // Send while still holding the lock to keep delivery ordered.
        // No receivers is fine; observation does not require listeners.
        let _ = events.send(event);
        true
    }
}

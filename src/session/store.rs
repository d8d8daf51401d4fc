//! In-memory session store with idle sweeping.
//!
//! Sessions live behind per-session locks so concurrent runs on
//! different sessions never contend. The store sweeps in two phases:
//! idle sessions are archived, and sessions that stay archived for a
//! further timeout are purged from memory entirely. Archival and
//! purge both notify subscribed handlers, which is the seam a
//! persistence adapter would plug into.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{StoreError, StoreResult};
use crate::task::ProblemContext;

use super::{Session, SessionStatus};

/// Time source for the store.
///
/// Injected so tests can drive archival and purge deadlines without
/// real waiting.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Notification that a session left the active set.
///
/// Emitted once when a session is archived and once more if it is
/// later purged, with `status` telling the two apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionArchived {
    pub session_id: String,
    pub status: SessionStatus,
    pub archived_at: DateTime<Utc>,
}

/// Receives archival notifications.
///
/// A failing handler is logged and skipped; it never blocks archival.
#[cfg_attr(test, mockall::automock)]
pub trait ArchivalEventHandler: Send + Sync {
    fn on_archival(&self, event: &SessionArchived) -> Result<(), String>;
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub archived: usize,
    pub purged: usize,
}

/// Bounded, thread-safe session registry.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    handlers: RwLock<Vec<Arc<dyn ArchivalEventHandler>>>,
    clock: Arc<dyn Clock>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            handlers: RwLock::new(Vec::new()),
            clock,
            max_sessions: config.max_sessions,
            idle_timeout: Duration::milliseconds(config.session_timeout_ms as i64),
        }
    }

    pub fn with_system_clock(config: &SessionConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Create a new session.
    ///
    /// When the store is full it first sweeps idle sessions to make
    /// room; if the store is still full afterwards the create fails
    /// with `CapacityExceeded`.
    pub fn create(
        &self,
        content: impl Into<String>,
        context: ProblemContext,
    ) -> StoreResult<Session> {
        if self.count() >= self.max_sessions {
            let stats = self.sweep();
            debug!(
                archived = stats.archived,
                purged = stats.purged,
                "Swept idle sessions before create"
            );
        }

        let mut sessions = self.sessions.write().unwrap();
        if sessions.len() >= self.max_sessions {
            return Err(StoreError::CapacityExceeded {
                limit: self.max_sessions,
            });
        }

        let session = Session::new(content, context, self.clock.now());
        sessions.insert(session.id.clone(), Arc::new(Mutex::new(session.clone())));
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Snapshot of a session by id.
    pub fn get(&self, session_id: &str) -> StoreResult<Session> {
        let handle = self.handle(session_id)?;
        let guard = handle.try_lock().map_err(|_| StoreError::SessionBusy {
            session_id: session_id.to_string(),
        })?;
        Ok(guard.clone())
    }

    /// Apply a mutation under the session lock and bump `updated_at`.
    pub fn update<F>(&self, session_id: &str, mutate: F) -> StoreResult<Session>
    where
        F: FnOnce(&mut Session),
    {
        let handle = self.handle(session_id)?;
        let mut guard = handle.try_lock().map_err(|_| StoreError::SessionBusy {
            session_id: session_id.to_string(),
        })?;
        mutate(&mut guard);
        guard.updated_at = self.clock.now();
        Ok(guard.clone())
    }

    /// Move a session to a new status.
    ///
    /// Rejects transitions the status machine does not allow. Moving
    /// into `Archived` notifies the archival handlers.
    pub fn set_status(&self, session_id: &str, status: SessionStatus) -> StoreResult<Session> {
        let handle = self.handle(session_id)?;
        let snapshot = {
            let mut guard = handle.try_lock().map_err(|_| StoreError::SessionBusy {
                session_id: session_id.to_string(),
            })?;
            if !guard.status.can_transition(status) {
                return Err(StoreError::InvalidStatus {
                    session_id: session_id.to_string(),
                    status: format!("{}, cannot move to {}", guard.status, status),
                });
            }
            guard.status = status;
            guard.updated_at = self.clock.now();
            guard.clone()
        };

        debug!(session_id = %snapshot.id, status = %snapshot.status, "Session status changed");
        if status == SessionStatus::Archived {
            self.notify(&snapshot);
        }
        Ok(snapshot)
    }

    /// Archive a session immediately, notifying archival handlers.
    pub fn archive(&self, session_id: &str) -> StoreResult<Session> {
        self.set_status(session_id, SessionStatus::Archived)
    }

    /// Remove an archived session from the store.
    pub fn purge(&self, session_id: &str) -> StoreResult<Session> {
        let handle = self.handle(session_id)?;
        let snapshot = {
            let mut guard = handle.try_lock().map_err(|_| StoreError::SessionBusy {
                session_id: session_id.to_string(),
            })?;
            if !guard.status.can_transition(SessionStatus::Purged) {
                return Err(StoreError::InvalidStatus {
                    session_id: session_id.to_string(),
                    status: format!("{}, cannot move to {}", guard.status, SessionStatus::Purged),
                });
            }
            guard.status = SessionStatus::Purged;
            guard.clone()
        };

        self.sessions.write().unwrap().remove(session_id);
        info!(session_id = %snapshot.id, "Session purged");
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Register a handler for archival and purge notifications.
    pub fn subscribe_archival(&self, handler: Arc<dyn ArchivalEventHandler>) {
        self.handlers.write().unwrap().push(handler);
    }

    /// Archive idle sessions and purge long-archived ones.
    ///
    /// A session idle past the timeout is archived; archival bumps
    /// `updated_at`, so an archived session is purged once a further
    /// full timeout passes without activity. Sessions whose lock is
    /// held are mid-run and skipped.
    pub fn sweep(&self) -> SweepStats {
        let now = self.clock.now();
        let handles: Vec<(String, Arc<Mutex<Session>>)> = self
            .sessions
            .read()
            .unwrap()
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();

        let mut snapshots = Vec::new();
        let mut purged_ids = Vec::new();
        for (session_id, handle) in handles {
            let Ok(mut guard) = handle.try_lock() else {
                continue;
            };
            let idle = now - guard.updated_at;
            if idle < self.idle_timeout {
                continue;
            }
            if guard.status == SessionStatus::Archived {
                guard.status = SessionStatus::Purged;
                purged_ids.push(session_id);
                snapshots.push(guard.clone());
            } else if !guard.status.is_terminal() {
                guard.status = SessionStatus::Archived;
                guard.updated_at = now;
                snapshots.push(guard.clone());
            }
        }

        if !purged_ids.is_empty() {
            let mut sessions = self.sessions.write().unwrap();
            for session_id in &purged_ids {
                sessions.remove(session_id);
            }
        }
        for snapshot in &snapshots {
            self.notify(snapshot);
        }

        let stats = SweepStats {
            archived: snapshots.len() - purged_ids.len(),
            purged: purged_ids.len(),
        };
        if stats.archived > 0 || stats.purged > 0 {
            info!(
                archived = stats.archived,
                purged = stats.purged,
                "Swept idle sessions"
            );
        }
        stats
    }

    pub fn count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn handle(&self, session_id: &str) -> StoreResult<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    fn notify(&self, session: &Session) {
        let event = SessionArchived {
            session_id: session.id.clone(),
            status: session.status,
            archived_at: self.clock.now(),
        };
        let handlers: Vec<Arc<dyn ArchivalEventHandler>> = self.handlers.read().unwrap().clone();
        for handler in &handlers {
            if let Err(error) = handler.on_archival(&event) {
                warn!(session_id = %session.id, error = %error, "Archival handler failed");
            }
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Mutex as StdMutex;
    use std::thread;

    use super::*;
    use crate::task::ProblemContext;

    fn test_config() -> SessionConfig {
        SessionConfig {
            max_sessions: 4,
            session_timeout_ms: 60_000,
        }
    }

    /// Clock whose reported time is shared with the test body.
    fn manual_clock(start: DateTime<Utc>) -> (Arc<MockClock>, Arc<StdMutex<DateTime<Utc>>>) {
        let current = Arc::new(StdMutex::new(start));
        let shared = Arc::clone(&current);
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || *shared.lock().unwrap());
        (Arc::new(clock), current)
    }

    fn advance(current: &Arc<StdMutex<DateTime<Utc>>>, ms: i64) {
        *current.lock().unwrap() += Duration::milliseconds(ms);
    }

    /// Handler that tallies events by status.
    struct CountingHandler {
        archived: AtomicUsize,
        purged: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                archived: AtomicUsize::new(0),
                purged: AtomicUsize::new(0),
            })
        }
    }

    impl ArchivalEventHandler for CountingHandler {
        fn on_archival(&self, event: &SessionArchived) -> Result<(), String> {
            match event.status {
                SessionStatus::Archived => self.archived.fetch_add(1, Ordering::SeqCst),
                SessionStatus::Purged => self.purged.fetch_add(1, Ordering::SeqCst),
                other => return Err(format!("unexpected event status {other}")),
            };
            Ok(())
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store
            .create("The report is complete.", ProblemContext::default())
            .unwrap();

        let fetched = store.get(&session.id).unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.content, "The report is complete.");
        assert_eq!(fetched.status, SessionStatus::Created);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_get_unknown_session() {
        let store = SessionStore::with_system_clock(&test_config());
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound { .. }));
    }

    #[test]
    fn test_capacity_exceeded_when_nothing_idle() {
        let config = SessionConfig {
            max_sessions: 2,
            session_timeout_ms: 60_000,
        };
        let store = SessionStore::with_system_clock(&config);
        store.create("first", ProblemContext::default()).unwrap();
        store.create("second", ProblemContext::default()).unwrap();

        let err = store
            .create("third", ProblemContext::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { limit: 2 }));
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_create_sweeps_idle_sessions_to_make_room() {
        let config = SessionConfig {
            max_sessions: 1,
            session_timeout_ms: 60_000,
        };
        let (clock, current) = manual_clock(Utc::now());
        let store = SessionStore::new(&config, clock);
        let first = store.create("first", ProblemContext::default()).unwrap();

        // One timeout in, the pre-create sweep only archives; the
        // slot stays occupied and the create still fails.
        advance(&current, 60_001);
        let err = store
            .create("second", ProblemContext::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { limit: 1 }));
        assert_eq!(
            store.get(&first.id).unwrap().status,
            SessionStatus::Archived
        );

        // A further timeout later the sweep purges and the create fits.
        advance(&current, 60_001);
        let second = store.create("second", ProblemContext::default()).unwrap();
        assert_eq!(store.count(), 1);
        assert!(store.get(&first.id).is_err());
        assert_eq!(store.get(&second.id).unwrap().content, "second");
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let (clock, current) = manual_clock(Utc::now());
        let store = SessionStore::new(&test_config(), clock);
        let session = store.create("content", ProblemContext::default()).unwrap();

        advance(&current, 5_000);
        let updated = store
            .update(&session.id, |s| {
                s.state.iterations = 2;
            })
            .unwrap();

        assert_eq!(updated.state.iterations, 2);
        assert_eq!(
            updated.updated_at - session.created_at,
            Duration::milliseconds(5_000)
        );
    }

    #[test]
    fn test_status_transitions() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();

        store
            .set_status(&session.id, SessionStatus::StrategySelected)
            .unwrap();
        store
            .set_status(&session.id, SessionStatus::Processing)
            .unwrap();
        store
            .set_status(&session.id, SessionStatus::Synthesizing)
            .unwrap();
        let finalized = store
            .set_status(&session.id, SessionStatus::Finalized)
            .unwrap();
        assert_eq!(finalized.status, SessionStatus::Finalized);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();

        let err = store
            .set_status(&session.id, SessionStatus::Finalized)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus { .. }));
        assert_eq!(
            store.get(&session.id).unwrap().status,
            SessionStatus::Created
        );
    }

    #[test]
    fn test_archive_notifies_exactly_once() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();

        let session_id = session.id.clone();
        let mut mock = MockArchivalEventHandler::new();
        mock.expect_on_archival()
            .withf(move |event| {
                event.session_id == session_id && event.status == SessionStatus::Archived
            })
            .times(1)
            .returning(|_| Ok(()));
        store.subscribe_archival(Arc::new(mock));

        store.archive(&session.id).unwrap();

        // A second archive is an invalid transition and emits nothing;
        // the mock's expectation would fail on a second call.
        let err = store.archive(&session.id).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus { .. }));
    }

    #[test]
    fn test_purge_notifies_with_purged_status() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();
        let handler = CountingHandler::new();
        store.subscribe_archival(handler.clone());

        store.archive(&session.id).unwrap();
        store.purge(&session.id).unwrap();

        assert_eq!(handler.archived.load(Ordering::SeqCst), 1);
        assert_eq!(handler.purged.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_handler_does_not_block_archival() {
        struct FailingHandler;
        impl ArchivalEventHandler for FailingHandler {
            fn on_archival(&self, _event: &SessionArchived) -> Result<(), String> {
                Err("sink offline".to_string())
            }
        }

        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();
        let counting = CountingHandler::new();
        store.subscribe_archival(Arc::new(FailingHandler));
        store.subscribe_archival(counting.clone());

        let archived = store.archive(&session.id).unwrap();
        assert_eq!(archived.status, SessionStatus::Archived);
        assert_eq!(counting.archived.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_purge_requires_archived() {
        let store = SessionStore::with_system_clock(&test_config());
        let session = store.create("content", ProblemContext::default()).unwrap();

        let err = store.purge(&session.id).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus { .. }));

        store.archive(&session.id).unwrap();
        let purged = store.purge(&session.id).unwrap();
        assert_eq!(purged.status, SessionStatus::Purged);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_sweep_two_phase_lifecycle() {
        let (clock, current) = manual_clock(Utc::now());
        let store = SessionStore::new(&test_config(), clock);
        let session = store.create("content", ProblemContext::default()).unwrap();
        let handler = CountingHandler::new();
        store.subscribe_archival(handler.clone());

        // Not idle yet.
        advance(&current, 30_000);
        assert_eq!(store.sweep(), SweepStats::default());
        assert_eq!(
            store.get(&session.id).unwrap().status,
            SessionStatus::Created
        );

        // Past the timeout: archived, one notification.
        advance(&current, 30_001);
        let stats = store.sweep();
        assert_eq!(
            stats,
            SweepStats {
                archived: 1,
                purged: 0
            }
        );
        assert_eq!(handler.archived.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get(&session.id).unwrap().status,
            SessionStatus::Archived
        );

        // Archival reset the idle clock, so a prompt re-sweep is a no-op.
        assert_eq!(store.sweep(), SweepStats::default());
        assert_eq!(handler.archived.load(Ordering::SeqCst), 1);

        // A further full timeout later the archived session is purged.
        advance(&current, 60_001);
        let stats = store.sweep();
        assert_eq!(
            stats,
            SweepStats {
                archived: 0,
                purged: 1
            }
        );
        assert_eq!(handler.archived.load(Ordering::SeqCst), 1);
        assert_eq!(handler.purged.load(Ordering::SeqCst), 1);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_sweep_skips_busy_sessions() {
        let (clock, current) = manual_clock(Utc::now());
        let store = Arc::new(SessionStore::new(&test_config(), clock));
        let session = store.create("content", ProblemContext::default()).unwrap();
        advance(&current, 60_001);

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let worker_store = Arc::clone(&store);
        let session_id = session.id.clone();
        let worker = thread::spawn(move || {
            worker_store
                .update(&session_id, |_| {
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
        });

        locked_rx.recv().unwrap();
        assert_eq!(store.sweep(), SweepStats::default());
        release_tx.send(()).unwrap();
        worker.join().unwrap();

        // The update bumped updated_at, so the session is live again.
        assert_eq!(
            store.get(&session.id).unwrap().status,
            SessionStatus::Created
        );
    }

    #[test]
    fn test_busy_session_reported() {
        let store = Arc::new(SessionStore::with_system_clock(&test_config()));
        let session = store.create("content", ProblemContext::default()).unwrap();

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let worker_store = Arc::clone(&store);
        let session_id = session.id.clone();
        let worker = thread::spawn(move || {
            worker_store
                .update(&session_id, |_| {
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
        });

        locked_rx.recv().unwrap();
        let err = store.get(&session.id).unwrap_err();
        assert!(matches!(err, StoreError::SessionBusy { .. }));
        release_tx.send(()).unwrap();
        worker.join().unwrap();

        assert!(store.get(&session.id).is_ok());
    }

    #[test]
    fn test_session_ids_sorted() {
        let store = SessionStore::with_system_clock(&test_config());
        let a = store.create("a", ProblemContext::default()).unwrap();
        let b = store.create("b", ProblemContext::default()).unwrap();

        let ids = store.session_ids();
        assert_eq!(ids.len(), 2);
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}

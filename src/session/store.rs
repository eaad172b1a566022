//! Session records and the in-memory store.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::clock::{bounded_seconds, expires_after, SharedClock};
use crate::config::SessionConfig;
use crate::observability::metrics;
use crate::submission::{DraftSubmission, SubmissionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Unknown id, or a record whose expiry has passed.
    #[error("session not found")]
    NotFound,
    /// A finalize call holds the session.
    #[error("session is being finalized")]
    Locked,
    /// The session was not in the expected state.
    #[error("session state changed concurrently")]
    Conflict,
}

/// A stored draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub payload: DraftSubmission,
    pub state: SubmissionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Storage contract used by the orchestrator.
pub trait SessionStore: Send + Sync {
    fn create(&self, payload: DraftSubmission) -> Session;

    fn get(&self, id: &str) -> Result<Session, SessionError>;

    /// Replace the payload and slide the expiry. Returns the new expiry.
    fn update(&self, id: &str, payload: DraftSubmission) -> Result<DateTime<Utc>, SessionError>;

    fn delete(&self, id: &str) -> Result<(), SessionError>;

    /// Compare-and-set on the state. Does not slide the expiry.
    fn transition(
        &self,
        id: &str,
        from: SubmissionState,
        to: SubmissionState,
    ) -> Result<Session, SessionError>;

    /// Drop every expired record. Returns how many were removed.
    fn sweep_expired(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Sessions held in a [`DashMap`], optionally snapshotted to a JSON file.
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    clock: SharedClock,
    persistence_path: Option<PathBuf>,
}

impl MemorySessionStore {
    pub fn new(config: &SessionConfig, clock: SharedClock) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: bounded_seconds(config.ttl_secs),
            clock,
            persistence_path: config.persistence_path.as_ref().map(PathBuf::from),
        }
    }

    /// Restore live sessions from the snapshot file, if one exists.
    ///
    /// Expired records are skipped. Sessions caught mid-finalize come back as
    /// drafts since the finalize call that held them is gone.
    pub fn load_from_file(&self) -> std::io::Result<usize> {
        let Some(path) = &self.persistence_path else {
            return Ok(0);
        };
        if !Path::new(path).exists() {
            return Ok(0);
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Vec<Session> = serde_json::from_reader(reader)?;
        let now = self.clock.now();
        let total = snapshot.len();

        let mut restored = 0;
        for mut session in snapshot {
            if session.is_expired(now) {
                continue;
            }
            session.state = SubmissionState::Draft;
            self.sessions.insert(session.id.clone(), session);
            restored += 1;
        }

        metrics::record_active_sessions(self.sessions.len());
        tracing::info!(
            path = %path.display(),
            restored,
            skipped = total - restored,
            "Loaded sessions from snapshot"
        );
        Ok(restored)
    }

    /// Write every live session to the snapshot file.
    ///
    /// The snapshot is written beside the target and renamed over it, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let now = self.clock.now();
        let snapshot: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone())
            .collect();

        let staging = staging_path(path);
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&staging, path)?;
        tracing::info!(path = %path.display(), sessions = snapshot.len(), "Saved session snapshot");
        Ok(())
    }

    fn evict_if_expired(&self, id: &str, now: DateTime<Utc>) {
        if self
            .sessions
            .remove_if(id, |_, session| session.is_expired(now))
            .is_some()
        {
            metrics::record_session_event("expired");
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl SessionStore for MemorySessionStore {
    fn create(&self, payload: DraftSubmission) -> Session {
        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            payload,
            state: SubmissionState::Draft,
            created_at: now,
            updated_at: now,
            expires_at: expires_after(now, self.ttl),
        };
        self.sessions.insert(session.id.clone(), session.clone());

        metrics::record_session_event("created");
        metrics::record_active_sessions(self.sessions.len());
        tracing::debug!(session_id = %session.id, "Session created");
        session
    }

    fn get(&self, id: &str) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let found = self.sessions.get(id).map(|entry| entry.value().clone());
        match found {
            Some(session) if !session.is_expired(now) => Ok(session),
            Some(_) => {
                self.evict_if_expired(id, now);
                Err(SessionError::NotFound)
            }
            None => Err(SessionError::NotFound),
        }
    }

    fn update(&self, id: &str, payload: DraftSubmission) -> Result<DateTime<Utc>, SessionError> {
        let now = self.clock.now();
        {
            let Some(mut session) = self.sessions.get_mut(id) else {
                return Err(SessionError::NotFound);
            };
            if !session.is_expired(now) {
                if session.state == SubmissionState::PendingConfirmation {
                    return Err(SessionError::Locked);
                }
                session.payload = payload;
                session.updated_at = now;
                session.expires_at = expires_after(now, self.ttl);
                metrics::record_session_event("updated");
                return Ok(session.expires_at);
            }
        }
        self.evict_if_expired(id, now);
        Err(SessionError::NotFound)
    }

    fn delete(&self, id: &str) -> Result<(), SessionError> {
        let now = self.clock.now();
        let removed = self.sessions.remove(id);
        metrics::record_active_sessions(self.sessions.len());
        match removed {
            Some((_, session)) if !session.is_expired(now) => {
                metrics::record_session_event("deleted");
                Ok(())
            }
            Some(_) => {
                metrics::record_session_event("expired");
                Err(SessionError::NotFound)
            }
            None => Err(SessionError::NotFound),
        }
    }

    fn transition(
        &self,
        id: &str,
        from: SubmissionState,
        to: SubmissionState,
    ) -> Result<Session, SessionError> {
        let now = self.clock.now();
        {
            let Some(mut session) = self.sessions.get_mut(id) else {
                return Err(SessionError::NotFound);
            };
            if !session.is_expired(now) {
                if session.state != from {
                    return Err(SessionError::Conflict);
                }
                session.state = to;
                tracing::debug!(
                    session_id = %id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "Session state changed"
                );
                return Ok(session.clone());
            }
        }
        self.evict_if_expired(id, now);
        Err(SessionError::NotFound)
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        metrics::record_active_sessions(self.sessions.len());
        removed
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};

    fn store_with(clock: &ManualClock, path: Option<String>) -> MemorySessionStore {
        let config = SessionConfig {
            ttl_secs: 4 * 3600,
            persistence_path: path,
        };
        MemorySessionStore::new(&config, Arc::new(clock.clone()))
    }

    fn payload(last_name: &str) -> DraftSubmission {
        DraftSubmission {
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        let session = store.create(payload("山田"));

        assert_eq!(session.id.len(), 32);
        assert_eq!(session.expires_at - session.created_at, Duration::hours(4));
        assert_eq!(store.get(&session.id).unwrap().payload.last_name, "山田");
        assert_eq!(store.get("missing"), Err(SessionError::NotFound));
    }

    #[test]
    fn test_expired_session_is_not_found_before_sweep() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        let id = store.create(payload("山田")).id;

        clock.advance(Duration::hours(4) - Duration::seconds(1));
        assert!(store.get(&id).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(store.get(&id), Err(SessionError::NotFound));
        assert_eq!(store.update(&id, payload("x")), Err(SessionError::NotFound));
        assert!(store.is_empty(), "expired record evicted on read");
    }

    #[test]
    fn test_update_slides_expiry() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        let id = store.create(payload("山田")).id;

        clock.advance(Duration::hours(3));
        let expires_at = store.update(&id, payload("佐藤")).unwrap();
        assert_eq!(expires_at, clock.now() + Duration::hours(4));

        clock.advance(Duration::hours(3));
        let session = store.get(&id).unwrap();
        assert_eq!(session.payload.last_name, "佐藤");
        assert!(session.updated_at > session.created_at);
    }

    #[test]
    fn test_delete() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        let id = store.create(payload("山田")).id;

        assert_eq!(store.delete(&id), Ok(()));
        assert_eq!(store.delete(&id), Err(SessionError::NotFound));
        assert_eq!(store.get(&id), Err(SessionError::NotFound));
    }

    #[test]
    fn test_transition_is_compare_and_set() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        let id = store.create(payload("山田")).id;
        let expires_at = store.get(&id).unwrap().expires_at;

        clock.advance(Duration::minutes(5));
        let locked = store
            .transition(&id, SubmissionState::Draft, SubmissionState::PendingConfirmation)
            .unwrap();
        assert_eq!(locked.state, SubmissionState::PendingConfirmation);
        assert_eq!(locked.expires_at, expires_at, "transition does not slide");

        assert_eq!(
            store.transition(&id, SubmissionState::Draft, SubmissionState::PendingConfirmation),
            Err(SessionError::Conflict)
        );
        assert_eq!(store.update(&id, payload("x")), Err(SessionError::Locked));

        store
            .transition(&id, SubmissionState::PendingConfirmation, SubmissionState::Draft)
            .unwrap();
        assert!(store.update(&id, payload("x")).is_ok());
    }

    #[test]
    fn test_concurrent_updates_keep_one_whole_payload() {
        let clock = ManualClock::default();
        let store = Arc::new(store_with(&clock, None));
        let id = store.create(payload("init")).id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    let mut draft = payload(&format!("name{i}"));
                    draft.first_name = format!("name{i}");
                    store.update(&id, draft).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let session = store.get(&id).unwrap();
        assert_eq!(session.payload.last_name, session.payload.first_name);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let clock = ManualClock::default();
        let store = store_with(&clock, None);
        store.create(payload("a"));
        store.create(payload("b"));
        clock.advance(Duration::hours(2));
        let fresh = store.create(payload("c")).id;

        clock.advance(Duration::hours(2));
        assert_eq!(store.sweep_expired(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&fresh).is_ok());
    }

    #[test]
    fn test_snapshot_round_trip_skips_expired() {
        let path = std::env::temp_dir().join(format!("intake-sessions-{}.json", Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();

        let clock = ManualClock::default();
        let store = store_with(&clock, Some(path_str.clone()));
        let stale = store.create(payload("stale")).id;
        clock.advance(Duration::hours(3));
        let live = store.create(payload("live")).id;
        store
            .transition(&live, SubmissionState::Draft, SubmissionState::PendingConfirmation)
            .unwrap();
        store.save_to_file().unwrap();

        clock.advance(Duration::hours(2));
        let restored = store_with(&clock, Some(path_str));
        assert_eq!(restored.load_from_file().unwrap(), 1);
        assert_eq!(restored.get(&stale), Err(SessionError::NotFound));
        let session = restored.get(&live).unwrap();
        assert_eq!(session.payload.last_name, "live");
        assert_eq!(session.state, SubmissionState::Draft);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_snapshot_replaces_file_atomically() {
        let path = std::env::temp_dir().join(format!("intake-sessions-{}.json", Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();
        let staging = staging_path(&path);

        let clock = ManualClock::default();
        let store = store_with(&clock, Some(path_str.clone()));
        let first = store.create(payload("first")).id;
        store.save_to_file().unwrap();

        // Leftovers from an interrupted write are overwritten, never read.
        std::fs::write(&staging, b"{ truncated").unwrap();
        let second = store.create(payload("second")).id;
        store.save_to_file().unwrap();
        assert!(!staging.exists());

        let restored = store_with(&clock, Some(path_str));
        assert_eq!(restored.load_from_file().unwrap(), 2);
        assert!(restored.get(&first).is_ok());
        assert!(restored.get(&second).is_ok());

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let clock = ManualClock::default();
        let config = SessionConfig {
            ttl_secs: 10_000_000_000_000,
            persistence_path: None,
        };
        let store = MemorySessionStore::new(&config, Arc::new(clock.clone()));
        let session = store.create(payload("capped"));
        assert_eq!(
            session.expires_at,
            clock.now() + Duration::seconds(crate::clock::MAX_DURATION_SECS as i64)
        );

        let config = SessionConfig {
            ttl_secs: u64::MAX,
            persistence_path: None,
        };
        let store = MemorySessionStore::new(&config, Arc::new(clock));
        assert!(store.update(&store.create(payload("max")).id, payload("max")).is_ok());
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let clock = ManualClock::default();
        let path = std::env::temp_dir().join(format!("intake-missing-{}.json", Uuid::new_v4()));
        let store = store_with(&clock, Some(path.to_string_lossy().to_string()));
        assert_eq!(store.load_from_file().unwrap(), 0);
        assert_eq!(store_with(&clock, None).load_from_file().unwrap(), 0);
    }
}

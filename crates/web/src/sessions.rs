//! Navigator sessions held by the web server
//!
//! Each session sits behind its own mutex so actions on one session run one
//! at a time while different sessions proceed independently. Idle sessions
//! are dropped lazily whenever the store is touched.

use chrono::{Duration, Utc};
use dockhand_common::{Error, Result, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub type SessionHandle = Arc<Mutex<Session>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout_secs: u64, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: Duration::seconds(idle_timeout_secs.min(u32::MAX as u64) as i64),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Store a new session, making room by dropping the least recently used
    /// one when the store is full.
    pub async fn insert(&self, session: Session) -> Uuid {
        self.evict_idle().await;

        let id = session.id;
        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter_map(|(id, handle)| handle.try_lock().ok().map(|s| (*id, s.last_active)))
                .min_by_key(|(_, last_active)| *last_active)
                .map(|(id, _)| id);
            match oldest {
                Some(oldest) => {
                    info!(session = %oldest, "session store full, dropping oldest session");
                    sessions.remove(&oldest);
                }
                // Every session is busy; allow a temporary overshoot
                None => break,
            }
        }
        sessions.insert(id, Arc::new(Mutex::new(session)));
        debug!(session = %id, total = sessions.len(), "session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle> {
        self.evict_idle().await;
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("session", id.to_string()))
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                debug!(session = %id, "session closed");
                Ok(())
            }
            None => Err(Error::not_found("session", id.to_string())),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle for longer than the timeout. Sessions with an
    /// action in flight are never idle.
    pub async fn evict_idle(&self) -> usize {
        let cutoff = Utc::now() - self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.last_active >= cutoff,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "dropped idle sessions");
        }
        evicted
    }
}

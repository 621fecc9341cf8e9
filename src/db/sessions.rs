use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::TitleRatings;

/// Identifier of one visitor's session, carried in the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a cookie value, rejecting anything that is not a UUID
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage for per-visitor rating maps
///
/// Sessions are created on first interaction and forgotten once idle for
/// longer than the store's TTL.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns true if `id` names a live session
    async fn contains(&self, id: SessionId) -> bool;

    /// Creates the session if needed and marks it as active now
    async fn touch(&self, id: SessionId);

    /// Current ratings of a session (empty for unknown or expired sessions)
    async fn ratings(&self, id: SessionId) -> TitleRatings;

    /// Records `rating` for `title`, replacing any earlier rating of that title
    async fn add_rating(&self, id: SessionId, title: String, rating: u8);

    /// Drops every session idle since before `now - ttl`; returns how many
    async fn remove_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of sessions currently held
    async fn len(&self) -> usize;
}

#[derive(Debug, Clone)]
struct SessionEntry {
    ratings: TitleRatings,
    last_seen: DateTime<Utc>,
}

/// Process-local session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    ttl: chrono::Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_seen) > self.ttl
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn contains(&self, id: SessionId) -> bool {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    async fn touch(&self, id: SessionId) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let expired = sessions
            .get(&id)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            sessions.remove(&id);
        }
        sessions
            .entry(id)
            .and_modify(|entry| entry.last_seen = now)
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Session created");
                SessionEntry {
                    ratings: TitleRatings::new(),
                    last_seen: now,
                }
            });
    }

    async fn ratings(&self, id: SessionId) -> TitleRatings {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        match sessions.get(&id) {
            Some(entry) if !self.is_expired(entry, now) => entry.ratings.clone(),
            _ => TitleRatings::new(),
        }
    }

    async fn add_rating(&self, id: SessionId, title: String, rating: u8) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            ratings: TitleRatings::new(),
            last_seen: now,
        });
        if self.is_expired(entry, now) {
            entry.ratings.clear();
        }
        entry.last_seen = now;
        entry.ratings.insert(title, rating);
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        before - sessions.len()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Handle for stopping the expired-session sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Signals the sweeper task to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Session sweeper shutdown signal sent");
    }
}

/// Spawns a background task that drops expired sessions every `interval`
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Session sweeper started");
        let mut ticker = tokio::time::interval(interval);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.remove_expired(Utc::now()).await;
                    if removed > 0 {
                        tracing::info!(removed, "Expired sessions removed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session sweeper stopped");
                    break;
                }
            }
        }
    });

    SweeperHandle { shutdown_tx }
}

//! # Session Store
//!
//! Maps opaque cookie tokens to logged-in staff.
//!
//! ## Expiry
//! ```text
//! created_at                last_seen_at              now
//!     │─────────────────────────│─────────────────────────│
//!     │                         │◄──── idle_timeout ─────►│  expired if exceeded
//!     │◄──────────────── absolute_timeout ───────────────►│  expired if exceeded
//! ```
//!
//! Every successful [`SessionStore::get`] moves `last_seen_at` forward.
//! Expired entries are evicted when touched and handed back as
//! [`ExpiredSession`], so the caller can close their session log rows at
//! the moment they expired. [`SessionStore::purge_expired`] does the same
//! for every stale entry at once.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use techstore_core::AccessLevel;
use uuid::Uuid;

/// A logged-in staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    /// Row in `session_logs` closed on logout.
    pub session_log_id: i64,
    pub level: AccessLevel,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Session {
    /// New session stamped with the current time.
    pub fn new(
        user_id: i64,
        username: impl Into<String>,
        display_name: impl Into<String>,
        session_log_id: i64,
        level: AccessLevel,
    ) -> Self {
        let now = Utc::now();
        Session {
            user_id,
            username: username.into(),
            display_name: display_name.into(),
            session_log_id,
            level,
            created_at: now,
            last_seen_at: now,
        }
    }
}

/// Idle and absolute lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub idle_timeout: Duration,
    pub absolute_timeout: Duration,
}

impl SessionPolicy {
    pub fn new(idle_timeout: Duration, absolute_timeout: Duration) -> Self {
        SessionPolicy {
            idle_timeout,
            absolute_timeout,
        }
    }

    /// True once either limit has passed at `now`.
    pub fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let idle = now.signed_duration_since(session.last_seen_at);
        let age = now.signed_duration_since(session.created_at);

        exceeds(idle, self.idle_timeout) || exceeds(age, self.absolute_timeout)
    }

    /// The instant the first limit runs out.
    pub fn expires_at(&self, session: &Session) -> DateTime<Utc> {
        let idle_end = deadline(session.last_seen_at, self.idle_timeout);
        let absolute_end = deadline(session.created_at, self.absolute_timeout);
        idle_end.min(absolute_end)
    }

    fn expire(&self, session: Session) -> ExpiredSession {
        ExpiredSession {
            expired_at: self.expires_at(&session),
            session,
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy::new(Duration::from_secs(30 * 60), Duration::from_secs(8 * 60 * 60))
    }
}

fn deadline(start: DateTime<Utc>, limit: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(limit)
        .ok()
        .and_then(|limit| start.checked_add_signed(limit))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn exceeds(elapsed: chrono::Duration, limit: Duration) -> bool {
    match elapsed.to_std() {
        Ok(elapsed) => elapsed > limit,
        // Negative elapsed time (clock moved back) never expires a session
        Err(_) => false,
    }
}

/// A session that ran out without a logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredSession {
    pub session: Session,
    pub expired_at: DateTime<Utc>,
}

/// What a token resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Live(Session),
    /// Was stored but had expired; it is removed now.
    Expired(ExpiredSession),
    Missing,
}

impl SessionLookup {
    pub fn live(self) -> Option<Session> {
        match self {
            SessionLookup::Live(session) => Some(session),
            _ => None,
        }
    }
}

/// Storage for sessions, keyed by the cookie token.
pub trait SessionStore: Send + Sync + 'static {
    /// Stores `session` and returns its new token.
    fn create(&self, session: Session) -> String;

    /// Looks up a session. A live one gets its idle clock refreshed, an
    /// expired one is evicted.
    fn get(&self, token: &str) -> SessionLookup;

    /// Removes a session whether or not it had expired.
    fn destroy(&self, token: &str) -> SessionLookup;

    /// Removes every expired session and returns them.
    fn purge_expired(&self) -> Vec<ExpiredSession>;

    /// Number of stored entries, expired ones included until purged.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local session store.
///
/// ## Usage
/// ```rust,ignore
/// let store = InMemorySessionStore::new(SessionPolicy::default());
/// let token = store.create(Session::new(1, "admin", "Admin", 10, AccessLevel::Level1));
/// assert!(store.get(&token).live().is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    policy: SessionPolicy,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        InMemorySessionStore {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A panic while holding the lock leaves the map itself intact
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, session: Session) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.lock().insert(token.clone(), session);
        token
    }

    fn get(&self, token: &str) -> SessionLookup {
        let now = Utc::now();
        let mut sessions = self.lock();

        let expired = match sessions.get(token) {
            None => return SessionLookup::Missing,
            Some(session) => self.policy.is_expired(session, now),
        };

        if expired {
            return match sessions.remove(token) {
                Some(session) => {
                    tracing::debug!(user_id = session.user_id, "Session expired");
                    SessionLookup::Expired(self.policy.expire(session))
                }
                None => SessionLookup::Missing,
            };
        }

        match sessions.get_mut(token) {
            Some(session) => {
                session.last_seen_at = now;
                SessionLookup::Live(session.clone())
            }
            None => SessionLookup::Missing,
        }
    }

    fn destroy(&self, token: &str) -> SessionLookup {
        let Some(session) = self.lock().remove(token) else {
            return SessionLookup::Missing;
        };
        if self.policy.is_expired(&session, Utc::now()) {
            SessionLookup::Expired(self.policy.expire(session))
        } else {
            SessionLookup::Live(session)
        }
    }

    fn purge_expired(&self) -> Vec<ExpiredSession> {
        let now = Utc::now();
        let mut sessions = self.lock();

        let stale: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| self.policy.is_expired(session, now))
            .map(|(token, _)| token.clone())
            .collect();

        stale
            .iter()
            .filter_map(|token| sessions.remove(token))
            .map(|session| self.policy.expire(session))
            .collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(1, "admin", "Admin User", 10, AccessLevel::Level1)
    }

    fn policy(idle: u64, absolute: u64) -> SessionPolicy {
        SessionPolicy::new(Duration::from_secs(idle), Duration::from_secs(absolute))
    }

    fn stale(seconds_ago: i64) -> Session {
        let mut s = session();
        s.created_at -= chrono::Duration::seconds(seconds_ago);
        s.last_seen_at -= chrono::Duration::seconds(seconds_ago);
        s
    }

    #[test]
    fn test_create_get_destroy() {
        let store = InMemorySessionStore::new(SessionPolicy::default());
        let token = store.create(session());

        assert_eq!(token.len(), 32);
        assert!(!token.contains('-'));

        let found = store.get(&token).live().unwrap();
        assert_eq!(found.username, "admin");
        assert_eq!(found.level, AccessLevel::Level1);

        assert!(matches!(store.destroy(&token), SessionLookup::Live(_)));
        assert_eq!(store.get(&token), SessionLookup::Missing);
        assert_eq!(store.destroy(&token), SessionLookup::Missing);
    }

    #[test]
    fn test_tokens_are_unique() {
        let store = InMemorySessionStore::new(SessionPolicy::default());
        let a = store.create(session());
        let b = store.create(session());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_idle_expiry() {
        let policy = policy(60, 3600);
        let mut s = session();
        let now = s.created_at;

        assert!(!policy.is_expired(&s, now + chrono::Duration::seconds(60)));
        assert!(policy.is_expired(&s, now + chrono::Duration::seconds(61)));

        // Activity pushes the idle window forward
        s.last_seen_at = now + chrono::Duration::seconds(50);
        assert!(!policy.is_expired(&s, now + chrono::Duration::seconds(100)));
    }

    #[test]
    fn test_absolute_expiry_wins_over_activity() {
        let policy = policy(60, 120);
        let mut s = session();
        let start = s.created_at;

        s.last_seen_at = start + chrono::Duration::seconds(115);
        assert!(!policy.is_expired(&s, start + chrono::Duration::seconds(120)));
        assert!(policy.is_expired(&s, start + chrono::Duration::seconds(121)));
        assert_eq!(policy.expires_at(&s), start + chrono::Duration::seconds(120));
    }

    #[test]
    fn test_expires_at_uses_idle_limit_first() {
        let policy = policy(60, 3600);
        let s = session();
        assert_eq!(policy.expires_at(&s), s.last_seen_at + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_expired_entries_are_handed_back() {
        let store = InMemorySessionStore::new(policy(60, 3600));
        let old = stale(600);

        let stale_token = store.create(old.clone());
        let _other_stale = store.create(stale(900));
        let live_token = store.create(session());
        assert_eq!(store.len(), 3);

        match store.get(&stale_token) {
            SessionLookup::Expired(expired) => {
                assert_eq!(expired.session.session_log_id, 10);
                assert_eq!(expired.expired_at, old.last_seen_at + chrono::Duration::seconds(60));
            }
            other => panic!("expected an expired session, got {other:?}"),
        }
        // Evicted on access
        assert_eq!(store.len(), 2);

        let purged = store.purge_expired();
        assert_eq!(purged.len(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&live_token).live().is_some());
    }

    #[test]
    fn test_destroy_returns_expired_session() {
        let store = InMemorySessionStore::new(policy(60, 3600));
        let token = store.create(stale(600));

        assert!(matches!(store.destroy(&token), SessionLookup::Expired(_)));
        assert!(store.is_empty());
    }
}

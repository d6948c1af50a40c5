//! Per-client sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use docserve_tree::Tree;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ServerError;

/// Server-side state of one client.
///
/// The context tree is created lazily by the context assembler, as a copy of
/// the base tree for the client's host.
#[derive(Debug)]
pub struct Session {
    token: String,
    user: RwLock<String>,
    tree: RwLock<Option<Tree>>,
    last_seen: Mutex<Instant>,
    timeout: Mutex<Duration>,
}

impl Session {
    fn new(token: String, timeout: Duration) -> Self {
        Self {
            token,
            user: RwLock::new(String::new()),
            tree: RwLock::new(None),
            last_seen: Mutex::new(Instant::now()),
            timeout: Mutex::new(timeout),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Current user; empty until identity is resolved.
    pub fn user(&self) -> String {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_user(&self, user: impl Into<String>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user.into();
    }

    /// Run `f` on the session tree, creating it with `init` if absent.
    pub fn with_tree<R>(&self, init: impl FnOnce() -> Tree, f: impl FnOnce(&mut Tree) -> R) -> R {
        let mut guard = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        let tree = guard.get_or_insert_with(init);
        f(tree)
    }

    /// True once the session tree exists.
    pub fn has_tree(&self) -> bool {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Switch to a different idle timeout, e.g. after a "remember me" login.
    pub fn set_timeout(&self, timeout: Duration) {
        *lock(&self.timeout) = timeout;
    }

    fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(*lock(&self.last_seen)) >= *lock(&self.timeout)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The table of live sessions.
///
/// Lookup, expiry, the capacity check and insertion all happen under one
/// lock, so concurrent creation never pushes the count past the maximum.
/// Expired sessions are dropped when touched or when the table is full; there
/// is no background sweeper.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
            timeout,
        }
    }

    /// Look up the session for `token`, or create a new one.
    ///
    /// Returns the session and whether it was just created. An unknown or
    /// expired token is treated like no token.
    ///
    /// # Errors
    ///
    /// [`ServerError::CapacityExceeded`] when a new session is needed and the
    /// table is full. No session is created in that case.
    pub fn get_or_create(&self, token: Option<&str>) -> Result<(Arc<Session>, bool), ServerError> {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);

        if let Some(token) = token {
            let expired = match sessions.get(token) {
                Some(session) if !session.is_expired(now) => {
                    session.touch();
                    return Ok((Arc::clone(session), false));
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                debug!(token, "session expired");
                sessions.remove(token);
            }
        }

        if sessions.len() >= self.max_sessions {
            sessions.retain(|_, s| !s.is_expired(now));
            if sessions.len() >= self.max_sessions {
                warn!(max = self.max_sessions, "session capacity reached");
                return Err(ServerError::CapacityExceeded {
                    max: self.max_sessions,
                });
            }
        }

        let token = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(token.clone(), self.timeout));
        sessions.insert(token, Arc::clone(&session));
        info!(count = sessions.len(), "session created");
        Ok((session, true))
    }

    /// Look up a live session without creating one.
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        let sessions = lock(&self.sessions);
        let session = sessions.get(token)?;
        (!session.is_expired(Instant::now())).then(|| Arc::clone(session))
    }

    pub fn remove(&self, token: &str) -> Option<Arc<Session>> {
        let removed = lock(&self.sessions).remove(token);
        if removed.is_some() {
            info!("session removed");
        }
        removed
    }

    /// Number of sessions in the table, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::tprintln;
use super::principal::Principal;

pub type SessionToken = String;
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// Read model handed to guards and listeners. The bearer token is deliberately
/// not part of it; use `SessionStore::token`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    /// Raw role label as received; guards normalize it.
    pub role: Option<String>,
    pub has_hydrated: bool,
    pub principal: Option<Principal>,
    /// Bumped on every committed change.
    pub version: u64,
}

impl SessionSnapshot {
    pub fn role_label(&self) -> Option<&str> { self.role.as_deref() }
}

/// Session state recovered from durable storage at startup.
#[derive(Debug, Clone)]
pub struct RestoredSession {
    pub token: SessionToken,
    pub principal: Principal,
}

#[derive(Default)]
struct SessionState {
    snapshot: SessionSnapshot,
    token: Option<SessionToken>,
    // a login/logout/expire landed before hydration; restored state is stale
    written_before_hydration: bool,
}

/// Single-writer, many-reader session context. Writers go through `login`,
/// `logout`, `expire` and `hydrate`; readers take snapshots or subscribe.
pub struct SessionStore {
    state: RwLock<SessionState>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &self.state.read().snapshot)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl SessionStore {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn snapshot(&self) -> SessionSnapshot { self.state.read().snapshot.clone() }

    pub fn token(&self) -> Option<SessionToken> { self.state.read().token.clone() }

    pub fn has_hydrated(&self) -> bool { self.state.read().snapshot.has_hydrated }

    /// Commit a successful authentication.
    pub fn login(&self, principal: Principal, token: SessionToken) {
        let snap = {
            let mut st = self.state.write();
            if !st.snapshot.has_hydrated { st.written_before_hydration = true; }
            st.snapshot.is_authenticated = true;
            st.snapshot.role = Some(principal.role.clone());
            st.snapshot.principal = Some(principal);
            st.snapshot.version += 1;
            st.token = Some(token);
            st.snapshot.clone()
        };
        info!(target: "coursegate::session", role = ?snap.role, version = snap.version, "session.login");
        self.notify(&snap);
    }

    /// Clear the authenticated identity. Returns whether there was one.
    pub fn logout(&self) -> bool {
        self.clear("logout")
    }

    /// Credential expiry; same effect as `logout`.
    pub fn expire(&self) -> bool {
        self.clear("expire")
    }

    fn clear(&self, why: &str) -> bool {
        let (was, snap) = {
            let mut st = self.state.write();
            let was = st.snapshot.is_authenticated;
            if !st.snapshot.has_hydrated { st.written_before_hydration = true; }
            st.snapshot.is_authenticated = false;
            st.snapshot.role = None;
            st.snapshot.principal = None;
            st.snapshot.version += 1;
            st.token = None;
            (was, st.snapshot.clone())
        };
        info!(target: "coursegate::session", reason = why, was_authenticated = was, "session.clear");
        self.notify(&snap);
        was
    }

    /// Mark persisted state as read. Only the first call has any effect. Any
    /// login, logout or expiry committed before hydration finished wins over the
    /// restored state.
    pub fn hydrate(&self, restored: Option<RestoredSession>) -> bool {
        let snap = {
            let mut st = self.state.write();
            if st.snapshot.has_hydrated {
                debug!(target: "coursegate::session", "session.hydrate ignored: already hydrated");
                return false;
            }
            st.snapshot.has_hydrated = true;
            if let Some(r) = restored {
                if st.written_before_hydration {
                    debug!(target: "coursegate::session", "session.hydrate: restored state superseded");
                } else {
                    st.snapshot.is_authenticated = true;
                    st.snapshot.role = Some(r.principal.role.clone());
                    st.snapshot.principal = Some(r.principal);
                    st.token = Some(r.token);
                }
            }
            st.snapshot.version += 1;
            st.snapshot.clone()
        };
        info!(
            target: "coursegate::session",
            authenticated = snap.is_authenticated, role = ?snap.role,
            "session.hydrated"
        );
        self.notify(&snap);
        true
    }

    /// Register a change listener. It runs after every committed change, outside
    /// the store's locks, so it may read the store again.
    pub fn subscribe<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(f)));
        tprintln!("session.subscribe id={}", id);
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut ls = self.listeners.write();
        let before = ls.len();
        ls.retain(|(lid, _)| *lid != id);
        ls.len() != before
    }

    fn notify(&self, snap: &SessionSnapshot) {
        let ls: Vec<Listener> = self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for l in ls {
            l(snap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn principal(role: &str) -> Principal {
        Principal { role: role.into(), ..Default::default() }
    }

    #[test]
    fn starts_empty_and_unhydrated() {
        let s = SessionStore::new();
        let snap = s.snapshot();
        assert!(!snap.has_hydrated);
        assert!(!snap.is_authenticated);
        assert_eq!(snap.role, None);
        assert_eq!(s.token(), None);
    }

    #[test]
    fn hydrate_happens_once() {
        let s = SessionStore::new();
        assert!(s.hydrate(None));
        assert!(s.has_hydrated());
        let restored = RestoredSession { token: "t".into(), principal: principal("ADMIN") };
        assert!(!s.hydrate(Some(restored)));
        assert!(!s.snapshot().is_authenticated);
        s.logout();
        assert!(s.has_hydrated(), "hydration flag never reverts");
    }

    #[test]
    fn hydrate_restores_identity() {
        let s = SessionStore::new();
        s.hydrate(Some(RestoredSession { token: "tok".into(), principal: principal("INSTRUCTOR") }));
        let snap = s.snapshot();
        assert!(snap.is_authenticated);
        assert_eq!(snap.role_label(), Some("INSTRUCTOR"));
        assert_eq!(s.token().as_deref(), Some("tok"));
    }

    #[test]
    fn login_before_hydration_wins() {
        let s = SessionStore::new();
        s.login(principal("STUDENT"), "fresh".into());
        s.hydrate(Some(RestoredSession { token: "stale".into(), principal: principal("ADMIN") }));
        assert_eq!(s.token().as_deref(), Some("fresh"));
        assert_eq!(s.snapshot().role_label(), Some("STUDENT"));
        assert!(s.has_hydrated());
    }

    #[test]
    fn logout_before_hydration_is_not_undone() {
        let s = SessionStore::new();
        s.login(principal("STUDENT"), "fresh".into());
        s.logout();
        assert!(s.hydrate(Some(RestoredSession { token: "stale".into(), principal: principal("ADMIN") })));
        let snap = s.snapshot();
        assert!(snap.has_hydrated);
        assert!(!snap.is_authenticated);
        assert_eq!(snap.role, None);
        assert_eq!(s.token(), None);

        let s = SessionStore::new();
        s.expire();
        s.hydrate(Some(RestoredSession { token: "stale".into(), principal: principal("ADMIN") }));
        assert!(!s.snapshot().is_authenticated);
    }

    #[test]
    fn logout_and_expire_clear_identity() {
        let s = SessionStore::new();
        s.hydrate(None);
        s.login(principal("ADMIN"), "t1".into());
        assert!(s.logout());
        assert!(!s.logout());
        s.login(principal("ADMIN"), "t2".into());
        assert!(s.expire());
        let snap = s.snapshot();
        assert!(!snap.is_authenticated);
        assert_eq!(snap.principal, None);
        assert_eq!(s.token(), None);
    }

    #[test]
    fn listeners_see_each_commit_and_can_unsubscribe() {
        let s = SessionStore::new();
        let seen: Arc<Mutex<Vec<(bool, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let store2 = s.clone();
        let id = s.subscribe(move |snap| {
            // re-entrant read must not deadlock
            assert_eq!(store2.snapshot().version, snap.version);
            seen2.lock().push((snap.has_hydrated, snap.is_authenticated));
        });
        s.hydrate(None);
        s.login(principal("STUDENT"), "t".into());
        assert!(s.unsubscribe(id));
        s.logout();
        assert!(!s.unsubscribe(id));
        assert_eq!(*seen.lock(), vec![(true, false), (true, true)]);
    }
}

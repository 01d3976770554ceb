//! History stack and reactive re-evaluation of the current location.
//!
//! The navigator subscribes to the session store; every committed session change
//! re-runs the guard for the current history entry, so a navigation parked on the
//! placeholder resolves on its own once hydration completes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::identity::{Decision, GateState, ListenerId, NavigationState, SessionStore};
use crate::router::{Navigation, Router, View};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub path: String,
    pub state: NavigationState,
}

/// What is on screen after a navigation settles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Screen {
    /// Waiting on hydration; nothing observable is rendered.
    Blank { path: String },
    View { path: String, view: View, state: GateState },
    /// Redirects did not settle within the hop budget.
    Stuck { path: String },
}

impl Screen {
    pub fn path(&self) -> &str {
        match self {
            Screen::Blank { path } | Screen::View { path, .. } | Screen::Stuck { path } => path,
        }
    }

    pub fn view(&self) -> Option<View> {
        match self {
            Screen::View { view, .. } => Some(*view),
            _ => None,
        }
    }
}

/// One step of a settled navigation, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hop {
    pub path: String,
    pub state: GateState,
}

#[derive(Debug)]
struct NavInner {
    history: Vec<HistoryEntry>,
    screen: Screen,
    last_hops: Vec<Hop>,
}

pub struct Navigator {
    router: Router,
    store: Arc<SessionStore>,
    inner: Mutex<NavInner>,
    max_redirects: usize,
    listener: Mutex<Option<ListenerId>>,
}

impl Navigator {
    /// Create a navigator positioned at `start` and subscribed to `store`.
    pub fn new(router: Router, store: Arc<SessionStore>, start: &str, max_redirects: usize) -> Arc<Self> {
        let nav = Arc::new(Self {
            router,
            store: store.clone(),
            inner: Mutex::new(NavInner {
                history: vec![HistoryEntry { path: start.to_string(), state: NavigationState::default() }],
                screen: Screen::Blank { path: start.to_string() },
                last_hops: Vec::new(),
            }),
            max_redirects,
            listener: Mutex::new(None),
        });
        let weak: Weak<Navigator> = Arc::downgrade(&nav);
        let id = store.subscribe(move |_| {
            if let Some(n) = weak.upgrade() {
                n.reevaluate();
            }
        });
        *nav.listener.lock() = Some(id);
        nav.reevaluate();
        nav
    }

    pub fn screen(&self) -> Screen { self.inner.lock().screen.clone() }

    pub fn history(&self) -> Vec<HistoryEntry> { self.inner.lock().history.clone() }

    pub fn last_hops(&self) -> Vec<Hop> { self.inner.lock().last_hops.clone() }

    pub fn router(&self) -> &Router { &self.router }

    /// Push a new entry and evaluate it.
    pub fn visit(&self, path: &str, state: NavigationState) -> Screen {
        let mut inner = self.inner.lock();
        inner.history.push(HistoryEntry { path: path.to_string(), state });
        self.settle(&mut inner)
    }

    /// Replace the current entry and evaluate it (post-login navigation uses this).
    pub fn replace(&self, path: &str, state: NavigationState) -> Screen {
        let mut inner = self.inner.lock();
        Self::replace_top(&mut inner.history, HistoryEntry { path: path.to_string(), state });
        self.settle(&mut inner)
    }

    /// Pop to the previous entry. A single remaining entry stays put.
    pub fn back(&self) -> Screen {
        let mut inner = self.inner.lock();
        if inner.history.len() > 1 {
            inner.history.pop();
        }
        self.settle(&mut inner)
    }

    pub fn reevaluate(&self) -> Screen {
        let mut inner = self.inner.lock();
        self.settle(&mut inner)
    }

    fn replace_top(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
        match history.last_mut() {
            Some(top) => *top = entry,
            None => history.push(entry),
        }
    }

    /// Evaluate the top entry, following redirects (each replaces the top entry)
    /// until a view renders, the placeholder shows, or the hop budget runs out.
    fn settle(&self, inner: &mut NavInner) -> Screen {
        let session = self.store.snapshot();
        let mut hops = Vec::new();
        let screen = loop {
            let Some(entry) = inner.history.last().cloned() else {
                break Screen::Blank { path: "/".into() };
            };
            let Navigation { path, view, decision, .. } = self.router.navigate(&entry.path, &entry.state, &session);
            hops.push(Hop { path: path.clone(), state: decision.state() });
            match decision {
                Decision::Placeholder => break Screen::Blank { path },
                Decision::Render { .. } => {
                    let state = decision.state();
                    match view {
                        Some(view) => break Screen::View { path, view, state },
                        None => break Screen::Blank { path },
                    }
                }
                Decision::Redirect { to, replace, .. } => {
                    if hops.len() > self.max_redirects {
                        warn!(target: "coursegate::router", path = %path, hops = hops.len(), "redirect loop; giving up");
                        break Screen::Stuck { path };
                    }
                    // redirects drop any per-navigation state
                    let next = HistoryEntry { path: to, state: NavigationState::default() };
                    if replace {
                        Self::replace_top(&mut inner.history, next);
                    } else {
                        inner.history.push(next);
                    }
                }
            }
        };
        debug!(target: "coursegate::router", screen = ?screen, hops = hops.len(), "navigation settled");
        inner.screen = screen.clone();
        inner.last_hops = hops;
        screen
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.store.unsubscribe(id);
        }
    }
}

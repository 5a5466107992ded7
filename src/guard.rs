//! Gatekeeping for protected views.
//!
//! The guard re-evaluates on every session change, so signing out from any
//! part of the app moves a protected view back to the login screen at once.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::identity::SessionState;
use crate::auth::session_store::{SessionStore, Subscription};
use crate::routes::Route;

/// What the view layer should do for a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session still resolving: show a neutral placeholder, do not navigate
    Wait,
    /// Navigate away, replacing the current history entry
    Redirect { to: Route },
    /// Show the requested view
    Render,
}

/// Navigation sink provided by the view layer
pub trait Navigator: Send + Sync {
    /// Route currently displayed
    fn current(&self) -> Route;

    /// Replace the current location
    fn replace(&self, to: Route);
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login: Route,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self {
            login: Route::Login,
        }
    }

    pub fn with_login_route(login: Route) -> Self {
        Self { login }
    }

    pub fn evaluate(&self, route: &Route, state: &SessionState) -> GuardDecision {
        if !route.is_protected() {
            return GuardDecision::Render;
        }
        if state.is_loading() {
            return GuardDecision::Wait;
        }
        match state.identity() {
            Some(_) => GuardDecision::Render,
            None => GuardDecision::Redirect {
                to: self.login.clone(),
            },
        }
    }

    /// Evaluate now and after every store change, redirecting through
    /// `navigator` whenever a protected view loses its session.
    pub fn watch(&self, store: &SessionStore, navigator: Arc<dyn Navigator>) -> Subscription {
        self.apply(&store.get(), navigator.as_ref());

        let guard = self.clone();
        store.subscribe(move |state| {
            guard.apply(state, navigator.as_ref());
        })
    }

    fn apply(&self, state: &SessionState, navigator: &dyn Navigator) -> GuardDecision {
        let route = navigator.current();
        let decision = self.evaluate(&route, state);

        match &decision {
            GuardDecision::Redirect { to } => {
                info!(from = %route, to = %to, "Redirecting unauthenticated visitor");
                navigator.replace(to.clone());
            }
            GuardDecision::Wait => debug!(route = %route, "Waiting for session before rendering"),
            GuardDecision::Render => {}
        }

        decision
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Navigator that keeps its location and every replacement in memory
#[derive(Debug)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    /// Start at `location`; unconditional router redirects are applied
    pub fn new(location: Route) -> Self {
        let location = location.resolve_redirect().unwrap_or(location);
        Self {
            entries: Mutex::new(vec![location]),
        }
    }

    /// Navigate to a new location (a push, not a replace)
    pub fn push(&self, location: Route) {
        let location = location.resolve_redirect().unwrap_or(location);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location);
    }

    /// Every location visited, oldest first
    pub fn history(&self) -> Vec<Route> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for HistoryNavigator {
    fn current(&self) -> Route {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or(Route::Root)
    }

    fn replace(&self, to: Route) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.pop();
        entries.push(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{Identity, SessionOperation};

    fn signed_in() -> SessionState {
        SessionState::Authenticated {
            identity: Identity::new("user-1", "a@example.com"),
        }
    }

    #[test]
    fn test_evaluate_matrix() {
        let guard = RouteGuard::new();

        assert_eq!(guard.evaluate(&Route::Feed, &SessionState::Restoring), GuardDecision::Wait);
        assert_eq!(
            guard.evaluate(
                &Route::Feed,
                &SessionState::Pending {
                    operation: SessionOperation::Login
                }
            ),
            GuardDecision::Wait
        );
        assert_eq!(
            guard.evaluate(&Route::MyPosts, &SessionState::Anonymous),
            GuardDecision::Redirect { to: Route::Login }
        );
        assert_eq!(guard.evaluate(&Route::AiHelp, &signed_in()), GuardDecision::Render);

        // Public views render whatever the session state
        assert_eq!(guard.evaluate(&Route::Login, &SessionState::Restoring), GuardDecision::Render);
        assert_eq!(guard.evaluate(&Route::Signup, &SessionState::Anonymous), GuardDecision::Render);
        assert_eq!(
            guard.evaluate(&Route::NotFound("/x".into()), &SessionState::Anonymous),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_custom_login_route() {
        let guard = RouteGuard::with_login_route(Route::Signup);
        assert_eq!(
            guard.evaluate(&Route::Feed, &SessionState::Anonymous),
            GuardDecision::Redirect { to: Route::Signup }
        );
    }

    #[test]
    fn test_history_navigator_applies_root_redirect() {
        let navigator = HistoryNavigator::new(Route::Root);
        assert_eq!(navigator.current(), Route::Login);

        navigator.push(Route::Feed);
        navigator.replace(Route::Login);
        assert_eq!(navigator.history(), vec![Route::Login, Route::Login]);
    }

    #[test]
    fn test_watch_waits_then_redirects() {
        let store = SessionStore::new();
        let navigator = Arc::new(HistoryNavigator::new(Route::Feed));
        let _watch = RouteGuard::new().watch(&store, navigator.clone());

        // Still restoring: nothing happens
        assert_eq!(navigator.current(), Route::Feed);

        store.set(SessionState::Anonymous);
        assert_eq!(navigator.current(), Route::Login);
        assert_eq!(navigator.history(), vec![Route::Login]);
    }

    #[test]
    fn test_watch_leaves_public_views_alone() {
        let store = SessionStore::with_state(SessionState::Anonymous);
        let navigator = Arc::new(HistoryNavigator::new(Route::Signup));
        let _watch = RouteGuard::new().watch(&store, navigator.clone());

        store.set(SessionState::Anonymous);
        assert_eq!(navigator.history(), vec![Route::Signup]);
    }
}

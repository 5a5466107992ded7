use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::info;

// Export modules
pub mod auth;
pub mod common;
pub mod config;
pub mod error;
pub mod guard;
pub mod routes;

#[cfg(test)]
mod tests;

pub use auth::{
    ControllerOptions, CredentialVerifier, FileSessionStore, FormError, Identity, LoginForm,
    MemorySessionStore, MockVerifier, MockVerifierConfig, SessionController, SessionEvent,
    SessionEventKind, SessionEvents, SessionOperation, SessionPersistence, SessionPolicy,
    SessionState, SessionStore, SignupForm, Subscription,
};
pub use config::AppConfig;
pub use error::{AuthError, AuthResult, ErrorCode, ErrorReport, ErrorSeverity};
pub use guard::{GuardDecision, HistoryNavigator, Navigator, RouteGuard};
pub use routes::Route;

/// The session as seen by the view layer: read the state, subscribe to it,
/// and request transitions.
///
/// Built once at startup and passed to whatever needs it.
pub struct SessionContext {
    store: SessionStore,
    controller: SessionController,
}

impl SessionContext {
    /// Create a context in the `Restoring` state. Call `restore` next.
    pub fn new(
        persistence: Arc<dyn SessionPersistence>,
        verifier: Arc<dyn CredentialVerifier>,
        options: ControllerOptions,
    ) -> Self {
        let store = SessionStore::new();
        let controller = SessionController::new(
            store.clone(),
            persistence,
            verifier,
            SessionEvents::default(),
            options,
        );

        Self { store, controller }
    }

    /// File-backed persistence and the mock verifier, as configured
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let persistence =
            FileSessionStore::new(config.storage.path.clone()).with_key(&config.storage.key);
        let verifier = MockVerifier::new(config.verifier_config());

        info!(
            path = %config.storage.path.display(),
            key = %config.storage.key,
            "Initializing session context"
        );

        Ok(Self::new(
            Arc::new(persistence),
            Arc::new(verifier),
            config.controller_options(),
        ))
    }

    pub fn get_state(&self) -> SessionState {
        self.store.get()
    }

    /// Shorthand for the signed-in identity, if any
    pub fn current_identity(&self) -> Option<Identity> {
        self.store.get().identity().cloned()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Read-only handle to the store, e.g. for a `RouteGuard`
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.controller.events().subscribe()
    }

    pub fn recent_events(&self) -> Vec<SessionEvent> {
        self.controller.events().recent()
    }

    pub async fn restore(&self) -> SessionState {
        self.controller.restore().await
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.controller.login(email, password).await
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        gender: &str,
        age_group: &str,
    ) -> AuthResult<Identity> {
        self.controller.signup(email, password, gender, age_group).await
    }

    pub async fn sign_in_with_provider(&self) -> AuthResult<Identity> {
        self.controller.sign_in_with_provider().await
    }

    pub async fn logout(&self) -> AuthResult<()> {
        self.controller.logout().await
    }

    /// Another handle to the controller, for spawning operations
    pub fn controller(&self) -> SessionController {
        self.controller.clone()
    }
}

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::auth::events::{SessionEventKind, SessionEvents};
use crate::auth::identity::{Identity, SessionOperation, SessionState};
use crate::auth::providers::CredentialVerifier;
use crate::auth::record::{decode_identity, encode_identity, schema_version_of, CURRENT_SCHEMA_VERSION};
use crate::auth::session_store::SessionStore;
use crate::auth::storage::SessionPersistence;
use crate::common::retry::{with_retry, RetryPolicy};
use crate::error::{AuthError, AuthResult};

/// What happens when an operation starts while another is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Wait for the running operation to settle, then run (FIFO)
    #[default]
    Queue,
    /// Fail immediately with `AuthError::OperationInProgress`
    Reject,
}

/// Tunables for the lifecycle controller
#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub policy: SessionPolicy,
    /// Retry policy for record writes and removals
    pub persist_retry: RetryPolicy,
}

/// What a sign-in presents to the verifier
#[derive(Debug, Clone)]
enum Credentials {
    Password {
        email: String,
        password: String,
    },
    Signup {
        email: String,
        password: String,
        gender: String,
        age_group: String,
    },
    Provider,
}

impl Credentials {
    fn operation(&self) -> SessionOperation {
        match self {
            Credentials::Password { .. } => SessionOperation::Login,
            Credentials::Signup { .. } => SessionOperation::Signup,
            Credentials::Provider => SessionOperation::ProviderSignIn,
        }
    }
}

/// Owner of the session transitions and the only writer of the store.
///
/// Once an operation holds the gate it runs on its own task: dropping the
/// caller's future stops the wait for the result, not the operation, so the
/// store and the stored record always settle together. Cloning yields another
/// handle to the same controller.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    store: SessionStore,
    persistence: Arc<dyn SessionPersistence>,
    verifier: Arc<dyn CredentialVerifier>,
    events: SessionEvents,
    /// Serializes every mutating operation
    gate: Arc<Mutex<()>>,
    options: ControllerOptions,
}

impl SessionController {
    pub fn new(
        store: SessionStore,
        persistence: Arc<dyn SessionPersistence>,
        verifier: Arc<dyn CredentialVerifier>,
        events: SessionEvents,
        options: ControllerOptions,
    ) -> Self {
        info!(
            verifier = verifier.name(),
            policy = ?options.policy,
            persist_attempts = options.persist_retry.max_attempts,
            "Creating session controller"
        );

        Self {
            inner: Arc::new(ControllerInner {
                store,
                persistence,
                verifier,
                events,
                gate: Arc::new(Mutex::new(())),
                options,
            }),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn policy(&self) -> SessionPolicy {
        self.inner.options.policy
    }

    /// Resolve the initial `Restoring` state from the persisted record.
    ///
    /// Never fails: a missing, unreadable or malformed record means "no
    /// session". Only the first call does any work. Restore always waits for a
    /// running operation, whatever the policy, so the state it returns is
    /// settled.
    pub async fn restore(&self) -> SessionState {
        let gate = Arc::clone(&self.inner.gate).lock_owned().await;
        let inner = Arc::clone(&self.inner);

        let result = self
            .run_locked(SessionOperation::Restore, gate, async move {
                Ok(inner.restore_if_needed().await)
            })
            .await;

        match result {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Restore did not complete");
                self.inner.store.get()
            }
        }
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.sign_in(Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
    }

    /// Create an account. Field presence is checked by the caller.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        gender: &str,
        age_group: &str,
    ) -> AuthResult<Identity> {
        self.sign_in(Credentials::Signup {
            email: email.to_string(),
            password: password.to_string(),
            gender: gender.to_string(),
            age_group: age_group.to_string(),
        })
        .await
    }

    /// Sign in through the external provider flow
    pub async fn sign_in_with_provider(&self) -> AuthResult<Identity> {
        self.sign_in(Credentials::Provider).await
    }

    /// Sign out and remove the stored record. Idempotent.
    pub async fn logout(&self) -> AuthResult<()> {
        let gate = self.inner.acquire(SessionOperation::Logout).await?;
        let inner = Arc::clone(&self.inner);

        self.run_locked(SessionOperation::Logout, gate, async move {
            inner.logout().await
        })
        .await
    }

    async fn sign_in(&self, credentials: Credentials) -> AuthResult<Identity> {
        let operation = credentials.operation();
        let gate = self.inner.acquire(operation).await?;
        let inner = Arc::clone(&self.inner);

        self.run_locked(operation, gate, async move {
            inner.sign_in(credentials).await
        })
        .await
    }

    /// Run `body` to completion on its own task while holding `gate`
    async fn run_locked<T, Fut>(
        &self,
        operation: SessionOperation,
        gate: OwnedMutexGuard<()>,
        body: Fut,
    ) -> AuthResult<T>
    where
        T: Send + 'static,
        Fut: Future<Output = AuthResult<T>> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let _gate = gate;
            body.await
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                error!(operation = %operation, error = %e, "Session operation task was cancelled");
                Err(AuthError::Interrupted { operation })
            }
        }
    }
}

impl ControllerInner {
    async fn acquire(&self, operation: SessionOperation) -> AuthResult<OwnedMutexGuard<()>> {
        match self.options.policy {
            SessionPolicy::Queue => {
                if let Ok(gate) = Arc::clone(&self.gate).try_lock_owned() {
                    return Ok(gate);
                }
                debug!(operation = %operation, "Waiting for in-flight session operation");
                Ok(Arc::clone(&self.gate).lock_owned().await)
            }
            SessionPolicy::Reject => Arc::clone(&self.gate).try_lock_owned().map_err(|_| {
                let running = self.store.get().pending_operation().unwrap_or(operation);
                warn!(operation = %operation, running = %running, "Rejecting concurrent session operation");
                AuthError::OperationInProgress { operation: running }
            }),
        }
    }

    /// Resolve `Restoring` from storage; any other state is returned as is.
    /// Callers hold the gate.
    async fn restore_if_needed(&self) -> SessionState {
        let current = self.store.get();
        if current != SessionState::Restoring {
            debug!("Session already resolved, restore is a no-op");
            return current;
        }

        let pending = PendingGuard::resume(self, SessionOperation::Restore);

        let next = match self.persistence.read().await {
            Ok(Some(raw)) => match decode_identity(&raw) {
                Ok(identity) => {
                    info!(id = %identity.id(), email = %identity.email, "Restored session from storage");
                    SessionState::Authenticated { identity }
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring stored session record");
                    self.discard_unusable_record(&raw).await;
                    self.events.publish(SessionEventKind::RestoreDegraded {
                        reason: e.to_string(),
                    });
                    SessionState::Anonymous
                }
            },
            Ok(None) => {
                debug!("No stored session found");
                SessionState::Anonymous
            }
            Err(e) => {
                let e = AuthError::persistence(e.to_string());
                warn!(error = %e, "Could not read stored session, starting signed out");
                self.events.publish(SessionEventKind::RestoreDegraded {
                    reason: e.to_string(),
                });
                SessionState::Anonymous
            }
        };

        pending.settle(next.clone());
        self.events.publish(SessionEventKind::Restored {
            authenticated: next.is_authenticated(),
        });
        next
    }

    async fn sign_in(&self, credentials: Credentials) -> AuthResult<Identity> {
        let operation = credentials.operation();

        // A stored session must be known before it can be replaced
        let replacing = self.restore_if_needed().await.is_authenticated();
        let pending = PendingGuard::begin(self, operation);

        let result = async {
            let identity = self.verify(&credentials).await?;
            self.persist(&identity).await?;
            Ok::<_, AuthError>(identity)
        }
        .await;

        match result {
            Ok(identity) => {
                info!(
                    operation = %operation,
                    id = %identity.id(),
                    email = %identity.email,
                    "Signed in"
                );
                pending.settle(SessionState::Authenticated {
                    identity: identity.clone(),
                });
                self.events.publish(SessionEventKind::SignedIn {
                    operation,
                    identity_id: identity.id().to_string(),
                });
                Ok(identity)
            }
            Err(e) => {
                warn!(operation = %operation, error = %e, "Sign-in failed");
                if replacing {
                    // The previous session ends too; its record must not come back on reload
                    if let Err(e) = self.persistence.clear().await {
                        warn!(error = %e, "Failed to remove previous session record");
                    }
                }
                pending.settle(SessionState::Anonymous);
                self.events.publish(SessionEventKind::SignInFailed {
                    operation,
                    code: e.code(),
                });
                Err(e)
            }
        }
    }

    async fn verify(&self, credentials: &Credentials) -> AuthResult<Identity> {
        match credentials {
            Credentials::Password { email, password } => {
                self.verifier.verify_password(email, password).await
            }
            Credentials::Signup {
                email,
                password,
                gender,
                age_group,
            } => {
                let identity = self.verifier.create_account(email, password).await?;
                Ok(identity.with_profile(gender.as_str(), age_group.as_str()))
            }
            Credentials::Provider => self.verifier.verify_provider().await,
        }
    }

    async fn logout(&self) -> AuthResult<()> {
        if self.restore_if_needed().await.is_anonymous() {
            // No transition; still make sure nothing lingers in storage
            if let Err(e) = self.persistence.clear().await {
                warn!(error = %e, "Failed to clear session record while signed out");
            }
            debug!("Logout while signed out is a no-op");
            return Ok(());
        }

        let pending = PendingGuard::begin(self, SessionOperation::Logout);
        let cleared = self.clear_record().await;

        // The in-memory session ends even if storage could not be cleared
        pending.settle(SessionState::Anonymous);
        self.events.publish(SessionEventKind::SignedOut);

        match cleared {
            Ok(()) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Signed out, but the stored session could not be removed");
                Err(e)
            }
        }
    }

    async fn persist(&self, identity: &Identity) -> AuthResult<()> {
        let raw = encode_identity(identity)?;
        let raw = raw.as_str();
        let persistence = &self.persistence;

        with_retry(self.options.persist_retry, "Persisting session record", move || {
            persistence.write(raw)
        })
        .await
        .map_err(|e| AuthError::persistence(e.to_string()))
    }

    async fn clear_record(&self) -> AuthResult<()> {
        let persistence = &self.persistence;

        with_retry(self.options.persist_retry, "Removing session record", move || {
            persistence.clear()
        })
        .await
        .map_err(|e| AuthError::persistence(e.to_string()))
    }

    /// Drop a record that will never decode. Records from a newer schema are
    /// left for the software that wrote them.
    async fn discard_unusable_record(&self, raw: &str) {
        if matches!(schema_version_of(raw), Some(version) if version > CURRENT_SCHEMA_VERSION) {
            debug!("Keeping stored record written by a newer schema");
            return;
        }
        if let Err(e) = self.persistence.clear().await {
            warn!(error = %e, "Failed to remove unusable session record");
        }
    }
}

/// Holds the loading state for one operation.
///
/// Operations cannot be cancelled from outside, so an unsettled drop means the
/// operation panicked. The store then falls back to `Anonymous` and the record
/// is removed in the background, so the loading flag never stays set and a
/// reload cannot bring back a session the store no longer shows.
struct PendingGuard<'a> {
    inner: &'a ControllerInner,
    operation: SessionOperation,
    settled: bool,
}

impl<'a> PendingGuard<'a> {
    /// Enter the loading state for `operation`
    fn begin(inner: &'a ControllerInner, operation: SessionOperation) -> Self {
        debug!(operation = %operation, "Session operation started");
        inner.store.set(SessionState::Pending { operation });
        Self::resume(inner, operation)
    }

    /// Guard a loading state that is already in the store
    fn resume(inner: &'a ControllerInner, operation: SessionOperation) -> Self {
        Self {
            inner,
            operation,
            settled: false,
        }
    }

    fn settle(mut self, state: SessionState) {
        self.settled = true;
        self.inner.store.set(state);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(operation = %self.operation, "Session operation abandoned, resetting to signed out");
        self.inner.store.set(SessionState::Anonymous);
        self.inner.events.publish(SessionEventKind::Interrupted {
            operation: self.operation,
        });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let persistence = Arc::clone(&self.inner.persistence);
            runtime.spawn(async move {
                if let Err(e) = persistence.clear().await {
                    warn!(error = %e, "Failed to remove session record after abandoned operation");
                }
            });
        }
    }
}

use async_trait::async_trait;

use crate::auth::identity::Identity;
use crate::error::AuthResult;

pub mod mock;

pub use mock::{MockVerifier, MockVerifierConfig};

/// Stand-in for an identity provider.
///
/// Implementations decide identity ids; the session core never generates them.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Get the verifier name, used in logs
    fn name(&self) -> &str;

    /// Check an email/password pair
    async fn verify_password(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Run the external provider ("Continue with Google") flow
    async fn verify_provider(&self) -> AuthResult<Identity>;

    /// Register a new email/password account
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<Identity> {
        // Default implementation treats signup like a first login
        self.verify_password(email, password).await
    }
}

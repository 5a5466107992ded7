use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::auth::identity::{email_local_part, Identity};
use crate::auth::providers::CredentialVerifier;
use crate::error::{AuthError, AuthResult};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

/// Settings for the mock verifier
#[derive(Debug, Clone)]
pub struct MockVerifierConfig {
    /// Simulated round-trip latency
    pub delay: Duration,
    /// Passwords that are always rejected
    pub rejected_passwords: Vec<String>,
    /// Whether the provider sign-in flow succeeds
    pub provider_enabled: bool,
    /// Seed for generated ids; random when absent
    pub seed: Option<u64>,
}

impl Default for MockVerifierConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            rejected_passwords: Vec::new(),
            provider_enabled: true,
            seed: None,
        }
    }
}

/// Deterministic stand-in for a real identity provider.
///
/// Accepts any well-formed email with a non-empty password after a fixed
/// delay, like the placeholder sign-in the web client shipped with.
pub struct MockVerifier {
    config: MockVerifierConfig,
    rng: Mutex<fastrand::Rng>,
    calls: AtomicUsize,
}

impl MockVerifier {
    pub fn new(config: MockVerifierConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        Self {
            config,
            rng: Mutex::new(rng),
            calls: AtomicUsize::new(0),
        }
    }

    /// Zero-delay verifier with a fixed seed
    pub fn instant() -> Self {
        Self::new(MockVerifierConfig {
            delay: Duration::ZERO,
            seed: Some(7),
            ..MockVerifierConfig::default()
        })
    }

    /// Number of verification calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn id_suffix(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.usize(..ID_ALPHABET.len())] as char)
            .collect()
    }

    fn provider_email_number(&self) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.u32(..1000)
    }

    async fn simulate_round_trip(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }

    fn check_password_credentials(&self, email: &str, password: &str) -> AuthResult<()> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::invalid_credentials("Email and password are required"));
        }
        if !email.contains('@') || email_local_part(email).is_empty() {
            return Err(AuthError::invalid_credentials("Email address is not valid"));
        }
        if self.config.rejected_passwords.iter().any(|p| p == password) {
            return Err(AuthError::invalid_credentials("Password was rejected"));
        }
        Ok(())
    }

    fn password_identity(&self, email: &str) -> Identity {
        let email = email.trim();
        Identity::new(format!("user-{}", self.id_suffix()), email)
            .with_display_name(email_local_part(email))
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::new(MockVerifierConfig::default())
    }
}

#[async_trait]
impl CredentialVerifier for MockVerifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn verify_password(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.simulate_round_trip().await;

        if let Err(e) = self.check_password_credentials(email, password) {
            warn!(email = %email, error = %e, "Mock verifier rejected credentials");
            return Err(e);
        }

        let identity = self.password_identity(email);
        debug!(email = %email, id = %identity.id(), "Mock verifier accepted credentials");
        Ok(identity)
    }

    async fn verify_provider(&self) -> AuthResult<Identity> {
        self.simulate_round_trip().await;

        if !self.config.provider_enabled {
            warn!("Mock provider sign-in is disabled");
            return Err(AuthError::invalid_credentials("Provider sign-in was declined"));
        }

        let identity = Identity::new(
            format!("google-{}", self.id_suffix()),
            format!("user{}@gmail.com", self.provider_email_number()),
        )
        .with_display_name("Google User");

        info!(id = %identity.id(), "Mock provider sign-in completed");
        Ok(identity)
    }
}

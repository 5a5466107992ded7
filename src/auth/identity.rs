use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated principal held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Opaque identifier assigned by the credential verifier
    id: String,

    /// Email the principal signed in with
    pub email: String,

    /// Optional display name; derived from the email when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Collected at signup only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Collected at signup only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
}

impl Identity {
    /// Create a new identity with the given id and email
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            gender: None,
            age_group: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Attach the demographic fields collected by the signup form
    pub fn with_profile(mut self, gender: impl Into<String>, age_group: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self.age_group = Some(age_group.into());
        self
    }

    /// The identifier is fixed at construction; there is no setter.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the local part of the email
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => email_local_part(&self.email),
        }
    }
}

/// Local part of an email address (everything before the first `@`)
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// The mutating operations the lifecycle controller performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOperation {
    Restore,
    Login,
    Signup,
    ProviderSignIn,
    Logout,
}

impl SessionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOperation::Restore => "restore",
            SessionOperation::Login => "login",
            SessionOperation::Signup => "signup",
            SessionOperation::ProviderSignIn => "provider_sign_in",
            SessionOperation::Logout => "logout",
        }
    }
}

impl fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide authentication state.
///
/// Loading states never carry an identity, so "loading while a stale identity
/// is visible" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// Initial state until the persisted session has been looked up
    #[default]
    Restoring,

    /// A login, signup, provider sign-in or logout is in flight
    Pending {
        operation: SessionOperation,
    },

    /// Signed in
    Authenticated {
        identity: Identity,
    },

    /// Signed out, or no session was found
    Anonymous,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Restoring | SessionState::Pending { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, SessionState::Anonymous)
    }

    /// The operation currently holding the loading flag, if any
    pub fn pending_operation(&self) -> Option<SessionOperation> {
        match self {
            SessionState::Restoring => Some(SessionOperation::Restore),
            SessionState::Pending { operation } => Some(*operation),
            _ => None,
        }
    }
}

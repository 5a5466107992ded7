pub mod controller;
pub mod events;
pub mod forms;
pub mod identity;
pub mod providers;
pub mod record;
pub mod session_store;
pub mod storage;

pub use controller::{ControllerOptions, SessionController, SessionPolicy};
pub use events::{SessionEvent, SessionEventKind, SessionEvents};
pub use forms::{FormError, LoginForm, SignupForm};
pub use identity::{Identity, SessionOperation, SessionState};
pub use providers::{CredentialVerifier, MockVerifier, MockVerifierConfig};
pub use session_store::{SessionStore, Subscription, SubscriptionId};
pub use storage::{FileSessionStore, MemorySessionStore, SessionPersistence};

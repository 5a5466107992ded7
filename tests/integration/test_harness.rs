//! Integration test harness
//! Provides a throwaway storage directory and a recorder for session states

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tempfile::TempDir;

use relatara_lib::{AppConfig, SessionContext, SessionState, Subscription};

/// Application set up the way the binary does it, in a temp directory
pub struct TestApp {
    _dir: TempDir,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut config = AppConfig::default();
        config.storage.path = dir.path().join("relatara.storage.json");
        config.verifier.delay_ms = 0;
        config.verifier.rejected_passwords = vec!["wrong-password".to_string()];

        Ok(Self { _dir: dir, config })
    }

    pub fn storage_path(&self) -> PathBuf {
        self.config.storage.path.clone()
    }

    /// A fresh context, as after a page reload
    pub fn context(&self) -> Result<SessionContext> {
        SessionContext::from_config(&self.config)
    }

    /// A fresh context that has already restored
    pub async fn restored_context(&self) -> Result<SessionContext> {
        let context = self.context()?;
        context.restore().await;
        Ok(context)
    }

    /// Raw contents of the storage file, if it exists
    pub fn storage_contents(&self) -> Option<serde_json::Value> {
        let contents = std::fs::read_to_string(self.storage_path()).ok()?;
        serde_json::from_str(&contents).ok()
    }
}

/// Collects every state published by a context
pub struct StateRecorder {
    states: Arc<Mutex<Vec<SessionState>>>,
    _subscription: Subscription,
}

impl StateRecorder {
    pub fn attach(context: &SessionContext) -> Self {
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let subscription = context.subscribe(move |state| {
            sink.lock().unwrap().push(state.clone());
        });

        Self {
            states,
            _subscription: subscription,
        }
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().unwrap().clone()
    }

    pub fn loading_flags(&self) -> Vec<bool> {
        self.states().iter().map(SessionState::is_loading).collect()
    }
}

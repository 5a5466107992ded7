use relatara_lib::{FileSessionStore, SessionContext, SessionPersistence, SessionState};

use crate::test_harness::TestApp;

#[tokio::test]
async fn test_record_lives_under_configured_key() {
    let mut app = TestApp::new().unwrap();
    app.config.storage.key = "relatara_session".to_string();

    let context = app.restored_context().await.unwrap();
    context.login("a@example.com", "pw").await.unwrap();

    let contents = app.storage_contents().unwrap();
    let raw = contents["relatara_session"].as_str().unwrap();
    let record: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(record["schemaVersion"], 1);
    assert_eq!(record["email"], "a@example.com");
    assert!(record["integrity"].is_string());
    assert!(contents.get("relatara_user").is_none());
}

#[tokio::test]
async fn test_legacy_record_is_restored() {
    let app = TestApp::new().unwrap();
    let store = FileSessionStore::new(app.storage_path());
    store
        .write(r#"{"id":"user-legacy1","email":"old@example.com","displayName":"old"}"#)
        .await
        .unwrap();

    let context = app.restored_context().await.unwrap();
    let identity = context.current_identity().unwrap();
    assert_eq!(identity.id(), "user-legacy1");
    assert_eq!(identity.display_name(), "old");
}

#[tokio::test]
async fn test_edited_record_fails_checksum() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();
    context.login("a@example.com", "pw").await.unwrap();

    let store = FileSessionStore::new(app.storage_path());
    let raw = store.read().await.unwrap().unwrap();
    store
        .write(&raw.replace("a@example.com", "admin@example.com"))
        .await
        .unwrap();

    let reloaded: SessionContext = app.context().unwrap();
    assert_eq!(reloaded.restore().await, SessionState::Anonymous);
    assert_eq!(store.read().await.unwrap(), None);
}

use relatara_lib::{AuthError, ErrorCode, ErrorReport, SessionEventKind, SessionState};

use crate::test_harness::{StateRecorder, TestApp};

#[tokio::test]
async fn test_fresh_install_starts_signed_out() {
    let app = TestApp::new().unwrap();
    let context = app.context().unwrap();
    assert!(context.get_state().is_loading());

    assert_eq!(context.restore().await, SessionState::Anonymous);
    assert!(app.storage_contents().is_none());
}

#[tokio::test]
async fn test_signup_reload_logout() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();
    let recorder = StateRecorder::attach(&context);

    let identity = context
        .signup("b@x.com", "pw", "Female", "25-34")
        .await
        .unwrap();
    assert_eq!(recorder.loading_flags(), vec![true, false]);

    // Reload: the record brings the same identity back
    let reloaded = app.restored_context().await.unwrap();
    assert_eq!(reloaded.current_identity(), Some(identity.clone()));
    assert_eq!(
        reloaded.current_identity().and_then(|i| i.age_group),
        Some("25-34".to_string())
    );

    reloaded.logout().await.unwrap();
    assert_eq!(reloaded.get_state(), SessionState::Anonymous);

    let after_logout = app.restored_context().await.unwrap();
    assert_eq!(after_logout.get_state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_rejected_login_writes_nothing() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();

    let err = context
        .login("a@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials { .. }));
    assert_eq!(context.get_state(), SessionState::Anonymous);
    assert!(app.storage_contents().is_none());

    let report = ErrorReport::from(&err);
    assert_eq!(report.code, ErrorCode::AuthInvalidCredentials);
}

#[tokio::test]
async fn test_corrupt_record_is_dropped_on_restore() {
    let app = TestApp::new().unwrap();
    std::fs::write(
        app.storage_path(),
        r#"{"relatara_user":"{\"schemaVersion\":1,\"id\":\"user-1\"}","theme":"dark"}"#,
    )
    .unwrap();

    let context = app.context().unwrap();
    assert_eq!(context.restore().await, SessionState::Anonymous);
    assert!(context
        .recent_events()
        .iter()
        .any(|e| matches!(e.kind, SessionEventKind::RestoreDegraded { .. })));

    let contents = app.storage_contents().unwrap();
    assert!(contents.get("relatara_user").is_none());
    assert_eq!(contents["theme"], "dark");
}

#[tokio::test]
async fn test_logout_twice_is_harmless() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();
    context.login("a@example.com", "pw").await.unwrap();

    context.logout().await.unwrap();
    context.logout().await.unwrap();
    assert_eq!(context.get_state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_provider_sign_in_persists() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();

    let identity = context.sign_in_with_provider().await.unwrap();
    let reloaded = app.restored_context().await.unwrap();
    assert_eq!(reloaded.current_identity(), Some(identity));
}

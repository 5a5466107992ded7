use std::sync::Arc;

use relatara_lib::{GuardDecision, HistoryNavigator, Navigator, Route, RouteGuard};

use crate::test_harness::TestApp;

#[tokio::test]
async fn test_protected_view_waits_then_redirects_when_signed_out() {
    let app = TestApp::new().unwrap();
    let context = app.context().unwrap();
    let navigator = Arc::new(HistoryNavigator::new(Route::parse("/feed")));
    let guard = RouteGuard::new();

    assert_eq!(
        guard.evaluate(&Route::Feed, &context.get_state()),
        GuardDecision::Wait
    );
    let _watch = guard.watch(context.store(), navigator.clone());
    assert_eq!(navigator.current(), Route::Feed);

    context.restore().await;
    assert_eq!(navigator.current(), Route::Login);
}

#[tokio::test]
async fn test_protected_view_renders_after_restore() {
    let app = TestApp::new().unwrap();
    app.restored_context()
        .await
        .unwrap()
        .login("a@example.com", "pw")
        .await
        .unwrap();

    let context = app.context().unwrap();
    let navigator = Arc::new(HistoryNavigator::new(Route::parse("/ai")));
    let _watch = RouteGuard::new().watch(context.store(), navigator.clone());

    context.restore().await;
    assert_eq!(navigator.current(), Route::AiHelp);
    assert_eq!(navigator.history(), vec![Route::AiHelp]);
}

#[tokio::test]
async fn test_sign_out_anywhere_leaves_protected_view() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();
    context.login("a@example.com", "pw").await.unwrap();

    let navigator = Arc::new(HistoryNavigator::new(Route::parse("/my-posts")));
    let _watch = RouteGuard::new().watch(context.store(), navigator.clone());
    navigator.push(Route::parse("/post"));

    context.logout().await.unwrap();
    assert_eq!(
        navigator.history(),
        vec![Route::MyPosts, Route::Login]
    );
}

#[tokio::test]
async fn test_root_and_public_views() {
    let app = TestApp::new().unwrap();
    let context = app.restored_context().await.unwrap();

    let navigator = Arc::new(HistoryNavigator::new(Route::parse("/")));
    let _watch = RouteGuard::new().watch(context.store(), navigator.clone());
    assert_eq!(navigator.current(), Route::Login);

    navigator.push(Route::parse("/nowhere"));
    assert_eq!(
        RouteGuard::new().evaluate(&navigator.current(), &context.get_state()),
        GuardDecision::Render
    );
}

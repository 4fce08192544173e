use std::sync::Arc;

mod support;

use b2c_core::{AccountStore, AuthError, ErrorClass, Policy, ProviderError, TokenCache};
use b2c_keystore::MemoryTokenCache;
use b2c_session::{CancellationToken, Session, SessionController, SurfaceError};
use mockito::Server;
use support::{Step, ScriptedSurface};

fn controller(surface: Arc<ScriptedSurface>, cache: Arc<MemoryTokenCache>) -> SessionController {
    SessionController::new(support::config(), cache, surface).expect("controller")
}

fn susi_id() -> String {
    support::account_id("0001", "b2c_1_susi")
}

fn edit_id() -> String {
    support::account_id("0001", "b2c_1_edit_profile")
}

#[tokio::test]
async fn sign_in_creates_session_and_caches_token() {
    let cache = support::memory_cache();
    let surface = ScriptedSurface::new([Step::SignIn(susi_id())]);
    let controller = controller(surface.clone(), cache.clone());

    let session = controller.sign_in(&CancellationToken::new()).await.expect("sign in");

    assert_eq!(session.access_token(), Some("interactive-1"));
    assert_eq!(
        session.account().map(|account| account.home_account_id.as_str()),
        Some(susi_id().as_str())
    );
    let requests = surface.requests();
    assert!(requests[0].account.is_none());
    assert_eq!(requests[0].authority.policy(), "b2c_1_susi");
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn forgot_password_restarts_under_reset_policy() {
    let reset_id = support::account_id("0001", "b2c_1_reset");
    let surface = ScriptedSurface::new([
        Step::Fail(SurfaceError::Provider(ProviderError::from_oauth(
            "access_denied",
            "AADB2C90118: The user has forgotten their password.",
        ))),
        Step::SignIn(reset_id.clone()),
    ]);
    let controller = controller(surface.clone(), support::memory_cache());

    let session = controller.sign_in(&CancellationToken::new()).await.expect("reset");

    let requests = surface.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].authority.policy(), "b2c_1_reset");
    assert_eq!(
        session.account().map(|account| account.home_account_id.as_str()),
        Some(reset_id.as_str())
    );
}

#[tokio::test]
async fn cancelled_sign_in_is_not_a_failure() {
    let surface = ScriptedSurface::new([Step::Fail(SurfaceError::Cancelled)]);
    let controller = controller(surface, support::memory_cache());

    let err = controller
        .sign_in(&CancellationToken::new())
        .await
        .expect_err("cancelled");

    assert!(matches!(err, AuthError::UserCancelled));
    assert_eq!(err.class(), ErrorClass::Cancelled);
}

#[tokio::test]
async fn edit_profile_hints_then_reuses_edit_account() {
    let cache = support::memory_cache();
    let surface = ScriptedSurface::new([
        Step::SignIn(susi_id()),
        Step::SignIn(edit_id()),
        Step::SignIn(edit_id()),
    ]);
    let controller = controller(surface.clone(), cache.clone());
    let cancel = CancellationToken::new();
    let session = controller.sign_in(&cancel).await.expect("sign in");

    let edited = controller.edit_profile(&session, &cancel).await.expect("first edit");
    assert_eq!(edited.account.home_account_id.as_str(), edit_id());
    assert_eq!(edited.authority.policy(), "b2c_1_edit_profile");
    let requests = surface.requests();
    let first = &requests[1];
    assert!(first.account.is_none());
    assert_eq!(first.login_hint.as_deref(), Some(support::EMAIL));
    assert_eq!(session.access_token(), Some("interactive-1"));

    controller.edit_profile(&session, &cancel).await.expect("second edit");
    let requests = surface.requests();
    let second = &requests[2];
    assert_eq!(
        second.account.as_ref().map(|account| account.home_account_id.as_str()),
        Some(edit_id().as_str())
    );
}

#[tokio::test]
async fn refresh_uses_cached_token_silently() {
    let surface = ScriptedSurface::new([Step::SignIn(susi_id())]);
    let controller = controller(surface.clone(), support::memory_cache());
    let cancel = CancellationToken::new();
    let session = controller.sign_in(&cancel).await.expect("sign in");

    let refreshed = controller.refresh(&session, &cancel).await.expect("refresh");

    assert_eq!(refreshed, session);
    assert_eq!(surface.presented(), 1);
}

#[tokio::test]
async fn refresh_finds_account_in_cache_when_session_is_empty() {
    let surface = ScriptedSurface::new([Step::SignIn(susi_id())]);
    let controller = controller(surface.clone(), support::memory_cache());
    let cancel = CancellationToken::new();
    controller.sign_in(&cancel).await.expect("sign in");

    let refreshed = controller
        .refresh(&Session::empty(), &cancel)
        .await
        .expect("refresh");

    assert_eq!(refreshed.access_token(), Some("interactive-1"));
}

#[tokio::test]
async fn refresh_without_any_account_fails() {
    let controller = controller(ScriptedSurface::new([]), support::memory_cache());
    let err = controller
        .refresh(&Session::empty(), &CancellationToken::new())
        .await
        .expect_err("no account");
    assert!(matches!(err, AuthError::NoMatchingAccount(Policy::SignUpOrSignIn)));
}

#[tokio::test]
async fn sign_out_removes_related_accounts_and_is_idempotent() {
    let cache = support::memory_cache();
    let surface = ScriptedSurface::new([Step::SignIn(susi_id()), Step::SignIn(edit_id())]);
    let controller = controller(surface, cache.clone());
    let cancel = CancellationToken::new();
    let session = controller.sign_in(&cancel).await.expect("sign in");
    controller.edit_profile(&session, &cancel).await.expect("edit");
    assert_eq!(cache.accounts().expect("accounts").len(), 2);

    let signed_out = controller.sign_out(&session).expect("sign out");
    assert!(!signed_out.is_signed_in());
    assert!(cache.is_empty());
    let store = AccountStore::new(support::config().policies);
    let accounts = cache.accounts().expect("accounts");
    assert!(store.find_by_policy(&accounts, Policy::SignUpOrSignIn).is_none());

    let again = controller.sign_out(&signed_out).expect("second sign out");
    assert_eq!(again, Session::empty());
}

#[tokio::test]
async fn sign_out_removes_only_the_session_user() {
    let alice = support::account_id("aaaa", "b2c_1_susi");
    let bob = support::account_id("bbbb", "b2c_1_susi");
    let cache = support::memory_cache();
    let surface = ScriptedSurface::new([Step::SignIn(alice.clone()), Step::SignIn(bob)]);
    let controller = controller(surface, cache.clone());
    let cancel = CancellationToken::new();
    controller.sign_in(&cancel).await.expect("alice");
    let bob_session = controller.sign_in(&cancel).await.expect("bob");

    controller.sign_out(&bob_session).expect("sign out");

    let remaining: Vec<String> = cache
        .accounts()
        .expect("accounts")
        .iter()
        .map(|account| account.home_account_id.as_str().to_string())
        .collect();
    assert_eq!(remaining, vec![alice]);
}

#[tokio::test]
async fn edit_profile_never_hints_another_users_record() {
    let alice_edit = support::account_id("aaaa", "b2c_1_edit_profile");
    let bob_edit = support::account_id("bbbb", "b2c_1_edit_profile");
    let surface = ScriptedSurface::new([
        Step::SignIn(support::account_id("aaaa", "b2c_1_susi")),
        Step::SignIn(alice_edit),
        Step::SignIn(support::account_id("bbbb", "b2c_1_susi")),
        Step::SignIn(bob_edit.clone()),
    ]);
    let controller = controller(surface.clone(), support::memory_cache());
    let cancel = CancellationToken::new();
    let alice = controller.sign_in(&cancel).await.expect("alice");
    controller.edit_profile(&alice, &cancel).await.expect("alice edit");
    let bob = controller.sign_in(&cancel).await.expect("bob");

    let edited = controller.edit_profile(&bob, &cancel).await.expect("bob edit");

    assert_eq!(edited.account.home_account_id.as_str(), bob_edit);
    let requests = surface.requests();
    let last = &requests[3];
    assert!(last.account.is_none());
    assert_eq!(last.login_hint.as_deref(), Some(support::EMAIL));
}

#[tokio::test]
async fn resource_call_requires_active_token() {
    let controller = controller(ScriptedSurface::new([]), support::memory_cache());
    let err = controller
        .call_protected_resource(&Session::empty(), "https://example.invalid/hello")
        .await
        .expect_err("no token");
    assert!(matches!(err, AuthError::NoActiveToken));
}

#[tokio::test]
async fn call_api_sends_session_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/hello")
        .match_header("authorization", "Bearer interactive-1")
        .with_status(200)
        .with_body(r#"{"name":"Alice"}"#)
        .create_async()
        .await;
    let mut config = support::config();
    config.api_endpoint = Some(format!("{}/hello", server.url()));
    let controller = SessionController::new(
        config,
        support::memory_cache(),
        ScriptedSurface::new([Step::SignIn(susi_id())]),
    )
    .expect("controller");
    let session = controller
        .sign_in(&CancellationToken::new())
        .await
        .expect("sign in");

    let body = controller.call_api(&session).await.expect("call api");

    assert_eq!(body["name"], "Alice");
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_resource_call_maps_to_resource_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/hello")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let surface = ScriptedSurface::new([Step::SignIn(susi_id())]);
    let controller = controller(surface, support::memory_cache());
    let session = controller
        .sign_in(&CancellationToken::new())
        .await
        .expect("sign in");

    let err = controller
        .call_protected_resource(&session, &format!("{}/hello", server.url()))
        .await
        .expect_err("status");
    assert!(matches!(err, AuthError::ResourceCall(_)));
}

#[tokio::test]
async fn call_api_without_endpoint_is_configuration_error() {
    let controller = controller(ScriptedSurface::new([]), support::memory_cache());
    let err = controller
        .call_api(&Session::empty())
        .await
        .expect_err("no endpoint");
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[tokio::test]
async fn restore_rebuilds_session_from_cache() {
    let cache = support::memory_cache();
    let surface = ScriptedSurface::new([Step::SignIn(susi_id())]);
    let first = controller(surface, cache.clone());
    let session = first.sign_in(&CancellationToken::new()).await.expect("sign in");

    let second = controller(ScriptedSurface::new([]), cache);
    assert_eq!(second.restore().expect("restore"), session);

    let empty = controller(ScriptedSurface::new([]), support::memory_cache());
    assert_eq!(empty.restore().expect("restore"), Session::empty());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = support::config();
    config.tenant.clear();
    let err = SessionController::new(
        config,
        support::memory_cache(),
        ScriptedSurface::new([]),
    )
    .err()
    .expect("invalid config");
    assert!(matches!(err, AuthError::Config(_)));
}

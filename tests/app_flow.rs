use api_client::BacktestApi;
use backtest_console::{AppContext, POST_LOGIN_KEY};
use browser::{Document, MemoryStorage, Storage};
use configuration::{ApiSettings, ClientConfig};
use core_types::{HistoryQuery, ThemeMode};
use httpmock::prelude::*;
use router::View;
use serde_json::json;
use std::sync::Arc;

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api: ApiSettings {
            base_url: "/api".to_string(),
            origin: server.base_url(),
        },
        ..ClientConfig::default()
    }
}

fn app(server: &MockServer, storage: Arc<MemoryStorage>) -> AppContext {
    AppContext::with_storage(config_for(server), storage).unwrap()
}

fn user_json() -> serde_json::Value {
    json!({ "id": 42, "email": "ana@example.com", "name": "Ana", "picture": null })
}

#[tokio::test]
async fn signed_in_user_browses_protected_views_with_one_check() {
    let server = MockServer::start_async().await;
    let check = server.mock(|when, then| {
        when.method(GET)
            .path("/api/auth/check")
            .header("authorization", "Bearer stored-token");
        then.status(200)
            .json_body(json!({ "authenticated": true, "user": user_json() }));
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set("access_token", "stored-token").unwrap();
    let app = app(&server, storage);

    let dashboard = app.router().navigate("/").await.unwrap();
    let history = app.router().navigate("/history").await.unwrap();

    check.assert_calls(1);
    assert_eq!(dashboard.route.view, View::Dashboard);
    assert_eq!(history.route.view, View::History);
    assert_eq!(app.window().title(), "History - Stock Backtester");
    assert_eq!(app.session().user().unwrap().email, "ana@example.com");
}

#[tokio::test]
async fn signed_out_user_lands_on_login_with_redirect() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/check");
        then.status(200)
            .json_body(json!({ "authenticated": false, "user": null }));
    });

    let app = app(&server, Arc::new(MemoryStorage::new()));
    let landed = app.router().navigate("/compare").await.unwrap();

    assert_eq!(landed.route.view, View::Login);
    assert_eq!(landed.query_param("redirect").as_deref(), Some("/compare"));
    assert_eq!(app.current_path(), "/login");
    assert!(!app.session().is_authenticated());
}

#[tokio::test]
async fn unauthorized_response_signs_the_user_out_everywhere() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/check");
        then.status(200)
            .json_body(json!({ "authenticated": true, "user": user_json() }));
    });
    let history = server.mock(|when, then| {
        when.method(GET).path("/api/backtest/history");
        then.status(401).json_body(json!({ "detail": "Token expired" }));
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set("access_token", "expired").unwrap();
    let app = app(&server, storage.clone());
    app.router().navigate("/history").await.unwrap();

    let err = app
        .api()
        .get_history(&HistoryQuery::default())
        .await
        .unwrap_err();

    history.assert_calls(1);
    assert!(err.is_unauthorized());
    assert_eq!(storage.get("access_token"), None);
    assert!(!app.session().is_authenticated());
    assert_eq!(app.window().page_loads(), vec!["/login"]);
    assert_eq!(app.current_path(), "/login");
}

#[tokio::test]
async fn oauth_round_trip_returns_to_the_requested_page() {
    let server = MockServer::start_async().await;
    let check = server.mock(|when, then| {
        when.method(GET)
            .path("/api/auth/check")
            .header("authorization", "Bearer fresh");
        then.status(200)
            .json_body(json!({ "authenticated": true, "user": user_json() }));
    });

    let storage = Arc::new(MemoryStorage::new());
    let app = app(&server, storage.clone());

    app.begin_login(Some("/optimize")).unwrap();
    assert_eq!(
        app.window().page_loads(),
        vec![format!("{}/api/auth/google", server.base_url())]
    );
    assert_eq!(storage.get(POST_LOGIN_KEY).as_deref(), Some("/optimize"));

    let landed = app.finish_login("fresh").await.unwrap();

    check.assert_calls(1);
    assert_eq!(landed.route.view, View::Optimize);
    assert_eq!(storage.get("access_token").as_deref(), Some("fresh"));
    assert_eq!(storage.get(POST_LOGIN_KEY), None);
}

#[tokio::test]
async fn guard_redirect_survives_the_oauth_round_trip() {
    let server = MockServer::start_async().await;
    let signed_in = server.mock(|when, then| {
        when.method(GET)
            .path("/api/auth/check")
            .header("authorization", "Bearer fresh");
        then.status(200)
            .json_body(json!({ "authenticated": true, "user": user_json() }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/check").header_missing("authorization");
        then.status(200)
            .json_body(json!({ "authenticated": false, "user": null }));
    });

    let storage = Arc::new(MemoryStorage::new());
    let app = app(&server, storage.clone());

    let login = app.router().navigate("/history?page=2").await.unwrap();
    assert_eq!(login.route.view, View::Login);

    app.begin_login(None).unwrap();
    assert_eq!(storage.get(POST_LOGIN_KEY).as_deref(), Some("/history?page=2"));

    let landed = app.finish_login("fresh").await.unwrap();

    signed_in.assert_calls(1);
    assert_eq!(landed.route.view, View::History);
    assert_eq!(landed.full_path, "/history?page=2");
    assert_eq!(app.current_path(), "/history");
}

#[tokio::test]
async fn login_without_destination_forgets_the_previous_one() {
    let server = MockServer::start_async().await;
    let storage = Arc::new(MemoryStorage::new());
    storage.set(POST_LOGIN_KEY, "/compare").unwrap();
    let app = app(&server, storage.clone());

    app.begin_login(None).unwrap();

    assert_eq!(storage.get(POST_LOGIN_KEY), None);
}

#[tokio::test]
async fn whoami_reloads_the_profile() {
    let server = MockServer::start_async().await;
    let me = server.mock(|when, then| {
        when.method(GET)
            .path("/api/auth/me")
            .header("authorization", "Bearer t");
        then.status(200).json_body(user_json());
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set("access_token", "t").unwrap();
    let app = app(&server, storage);

    let user = app.whoami().await.unwrap().unwrap();

    me.assert_calls(1);
    assert_eq!(user.email, "ana@example.com");
    assert!(app.session().is_authenticated());
}

#[tokio::test]
async fn whoami_with_a_rejected_token_signs_out() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/me");
        then.status(401).json_body(json!({ "detail": "Not authenticated" }));
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set("access_token", "expired").unwrap();
    let app = app(&server, storage.clone());

    assert!(app.whoami().await.unwrap().is_none());
    assert_eq!(storage.get("access_token"), None);
    assert_eq!(app.window().page_loads(), vec!["/login"]);
}

#[tokio::test]
async fn rejected_oauth_token_ends_on_login() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/check");
        then.status(200)
            .json_body(json!({ "authenticated": false, "user": null }));
    });

    let storage = Arc::new(MemoryStorage::new());
    let app = app(&server, storage.clone());

    let landed = app.finish_login("bogus").await.unwrap();

    assert_eq!(landed.route.view, View::Login);
    assert_eq!(storage.get("access_token"), None);
}

#[tokio::test]
async fn logout_clears_local_state_even_when_the_server_fails() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/auth/check");
        then.status(200)
            .json_body(json!({ "authenticated": true, "user": user_json() }));
    });
    let logout = server.mock(|when, then| {
        when.method(POST).path("/api/auth/logout");
        then.status(500);
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set("access_token", "t").unwrap();
    let app = app(&server, storage.clone());
    app.router().navigate("/").await.unwrap();

    let landed = app.logout().await.unwrap();

    logout.assert_calls(1);
    assert_eq!(landed.route.view, View::Login);
    assert!(!app.session().is_authenticated());
    assert_eq!(storage.get("access_token"), None);
}

#[tokio::test]
async fn theme_preference_survives_a_restart() {
    let server = MockServer::start_async().await;
    let storage = Arc::new(MemoryStorage::new());

    let first = app(&server, storage.clone());
    assert_eq!(first.theme().toggle(), ThemeMode::Dark);
    assert!(first.window().has_root_class("dark"));

    let second = app(&server, storage);
    assert_eq!(second.theme().mode(), ThemeMode::Dark);
    assert!(second.window().has_root_class("dark"));
}

//! Integration tests for the API client's dispatch and refresh protocol.
//!
//! Exercises the 401 refresh-and-retry state machine against a mock backend,
//! including the single-flight guarantee for concurrent callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use agora_core::api::{ApiClient, ApiError};
use agora_core::config::Config;
use agora_core::session::SessionStore;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Builds a client over a temp session home, logged in with the given tokens.
fn client_for(server: &MockServer, tokens: Option<(&str, &str)>) -> (TempDir, Arc<ApiClient>) {
    let home = TempDir::new().expect("create temp home");
    let session = Arc::new(SessionStore::new(home.path().join("session.json")));
    if let Some((access, refresh)) = tokens {
        session.login(access, refresh).unwrap();
    }

    let config = Config {
        base_url: server.uri(),
        ..Config::default()
    };
    let client = ApiClient::new(&config, session).expect("build client");
    (home, Arc::new(client))
}

fn refresh_success_mock(new_access: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": new_access }))
                // Long enough that concurrent 401 handlers overlap the
                // in-flight refresh instead of racing past it.
                .set_delay(Duration::from_millis(200)),
        )
}

#[tokio::test]
async fn test_bearer_and_json_content_type_attached() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("access-1", "refresh-1")));

    Mock::given(method("POST"))
        .and(path("/api/v1/boards"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "name": "general", "memberId": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let board = client
        .create_board(&agora_core::api::boards::BoardInput {
            name: "general",
            description: None,
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(board.id, 1);
    assert_eq!(board.name, "general");
}

#[tokio::test]
async fn test_bodyless_get_also_defaults_json_content_type() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("access-1", "refresh-1")));

    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let boards = client.list_boards().await.unwrap().unwrap();
    assert!(boards.is_empty());
}

#[tokio::test]
async fn test_no_content_resolves_empty_regardless_of_body() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("access-1", "refresh-1")));

    Mock::given(method("DELETE"))
        .and(path("/api/v1/boards/3"))
        .respond_with(ResponseTemplate::new(204).set_body_string("ignored"))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_board(3).await.unwrap();
}

#[tokio::test]
async fn test_error_body_maps_to_request_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("access-1", "refresh-1")));

    Mock::given(method("POST"))
        .and(path("/api/v1/members"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Validation failed",
            "errors": ["email must be valid", "nickname too short"]
        })))
        .mount(&server)
        .await;

    let err = client
        .signup(&agora_core::api::members::SignupRequest {
            email: "bad",
            password: "pw",
            nickname: "n",
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Validation failed (HTTP 400)");
    assert_eq!(
        err.validation_errors(),
        ["email must be valid", "nickname too short"]
    );
}

#[tokio::test]
async fn test_error_without_body_gets_generic_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("access-1", "refresh-1")));

    Mock::given(method("GET"))
        .and(path("/api/v1/boards/9"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.get_board(9).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("Request failed"));
}

#[tokio::test]
async fn test_401_refreshes_then_retries_once_with_new_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (home, client) = client_for(&server, Some(("stale-access", "refresh-1")));

    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .and(header("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .and(header("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "general", "memberId": 7 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    refresh_success_mock("fresh-access")
        .expect(1)
        .mount(&server)
        .await;

    let boards = client.list_boards().await.unwrap().unwrap();
    assert_eq!(boards.len(), 1);

    // The session now holds the refreshed access token and the same,
    // unrotated refresh token.
    let session = SessionStore::new(home.path().join("session.json"));
    assert_eq!(session.access_token().as_deref(), Some("fresh-access"));
    assert_eq!(session.refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_concurrent_401s_share_a_single_refresh() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("stale-access", "refresh-1")));

    for route in ["/api/v1/boards/1", "/api/v1/boards/2", "/api/v1/boards/3"] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "Bearer stale-access"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "Bearer fresh-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "name": "general", "memberId": 7
            })))
            .mount(&server)
            .await;
    }
    // The core property: three concurrent 401 handlers, one refresh call.
    refresh_success_mock("fresh-access")
        .expect(1)
        .mount(&server)
        .await;

    let (a, b, c) = tokio::join!(
        client.get_board(1),
        client.get_board(2),
        client.get_board(3),
    );
    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());
    assert!(c.unwrap().is_some());
}

#[tokio::test]
async fn test_refresh_failure_forces_logout_and_resolves_empty() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("stale-access", "refresh-1")));

    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let expired = Arc::new(AtomicBool::new(false));
    let expired_flag = Arc::clone(&expired);
    client.set_session_expired_hook(move || {
        expired_flag.store(true, Ordering::SeqCst);
    });

    // The original call resolves empty instead of failing.
    let result = client.list_boards().await.unwrap();
    assert!(result.is_none());

    assert!(expired.load(Ordering::SeqCst));
    assert!(!client.session().is_logged_in());
    assert!(client.session().refresh_token().is_none());
}

#[tokio::test]
async fn test_401_without_refresh_token_skips_refresh_endpoint() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, None);

    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.list_boards().await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_retry_outcome_is_final_no_second_refresh_loop() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, Some(("stale-access", "refresh-1")));

    // Every data request 401s, even with the refreshed token.
    Mock::given(method("GET"))
        .and(path("/api/v1/boards"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    refresh_success_mock("fresh-access")
        .expect(1)
        .mount(&server)
        .await;

    // The retry's 401 surfaces as a request failure; no second cycle.
    let err = client.list_boards().await.unwrap_err();
    assert!(matches!(err, ApiError::Request { status: 401, .. }));
}

#[tokio::test]
async fn test_successful_login_call_needs_no_credentials() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    let (_home, client) = client_for(&server, None);

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1"
        })))
        .mount(&server)
        .await;

    let tokens = client.login("a@b.com", "pw").await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token, "refresh-1");
}

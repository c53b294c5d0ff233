//! Mock backend helpers for integration tests
//!
//! Wraps a wiremock server standing in for the document portal backend.

use std::time::Duration;

use docportal::client::{ReqwestTransport, SessionGateway};
use docportal::shared::GatewayConfig;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/api/v1/identity/login";
pub const LOGOUT_PATH: &str = "/api/v1/identity/logout";
pub const REFRESH_PATH: &str = "/api/v1/identity/refresh";
pub const ME_PATH: &str = "/api/v1/identity/me";

/// Configuration pointing at the mock server, without the post-refresh pause
pub fn test_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig::builder()
        .api_url(server.uri())
        .refresh_grace(Duration::ZERO)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("mock server URI is a valid base URL")
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind test port");
    let port = listener.local_addr().expect("bound listener has an address").port();
    drop(listener);
    port
}

/// Gateway over a real HTTP transport talking to the mock server
pub fn gateway_for(server: &MockServer) -> SessionGateway {
    let config = test_config(server);
    let transport = ReqwestTransport::new(config.clone()).expect("Failed to build transport");
    SessionGateway::new(transport, config)
}

pub fn user_json() -> Value {
    json!({
        "id": "u-1",
        "name": "Ana Lima",
        "email": "ana@example.com"
    })
}

/// `POST /login` succeeds and sets the initial session cookie
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=old; Path=/; HttpOnly")
                .set_body_json(json!({ "message": "Login successful", "user": user_json() })),
        )
        .mount(server)
        .await;
}

/// `GET /me` always answers with the test user
pub async fn mount_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ME_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
        .mount(server)
        .await;
}

/// `POST /refresh` answers with `status`, issuing a new cookie on success
pub async fn mount_refresh(server: &MockServer, status: u16, expected_calls: u64) {
    let mut response = ResponseTemplate::new(status);
    if status == 200 {
        response = response
            .insert_header("set-cookie", "session=new; Path=/; HttpOnly")
            .set_body_json(json!({ "message": "Token refreshed" }));
    } else {
        response = response.set_body_json(json!({ "error": "refresh token expired" }));
    }
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// `method path` answers 401 once, then `body` with 200
pub async fn mount_expiring(server: &MockServer, verb: &str, route: &str, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "token expired" })))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

//! Property-based tests for the single-flight refresh
//!
//! Uses an in-memory backend whose refresh endpoint holds until every
//! concurrent caller has seen its 401, so all of them overlap one cycle.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures_util::future::join_all;
use docportal::client::{ApiRequest, ApiResponse, RefreshState, SessionGateway, Transport};
use docportal::shared::{GatewayConfig, GatewayError};
use proptest::prelude::*;
use reqwest::StatusCode;
use serde_json::json;

#[derive(Clone)]
struct ExpiringBackend {
    callers: usize,
    refresh_succeeds: bool,
    session_valid: Arc<AtomicBool>,
    unauthorized: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl ExpiringBackend {
    fn new(callers: usize, refresh_succeeds: bool) -> Self {
        Self {
            callers,
            refresh_succeeds,
            session_valid: Arc::new(AtomicBool::new(false)),
            unauthorized: Arc::new(AtomicUsize::new(0)),
            refreshes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Transport for ExpiringBackend {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        if request.path() == REFRESH_PATH {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
            while self.unauthorized.load(Ordering::SeqCst) < self.callers
                && tokio::time::Instant::now() < deadline
            {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            if !self.refresh_succeeds {
                return Ok(ApiResponse::json_body(StatusCode::UNAUTHORIZED, &json!({})));
            }
            self.session_valid.store(true, Ordering::SeqCst);
            return Ok(ApiResponse::json_body(StatusCode::OK, &json!({})));
        }

        if self.session_valid.load(Ordering::SeqCst) {
            Ok(ApiResponse::json_body(StatusCode::OK, &json!({ "path": request.path() })))
        } else {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::json_body(StatusCode::UNAUTHORIZED, &json!({})))
        }
    }
}

fn gateway(backend: ExpiringBackend) -> SessionGateway<ExpiringBackend> {
    let config = GatewayConfig::builder()
        .refresh_grace(Duration::ZERO)
        .event_capacity(256)
        .build()
        .unwrap();
    SessionGateway::new(backend, config)
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    // Single-threaded so a caller's 401 and its admission happen in one poll
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_concurrent_expiries_trigger_one_refresh(callers in 1usize..12) {
        let backend = ExpiringBackend::new(callers, true);
        let refreshes = backend.refreshes.clone();
        let gateway = gateway(backend);
        let mut events = gateway.subscribe();

        let results = run(async {
            let tasks: Vec<_> = (0..callers)
                .map(|i| {
                    let gateway = gateway.clone();
                    tokio::spawn(async move { gateway.get(&format!("/api/v1/documents/{}", i)).await })
                })
                .collect();
            join_all(tasks)
                .await
                .into_iter()
                .map(|joined| joined.unwrap())
                .collect::<Vec<_>>()
        });

        prop_assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        for (i, result) in results.iter().enumerate() {
            let body: serde_json::Value = result.as_ref().unwrap().json().unwrap();
            let expected = format!("/api/v1/documents/{}", i);
            prop_assert_eq!(body["path"].as_str(), Some(expected.as_str()));
        }
        prop_assert_eq!(
            event_kinds(&drain_events(&mut events)),
            vec!["refresh_started", "refresh_ended"]
        );
        prop_assert_eq!(gateway.refresh_state(), RefreshState::Idle);
    }

    #[test]
    fn prop_failed_refresh_rejects_every_caller(callers in 1usize..12) {
        let backend = ExpiringBackend::new(callers, false);
        let refreshes = backend.refreshes.clone();
        let gateway = gateway(backend);
        let mut events = gateway.subscribe();

        let results = run(async {
            let tasks: Vec<_> = (0..callers)
                .map(|i| {
                    let gateway = gateway.clone();
                    tokio::spawn(async move { gateway.get(&format!("/api/v1/documents/{}", i)).await })
                })
                .collect();
            join_all(tasks)
                .await
                .into_iter()
                .map(|joined| joined.unwrap())
                .collect::<Vec<_>>()
        });

        prop_assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        for result in &results {
            prop_assert!(result.as_ref().unwrap_err().is_unauthorized());
        }
        prop_assert_eq!(
            event_kinds(&drain_events(&mut events)),
            vec!["refresh_started", "auth:false", "refresh_ended"]
        );
        prop_assert_eq!(gateway.queued_requests(), 0);
    }
}

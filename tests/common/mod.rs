// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use brahma_path::config::Config;
use brahma_path::db::MemoryRecords;
use brahma_path::routes::create_router;
use brahma_path::services::LocalIdentity;
use brahma_path::store::MemoryKv;
use brahma_path::time_utils::ManualClock;
use brahma_path::AppState;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if a live Supabase project is configured.
#[allow(dead_code)]
pub fn supabase_available() -> bool {
    std::env::var("SUPABASE_URL").is_ok() && std::env::var("SUPABASE_ANON_KEY").is_ok()
}

/// Skip test with message if no live backend is configured.
#[macro_export]
macro_rules! require_supabase {
    () => {
        if !crate::common::supabase_available() {
            eprintln!("⚠️  Skipping: SUPABASE_URL / SUPABASE_ANON_KEY not set");
            return;
        }
    };
}

/// Fixed start instant for time-based tests.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()
}

/// Offline app with handles on every test double.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub kv: Arc<MemoryKv>,
    pub records: Arc<MemoryRecords>,
    pub identity: Arc<LocalIdentity>,
    pub clock: Arc<ManualClock>,
}

/// Create a test app with an empty, provisioned remote store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(MemoryRecords::new())
}

/// Create a test app over the given remote store.
#[allow(dead_code)]
pub fn create_test_app_with(records: MemoryRecords) -> TestApp {
    let kv = Arc::new(MemoryKv::new());
    let records = Arc::new(records);
    let identity = Arc::new(LocalIdentity::new());
    let clock = Arc::new(ManualClock::new(t0()));

    let state = Arc::new(AppState::new(
        Config::test_default(),
        kv.clone(),
        records.clone(),
        identity.clone(),
        clock.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        kv,
        records,
        identity,
        clock,
    }
}

impl TestApp {
    /// Send a request and return the status and JSON body (`Null` if empty).
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[allow(dead_code)]
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    #[allow(dead_code)]
    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

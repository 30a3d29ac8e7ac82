// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use friend_keeper::config::Config;
use friend_keeper::db::{FirestoreDb, MemoryDb};
use friend_keeper::routes::create_router;
use friend_keeper::time_utils::FixedClock;
use friend_keeper::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fixed start time shared by the API tests.
#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// App wired to in-memory storage and a controllable clock.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub clock: Arc<FixedClock>,
}

/// Create a test app with the default test configuration.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

/// Create a test app with a custom configuration.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let db = MemoryDb::new();
    let clock = Arc::new(FixedClock::new(start_time()));

    let state = Arc::new(
        AppState::new(config, Arc::new(db.clone()), clock.clone())
            .expect("Failed to build app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        clock,
    }
}

/// Response parts used by the assertions.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// Send a request, optionally as a device and with a JSON body.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        device_id: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(device_id) = device_id {
            builder = builder.header("X-Device-Id", device_id);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Send a prepared request.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    #[allow(dead_code)]
    pub async fn get(&self, uri: &str, device_id: &str) -> TestResponse {
        self.request("GET", uri, Some(device_id), None).await
    }

    #[allow(dead_code)]
    pub async fn post(&self, uri: &str, device_id: &str, body: Value) -> TestResponse {
        self.request("POST", uri, Some(device_id), Some(body)).await
    }

    /// Create a contact and return its ID.
    #[allow(dead_code)]
    pub async fn create_friend(&self, device_id: &str, body: Value) -> String {
        let response = self.post("/api/v1/friends", device_id, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Log an interaction at the current clock time.
    #[allow(dead_code)]
    pub async fn log_interaction(&self, device_id: &str, friend_id: &str, body: Value) {
        let response = self
            .post(
                &format!("/api/v1/friends/{}/interactions", friend_id),
                device_id,
                body,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Talk starter tests: token gating, consumption and generator fallback.

use axum::http::StatusCode;
use friend_keeper::config::Config;
use httpmock::prelude::*;
use serde_json::json;

mod common;

const DEVICE: &str = "device-alice";

fn llm_config(server: &MockServer) -> Config {
    Config {
        llm_proxy_url: server.base_url(),
        llm_proxy_key: "llm-key".to_string(),
        ..Config::test_default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

#[tokio::test]
async fn test_free_trial_then_payment_required() {
    let app = common::create_test_app();
    let id = app.create_friend(DEVICE, json!({"name": "Ada"})).await;

    for remaining in (0..3).rev() {
        let response = app
            .post("/api/v1/talk-starters", DEVICE, json!({"friend_id": id}))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["starters"][0], "How have you been lately?");
        assert_eq!(
            response.body["context_used"],
            "No previous interactions recorded."
        );

        let tokens = app.get("/api/v1/tokens", DEVICE).await;
        assert_eq!(tokens.body["free_trial_remaining"], remaining);
    }

    let response = app
        .post("/api/v1/talk-starters", DEVICE, json!({"friend_id": id}))
        .await;
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(response.body["error"], "payment_required");
    assert_eq!(
        response.body["details"],
        "No generations remaining. Please purchase more."
    );
}

#[tokio::test]
async fn test_unknown_friend_is_not_charged() {
    let app = common::create_test_app();

    let response = app
        .post(
            "/api/v1/talk-starters",
            DEVICE,
            json!({"friend_id": "does-not-exist"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let tokens = app.get("/api/v1/tokens", DEVICE).await;
    assert_eq!(
        tokens.body,
        json!({"tokens_remaining": 0, "free_trial_remaining": 3})
    );
}

#[tokio::test]
async fn test_exhausted_device_gets_402_before_lookup() {
    let app = common::create_test_app_with(Config {
        free_trial_count: 0,
        ..Config::test_default()
    });

    let response = app
        .post(
            "/api/v1/talk-starters",
            DEVICE,
            json!({"friend_id": "does-not-exist"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_paid_tokens_used_first() {
    let app = common::create_test_app();
    let id = app.create_friend(DEVICE, json!({"name": "Ada"})).await;
    app.state.ledger.credit(DEVICE, 2).await.unwrap();

    let response = app
        .post("/api/v1/talk-starters", DEVICE, json!({"friend_id": id}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let tokens = app.get("/api/v1/tokens", DEVICE).await;
    assert_eq!(
        tokens.body,
        json!({"tokens_remaining": 1, "free_trial_remaining": 3})
    );
}

#[tokio::test]
async fn test_generated_starters_use_context_and_language() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer llm-key")
                .body_contains("their family named Ada")
                .body_contains("Topics to follow up: garden")
                .body_contains("Respond in Japanese.");
            then.status(200).json_body(completion(
                "Here you go:\n[\"How is the garden?\", \"Any new plants?\"]",
            ));
        })
        .await;

    let app = common::create_test_app_with(llm_config(&server));
    let id = app
        .create_friend(DEVICE, json!({"name": "Ada", "relation_type": "family"}))
        .await;
    app.log_interaction(
        DEVICE,
        &id,
        json!({"summary": "Visited", "next_topics": ["garden"]}),
    )
    .await;

    let response = app
        .post(
            "/api/v1/talk-starters",
            DEVICE,
            json!({"friend_id": id, "language": "ja"}),
        )
        .await;

    mock.assert_async().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["starters"],
        json!(["How is the garden?", "Any new plants?"])
    );
    assert_eq!(
        response.body["context_used"],
        "- 2026-03-01: Visited\n  Topics to follow up: garden"
    );
}

#[tokio::test]
async fn test_generator_failure_still_returns_starters_and_charges() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(502).body("bad gateway");
        })
        .await;

    let app = common::create_test_app_with(llm_config(&server));
    let id = app.create_friend(DEVICE, json!({"name": "Ada"})).await;

    let response = app
        .post("/api/v1/talk-starters", DEVICE, json!({"friend_id": id}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["starters"],
        json!([
            "How have you been?",
            "What's been keeping you busy lately?",
            "I was thinking about our last conversation..."
        ])
    );

    let tokens = app.get("/api/v1/tokens", DEVICE).await;
    assert_eq!(tokens.body["free_trial_remaining"], 2);
}

#[tokio::test]
async fn test_long_context_is_truncated() {
    let app = common::create_test_app();
    let id = app.create_friend(DEVICE, json!({"name": "Ada"})).await;
    app.log_interaction(DEVICE, &id, json!({"summary": "x".repeat(300)}))
        .await;

    let response = app
        .post("/api/v1/talk-starters", DEVICE, json!({"friend_id": id}))
        .await;

    let context = response.body["context_used"].as_str().unwrap();
    assert_eq!(context.chars().count(), 203);
    assert!(context.starts_with("- 2026-03-01: xxx"));
    assert!(context.ends_with("..."));
}

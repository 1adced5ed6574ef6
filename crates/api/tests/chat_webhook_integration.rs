//! Integration tests for the chat provider webhook endpoint.

mod common;

use axum::http::StatusCode;
use common::{body_json, message_event, webhook_request, TestApp};
use uuid::Uuid;

#[tokio::test]
async fn test_message_notifies_everyone_but_sender() {
    let app = TestApp::new().await;
    let pair = app.matched_pair().await;
    app.push.clear();

    let body = message_event(&pair.channel.channel_cid, pair.sender_leader, "see you at 8");
    let signature = app.chat.sign(&body);
    let response = app.send(webhook_request(body, Some(&signature))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "notified");
    assert_eq!(json["recipients"], 3);

    assert!(app.push.sent_to(pair.sender_leader).is_empty());
    for user in [pair.sender_member, pair.receiver_leader, pair.receiver_member] {
        let pushes = app.push.sent_to(user);
        assert_eq!(pushes.len(), 1, "user {} should get one push", user);
        assert_eq!(pushes[0].body, "see you at 8");
    }
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let app = TestApp::new().await;

    let body = message_event("messaging:abc", Uuid::new_v4(), "hi");
    let response = app.send(webhook_request(body, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_bad_signature_is_forbidden() {
    let app = TestApp::new().await;
    let pair = app.matched_pair().await;
    app.push.clear();

    let body = message_event(&pair.channel.channel_cid, pair.sender_leader, "hi");
    let forged = shared::crypto::hmac_sha256_hex("wrong-secret", &body);
    let response = app.send(webhook_request(body, Some(&forged))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "forbidden");
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_other_event_types_are_ignored() {
    let app = TestApp::new().await;

    let body = serde_json::json!({
        "type": "channel.updated",
        "cid": "messaging:abc",
    })
    .to_string()
    .into_bytes();
    let signature = app.chat.sign(&body);
    let response = app.send(webhook_request(body, Some(&signature))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["outcome"], "ignored");
}

#[tokio::test]
async fn test_malformed_signed_body_is_bad_request() {
    let app = TestApp::new().await;

    let body = b"{not json".to_vec();
    let signature = app.chat.sign(&body);
    let response = app.send(webhook_request(body, Some(&signature))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_message_on_unknown_channel_notifies_nobody() {
    let app = TestApp::new().await;

    let body = message_event("messaging:unknown", Uuid::new_v4(), "hello?");
    let signature = app.chat.sign(&body);
    let response = app.send(webhook_request(body, Some(&signature))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["recipients"], 0);
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_exited_channel_no_longer_fans_out() {
    let app = TestApp::new().await;
    let pair = app.matched_pair().await;
    app.core
        .exit_chat_channel(&pair.channel.channel_cid, pair.receiver_member)
        .await
        .unwrap();
    app.push.clear();

    let body = message_event(&pair.channel.channel_cid, pair.sender_leader, "anyone?");
    let signature = app.chat.sign(&body);
    let response = app.send(webhook_request(body, Some(&signature))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["recipients"], 0);
}

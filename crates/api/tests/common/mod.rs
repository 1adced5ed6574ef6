//! Common test utilities for api integration tests.
//!
//! The router is built over the in-memory store and recording provider fakes,
//! so these tests need no database or network.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use fake::faker::lorem::en::Word;
use fake::Fake;
use tower::ServiceExt;
use uuid::Uuid;

use domain::models::chat::ChannelHandle;
use domain::models::group::{CreateGroupRequest, GroupProfile};
use domain::models::hotplace::{GeoPoint, NewHotplace};
use domain::models::user::RegisterUserRequest;
use domain::services::{DispatchMode, InMemoryStore, MockChatProvider, MockPushService};
use domain::MeetupCore;
use meetup_api::app::create_app;
use meetup_api::config::Config;

pub const WEBHOOK_SECRET: &str = "test-secret";

static PHONE_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn test_config() -> Config {
    Config::load_for_test(&[
        ("database.url", "postgres://unused"),
        ("chat.api_secret", WEBHOOK_SECRET),
    ])
    .expect("Failed to load test config")
}

pub struct TestApp {
    pub router: Router,
    pub core: MeetupCore<InMemoryStore>,
    pub chat: MockChatProvider,
    pub push: MockPushService,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_chat(MockChatProvider::new(WEBHOOK_SECRET)).await
    }

    pub async fn with_chat(chat: MockChatProvider) -> Self {
        let config = test_config();
        let push = MockPushService::new();
        let core = MeetupCore::new(
            InMemoryStore::new(),
            Arc::new(chat.clone()),
            Arc::new(push.clone()),
            config.core_settings(),
            config.product_catalog(),
            DispatchMode::Inline,
        );
        core.add_hotplace(NewHotplace {
            name: "Seongsu".to_string(),
            polygon: vec![
                GeoPoint::new(37.50, 127.02),
                GeoPoint::new(37.50, 127.06),
                GeoPoint::new(37.54, 127.06),
                GeoPoint::new(37.54, 127.02),
            ],
            center: GeoPoint::new(37.52, 127.04),
        })
        .await
        .expect("seed hotplace");

        Self {
            router: create_app(config, core.clone()),
            core,
            chat,
            push,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn user(&self) -> Uuid {
        let n = PHONE_SEQ.fetch_add(1, Ordering::SeqCst);
        self.core
            .register_user(RegisterUserRequest {
                phone_number: format!("+8210{:08}", n),
            })
            .await
            .expect("register user")
            .user
            .id
    }

    /// Two groups of two, matched into a channel.
    pub async fn matched_pair(&self) -> MatchedPair {
        let sender_leader = self.user().await;
        let receiver_leader = self.user().await;
        let sender = self.group(sender_leader).await;
        let receiver = self.group(receiver_leader).await;
        let sender_member = self.join(sender_leader).await;
        let receiver_member = self.join(receiver_leader).await;

        let request = self
            .core
            .submit_match_request(sender, receiver, sender_leader)
            .await
            .expect("submit");
        let channel = self
            .core
            .accept_match_request(request.id, receiver_leader)
            .await
            .expect("accept");

        MatchedPair {
            channel,
            sender_leader,
            sender_member,
            receiver_leader,
            receiver_member,
        }
    }

    async fn group(&self, leader: Uuid) -> Uuid {
        let start = Utc::now() + Duration::hours(2);
        let word: String = Word().fake();
        self.core
            .create_group(
                leader,
                CreateGroupRequest {
                    location: GeoPoint::new(37.52, 127.04),
                    profile: GroupProfile {
                        title: format!("{} crew", word),
                        introduction: None,
                        meetup_starts_at: start,
                        meetup_ends_at: start + Duration::hours(3),
                        match_cost: 3,
                    },
                },
            )
            .await
            .expect("create group")
            .id
    }

    async fn join(&self, leader: Uuid) -> Uuid {
        let member = self.user().await;
        let code = self
            .core
            .issue_invitation_code(leader)
            .await
            .expect("issue code");
        self.core
            .accept_group_invitation(&code.code, member)
            .await
            .expect("accept code");
        member
    }
}

pub struct MatchedPair {
    pub channel: ChannelHandle,
    pub sender_leader: Uuid,
    pub sender_member: Uuid,
    pub receiver_leader: Uuid,
    pub receiver_member: Uuid,
}

pub fn message_event(cid: &str, sender: Uuid, text: &str) -> Vec<u8> {
    serde_json::json!({
        "type": "message.new",
        "cid": cid,
        "user": { "id": sender.to_string() },
        "message": { "text": text },
    })
    .to_string()
    .into_bytes()
}

pub fn webhook_request(body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/chat")
        .header("Content-Type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("X-Signature", sig);
    }
    builder.body(Body::from(body)).expect("valid request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

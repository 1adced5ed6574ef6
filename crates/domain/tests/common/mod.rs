//! Shared helpers for match lifecycle integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use fake::faker::lorem::en::Word;
use fake::Fake;
use uuid::Uuid;

use domain::models::group::{CreateGroupRequest, Group, GroupProfile};
use domain::models::hotplace::{GeoPoint, Hotplace, NewHotplace};
use domain::models::point::LedgerEntryKind;
use domain::models::purchase::{ProductCatalog, ProductGrant};
use domain::models::user::RegisterUserRequest;
use domain::services::{ChatProvider, DispatchMode, InMemoryStore, MockChatProvider, MockPushService};
use domain::{CoreSettings, MeetupCore};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

static PHONE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A core wired to in-memory collaborators, with one hotplace seeded.
pub struct TestHarness {
    pub core: MeetupCore<InMemoryStore>,
    pub store: InMemoryStore,
    pub chat: MockChatProvider,
    pub push: MockPushService,
    pub hotplace: Hotplace,
}

pub fn test_catalog() -> ProductCatalog {
    ProductCatalog::default()
        .with_product(
            "points_5",
            ProductGrant::Points {
                points: 5,
                bonus_points: 0,
            },
        )
        .with_product(
            "points_30",
            ProductGrant::Points {
                points: 25,
                bonus_points: 5,
            },
        )
        .with_product("free_pass_24h", ProductGrant::FreePass { hours: 24 })
}

pub fn test_settings() -> CoreSettings {
    CoreSettings {
        initial_points: 10,
        ..CoreSettings::default()
    }
}

/// A square around Seongsu-dong.
pub fn seongsu() -> NewHotplace {
    NewHotplace {
        name: "Seongsu".to_string(),
        polygon: vec![
            GeoPoint::new(37.50, 127.02),
            GeoPoint::new(37.50, 127.06),
            GeoPoint::new(37.54, 127.06),
            GeoPoint::new(37.54, 127.02),
        ],
        center: GeoPoint::new(37.52, 127.04),
    }
}

pub fn inside_hotplace() -> GeoPoint {
    GeoPoint::new(37.52, 127.04)
}

pub fn outside_hotplace() -> GeoPoint {
    GeoPoint::new(35.10, 129.04)
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with(test_settings(), MockChatProvider::new(WEBHOOK_SECRET)).await
    }

    pub async fn with_settings(settings: CoreSettings) -> Self {
        Self::with(settings, MockChatProvider::new(WEBHOOK_SECRET)).await
    }

    pub async fn with_chat(chat: MockChatProvider) -> Self {
        Self::with(test_settings(), chat).await
    }

    pub async fn with(settings: CoreSettings, chat: MockChatProvider) -> Self {
        let provider: Arc<dyn ChatProvider> = Arc::new(chat.clone());
        Self::with_provider(settings, chat, provider).await
    }

    /// Wires `provider` into the core while keeping `chat` for inspection.
    pub async fn with_provider(
        settings: CoreSettings,
        chat: MockChatProvider,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let store = InMemoryStore::new();
        let push = MockPushService::new();
        let core = MeetupCore::new(
            store.clone(),
            provider,
            Arc::new(push.clone()),
            settings,
            test_catalog(),
            DispatchMode::Inline,
        );
        let hotplace = core
            .add_hotplace(seongsu())
            .await
            .expect("seed hotplace");

        Self {
            core,
            store,
            chat,
            push,
            hotplace,
        }
    }

    pub async fn user(&self) -> Uuid {
        let n = PHONE_SEQ.fetch_add(1, Ordering::SeqCst);
        let registered = self
            .core
            .register_user(RegisterUserRequest {
                phone_number: format!("+8210{:08}", n),
            })
            .await
            .expect("register user");
        registered.user.id
    }

    /// A registered user whose balance is exactly `balance`.
    pub async fn user_with_balance(&self, balance: i64) -> Uuid {
        let user = self.user().await;
        let current = self.core.point_balance(user).await.expect("balance");
        if balance > current {
            self.core
                .credit_points(user, balance - current, &format!("topup:{}", user))
                .await
                .expect("credit");
        } else if balance < current {
            self.core
                .debit_points(user, current - balance)
                .await
                .expect("debit");
        }
        user
    }

    pub async fn group_led_by(&self, leader: Uuid, match_cost: i64) -> Group {
        self.core
            .create_group(leader, group_request(inside_hotplace(), match_cost))
            .await
            .expect("create group")
    }

    /// Adds a fresh user to the group led by `leader`.
    pub async fn join(&self, leader: Uuid) -> Uuid {
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

    pub async fn balance(&self, user: Uuid) -> i64 {
        self.core.point_balance(user).await.expect("balance")
    }

    /// A signed `message.new` webhook body from `sender` in `cid`.
    pub fn message_webhook(&self, cid: &str, sender: Uuid, text: &str) -> (Vec<u8>, String) {
        let body = serde_json::json!({
            "type": "message.new",
            "cid": cid,
            "user": { "id": sender.to_string() },
            "message": { "text": text },
        })
        .to_string()
        .into_bytes();
        let signature = self.chat.sign(&body);
        (body, signature)
    }

    /// Checks the invariants that must hold after any sequence of operations.
    pub async fn assert_invariants(&self) {
        for user in self.store.users().await {
            assert!(user.point_balance >= 0, "negative balance for {}", user.id);

            let net: i64 = self
                .store
                .ledger_entries(user.id)
                .await
                .iter()
                .map(|e| match e.kind {
                    LedgerEntryKind::Credit => e.amount,
                    LedgerEntryKind::Debit => -e.amount,
                })
                .sum();
            assert_eq!(net, user.point_balance, "ledger drift for {}", user.id);
        }

        let mut active_members = BTreeSet::new();
        for m in self.store.memberships().await.iter().filter(|m| m.is_active) {
            assert!(
                active_members.insert(m.user_id),
                "user {} in two groups",
                m.user_id
            );
        }

        let mut open_pairs = BTreeSet::new();
        for r in self.store.match_requests().await.iter().filter(|r| r.is_open()) {
            let pair = domain::models::match_request::ordered_pair(
                r.sender_group_id,
                r.receiver_group_id,
            );
            assert!(open_pairs.insert(pair), "two open requests for {:?}", pair);
        }

        let mut groups_by_channel: HashMap<String, BTreeSet<Uuid>> = HashMap::new();
        for b in self.store.bindings().await.iter().filter(|b| b.is_active) {
            groups_by_channel
                .entry(b.channel_cid.clone())
                .or_default()
                .insert(b.group_id);
        }
        for (cid, groups) in groups_by_channel {
            assert_eq!(groups.len(), 2, "channel {} spans {:?}", cid, groups);
        }
    }
}

pub fn group_request(location: GeoPoint, match_cost: i64) -> CreateGroupRequest {
    let start = Utc::now() + Duration::hours(2);
    let word: String = Word().fake();
    CreateGroupRequest {
        location,
        profile: GroupProfile {
            title: format!("{} crew", word),
            introduction: Some("Friday drinks".to_string()),
            meetup_starts_at: start,
            meetup_ends_at: start + Duration::hours(3),
            match_cost,
        },
    }
}

//! Entry point for every inbound operation.
//!
//! Callers pass their user id explicitly; authorization is decided from the
//! arguments alone. Each call runs under the configured deadline. A deadline
//! that fires before commit drops the open transaction, which rolls it back.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{DomainError, DomainResult};
use crate::models::chat::ChannelHandle;
use crate::models::deletion::{DeletionRunSummary, DeletionSchedule};
use crate::models::group::{CreateGroupRequest, Group, GroupDetail, GroupMember, LeaveOutcome};
use crate::models::hotplace::{GeoPoint, Hotplace, NewHotplace};
use crate::models::invitation::InvitationCode;
use crate::models::match_request::{MatchRequest, MatchRequestList};
use crate::models::point::{CreditOutcome, PointReason, PointStatement};
use crate::models::purchase::{ProductCatalog, PurchaseOutcome, ValidatedPurchase};
use crate::models::user::{RegisterUserRequest, RegisteredUser, User};
use crate::services::chat::ChatProvider;
use crate::services::chat_broker::{ChatBroker, ReconcileReport, WebhookOutcome};
use crate::services::deletion::DeletionService;
use crate::services::groups::GroupRegistry;
use crate::services::hotplace_index;
use crate::services::identity::IdentityService;
use crate::services::ledger::LedgerService;
use crate::services::matching::MatchCoordinator;
use crate::services::notification::{DispatchMode, NotificationDispatcher, PushService};
use crate::services::purchases::PurchaseApplier;
use crate::settings::CoreSettings;
use crate::store::{MeetupStore, StoreTx};

#[derive(Clone)]
pub struct MeetupCore<S: MeetupStore> {
    store: S,
    settings: Arc<CoreSettings>,
    identity: IdentityService<S>,
    groups: GroupRegistry<S>,
    ledger: LedgerService<S>,
    matching: MatchCoordinator<S>,
    broker: ChatBroker<S>,
    deletion: DeletionService<S>,
    purchases: PurchaseApplier<S>,
}

impl<S: MeetupStore> MeetupCore<S> {
    pub fn new(
        store: S,
        chat: Arc<dyn ChatProvider>,
        push: Arc<dyn PushService>,
        settings: CoreSettings,
        catalog: ProductCatalog,
        dispatch_mode: DispatchMode,
    ) -> Self {
        let settings = Arc::new(settings);
        let notifier = NotificationDispatcher::new(push, dispatch_mode);
        let broker = ChatBroker::new(store.clone(), chat, notifier.clone(), settings.clone());

        Self {
            identity: IdentityService::new(store.clone(), settings.clone()),
            groups: GroupRegistry::new(store.clone(), settings.clone()),
            ledger: LedgerService::new(store.clone()),
            matching: MatchCoordinator::new(
                store.clone(),
                broker.clone(),
                notifier,
                settings.clone(),
            ),
            deletion: DeletionService::new(store.clone(), broker.clone(), settings.clone()),
            purchases: PurchaseApplier::new(store.clone(), Arc::new(catalog)),
            broker,
            settings,
            store,
        }
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn with_deadline<T>(&self, op: impl Future<Output = DomainResult<T>>) -> DomainResult<T> {
        tokio::time::timeout(self.settings.operation_timeout, op)
            .await
            .map_err(|_| DomainError::DeadlineExceeded)?
    }

    // Identity

    pub async fn register_user(&self, request: RegisterUserRequest) -> DomainResult<RegisteredUser> {
        self.with_deadline(self.identity.register_user(request)).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> DomainResult<User> {
        self.with_deadline(self.identity.get_user(user_id)).await
    }

    // Hotplaces

    pub async fn add_hotplace(&self, hotplace: NewHotplace) -> DomainResult<Hotplace> {
        hotplace.validate()?;
        self.with_deadline(async {
            let mut tx = self.store.begin().await?;
            let row = tx.insert_hotplace(&hotplace, Utc::now()).await?;
            tx.commit().await?;
            Ok(row)
        })
        .await
    }

    /// The hotplace containing `point`, if any.
    pub async fn locate_hotplace(&self, point: GeoPoint) -> DomainResult<Option<Hotplace>> {
        self.with_deadline(async {
            let mut tx = self.store.begin().await?;
            let hotplaces = tx.list_active_hotplaces().await?;
            Ok(hotplace_index::locate(&hotplaces, &point).cloned())
        })
        .await
    }

    /// The hotplace whose center is closest to `point`, with the distance in meters.
    pub async fn nearest_hotplace(&self, point: GeoPoint) -> DomainResult<Option<(Hotplace, f64)>> {
        self.with_deadline(async {
            let mut tx = self.store.begin().await?;
            let hotplaces = tx.list_active_hotplaces().await?;
            Ok(hotplace_index::nearest(&hotplaces, &point).map(|(h, d)| (h.clone(), d)))
        })
        .await
    }

    // Groups

    pub async fn create_group(&self, leader: Uuid, request: CreateGroupRequest) -> DomainResult<Group> {
        self.with_deadline(self.groups.create_group(leader, request)).await
    }

    pub async fn issue_invitation_code(&self, leader: Uuid) -> DomainResult<InvitationCode> {
        self.with_deadline(self.groups.issue_invitation(leader)).await
    }

    pub async fn accept_group_invitation(&self, code: &str, invitee: Uuid) -> DomainResult<GroupMember> {
        self.with_deadline(self.groups.accept_invitation(code, invitee)).await
    }

    pub async fn disband_group(&self, leader: Uuid) -> DomainResult<Uuid> {
        self.with_deadline(self.groups.disband_group(leader)).await
    }

    pub async fn leave_group(&self, user_id: Uuid) -> DomainResult<LeaveOutcome> {
        self.with_deadline(self.groups.leave_group(user_id)).await
    }

    pub async fn list_groups_in_hotplace(&self, caller: Uuid, hotplace_id: i64) -> DomainResult<Vec<Group>> {
        self.with_deadline(self.groups.list_groups_in_hotplace(caller, hotplace_id))
            .await
    }

    pub async fn get_group(&self, group_id: Uuid) -> DomainResult<GroupDetail> {
        self.with_deadline(self.groups.get_group(group_id)).await
    }

    pub async fn my_group(&self, user_id: Uuid) -> DomainResult<Option<GroupDetail>> {
        self.with_deadline(self.groups.my_group(user_id)).await
    }

    // Points

    pub async fn point_statement(&self, user_id: Uuid) -> DomainResult<PointStatement> {
        self.with_deadline(self.ledger.statement(user_id)).await
    }

    pub async fn point_balance(&self, user_id: Uuid) -> DomainResult<i64> {
        self.with_deadline(self.ledger.balance(user_id)).await
    }

    /// Manual credit, e.g. support compensation.
    pub async fn credit_points(
        &self,
        user_id: Uuid,
        amount: i64,
        idempotency_key: &str,
    ) -> DomainResult<CreditOutcome> {
        self.with_deadline(
            self.ledger
                .credit(user_id, amount, PointReason::Adjustment, idempotency_key),
        )
        .await
    }

    /// Manual debit, e.g. support correction.
    pub async fn debit_points(&self, user_id: Uuid, amount: i64) -> DomainResult<i64> {
        self.with_deadline(self.ledger.debit(user_id, amount, PointReason::Adjustment))
            .await
    }

    pub async fn grant_free_pass(&self, user_id: Uuid, duration: Duration) -> DomainResult<DateTime<Utc>> {
        self.with_deadline(self.ledger.grant_free_pass(user_id, duration))
            .await
    }

    pub async fn apply_validated_purchase(&self, purchase: ValidatedPurchase) -> DomainResult<PurchaseOutcome> {
        self.with_deadline(self.purchases.apply(&purchase)).await
    }

    // Match requests

    pub async fn submit_match_request(
        &self,
        sender_group_id: Uuid,
        receiver_group_id: Uuid,
        caller: Uuid,
    ) -> DomainResult<MatchRequest> {
        self.with_deadline(self.matching.submit(sender_group_id, receiver_group_id, caller))
            .await
    }

    pub async fn accept_match_request(&self, request_id: Uuid, caller: Uuid) -> DomainResult<ChannelHandle> {
        self.with_deadline(self.matching.accept(request_id, caller))
            .await
    }

    pub async fn reject_match_request(&self, request_id: Uuid, caller: Uuid) -> DomainResult<()> {
        self.with_deadline(self.matching.reject(request_id, caller))
            .await
    }

    pub async fn cancel_match_request(&self, request_id: Uuid, caller: Uuid) -> DomainResult<()> {
        self.with_deadline(self.matching.cancel(request_id, caller))
            .await
    }

    pub async fn list_match_requests(&self, caller: Uuid) -> DomainResult<MatchRequestList> {
        self.with_deadline(self.matching.list(caller)).await
    }

    // Chat

    pub async fn exit_chat_channel(&self, channel_cid: &str, caller: Uuid) -> DomainResult<()> {
        self.with_deadline(self.broker.exit_channel(channel_cid, caller))
            .await
    }

    /// Deletes every channel the user is bound to and returns their cids.
    pub async fn teardown_user_channels(&self, user_id: Uuid) -> DomainResult<Vec<String>> {
        self.with_deadline(self.broker.teardown_for_user(user_id))
            .await
    }

    pub async fn handle_chat_webhook(&self, body: &[u8], signature: &str) -> DomainResult<WebhookOutcome> {
        self.with_deadline(self.broker.handle_webhook(body, signature))
            .await
    }

    pub async fn reconcile_chat_channels(&self, now: DateTime<Utc>) -> DomainResult<ReconcileReport> {
        self.broker.reconcile_orphans(now).await
    }

    // Deletion

    pub async fn schedule_user_deletion(
        &self,
        caller: Uuid,
        reason: Option<String>,
    ) -> DomainResult<DeletionSchedule> {
        self.with_deadline(self.deletion.schedule(caller, reason))
            .await
    }

    pub async fn cancel_user_deletion(&self, caller: Uuid) -> DomainResult<DeletionSchedule> {
        self.with_deadline(self.deletion.cancel(caller)).await
    }

    /// Background pass; runs without the per-operation deadline.
    pub async fn run_due_deletions(&self, now: DateTime<Utc>) -> DomainResult<DeletionRunSummary> {
        self.deletion.run_due(now).await
    }
}

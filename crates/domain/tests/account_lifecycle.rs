//! Integration tests for identities, groups, points, purchases and
//! scheduled deletion.

mod common;

use chrono::{Duration, Utc};

use common::{inside_hotplace, outside_hotplace, TestHarness, WEBHOOK_SECRET};
use domain::models::group::LeaveOutcome;
use domain::models::hotplace::GeoPoint;
use domain::models::point::{CreditOutcome, PointReason};
use domain::models::purchase::{Platform, ProductGrant, PurchaseOutcome, ValidatedPurchase};
use domain::models::user::RegisterUserRequest;
use domain::services::MockChatProvider;
use domain::{CoreSettings, DomainError, ErrorKind};

fn purchase(user_id: uuid::Uuid, transaction_id: &str, product_id: &str) -> ValidatedPurchase {
    ValidatedPurchase {
        transaction_id: transaction_id.to_string(),
        product_id: product_id.to_string(),
        platform: Platform::Apple,
        user_id,
    }
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_register_same_phone_returns_existing_user() {
    let h = TestHarness::new().await;
    let request = RegisterUserRequest {
        phone_number: "+821099990000".to_string(),
    };

    let first = h.core.register_user(request.clone()).await.unwrap();
    let second = h.core.register_user(request).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.user.id, second.user.id);
    assert_eq!(h.balance(first.user.id).await, 10);
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_register_rejects_malformed_phone() {
    let h = TestHarness::new().await;
    let err = h
        .core
        .register_user(RegisterUserRequest {
            phone_number: "010-1234-5678".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

// ============================================================================
// Hotplaces
// ============================================================================

#[tokio::test]
async fn test_locate_and_nearest_hotplace() {
    let h = TestHarness::new().await;

    let found = h.core.locate_hotplace(inside_hotplace()).await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(h.hotplace.id));

    // Vertices count as inside.
    let corner = h
        .core
        .locate_hotplace(GeoPoint::new(37.50, 127.02))
        .await
        .unwrap();
    assert!(corner.is_some());

    assert!(h
        .core
        .locate_hotplace(outside_hotplace())
        .await
        .unwrap()
        .is_none());

    let (nearest, meters) = h
        .core
        .nearest_hotplace(outside_hotplace())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(nearest.id, h.hotplace.id);
    assert!(meters > 100_000.0);
}

// ============================================================================
// Groups
// ============================================================================

#[tokio::test]
async fn test_group_must_be_inside_a_hotplace() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let err = h
        .core
        .create_group(a, common::group_request(outside_hotplace(), 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotInAnyHotplace));
    assert!(h.core.my_group(a).await.unwrap().is_none());
}

#[tokio::test]
async fn test_user_can_lead_only_one_group() {
    let h = TestHarness::new().await;
    let a = h.user().await;
    let group = h.group_led_by(a, 3).await;
    assert_eq!(group.hotplace_id, h.hotplace.id);

    let err = h
        .core
        .create_group(a, common::group_request(inside_hotplace(), 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyInGroup(_)));
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[tokio::test]
async fn test_invitation_code_is_single_use() {
    let h = TestHarness::new().await;
    let leader = h.user().await;
    let group = h.group_led_by(leader, 3).await;
    let code = h.core.issue_invitation_code(leader).await.unwrap();

    let first = h.user().await;
    let member = h
        .core
        .accept_group_invitation(&code.code.to_lowercase(), first)
        .await
        .unwrap();
    assert_eq!(member.group_id, group.id);
    assert!(!member.is_leader);

    let second = h.user().await;
    let err = h
        .core
        .accept_group_invitation(&code.code, second)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CodeExpiredOrUsed));

    let detail = h.core.get_group(group.id).await.unwrap();
    assert_eq!(detail.members.len(), 2);
    assert_eq!(detail.leader().map(|m| m.user_id), Some(leader));
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_reissuing_code_retires_previous_one() {
    let h = TestHarness::new().await;
    let leader = h.user().await;
    h.group_led_by(leader, 3).await;

    let old = h.core.issue_invitation_code(leader).await.unwrap();
    let new = h.core.issue_invitation_code(leader).await.unwrap();
    assert_ne!(old.code, new.code);

    let invitee = h.user().await;
    let err = h
        .core
        .accept_group_invitation(&old.code, invitee)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::CodeExpiredOrUsed));
    h.core
        .accept_group_invitation(&new.code, invitee)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invitation_rules() {
    let h = TestHarness::with_settings(CoreSettings {
        max_group_members: 2,
        ..common::test_settings()
    })
    .await;
    let leader = h.user().await;
    h.group_led_by(leader, 3).await;
    let member = h.join(leader).await;

    let err = h.core.issue_invitation_code(member).await.unwrap_err();
    assert!(matches!(err, DomainError::NotLeader(_)));
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);

    let err = h
        .core
        .accept_group_invitation("not-a-code", h.user().await)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let other_leader = h.user().await;
    h.group_led_by(other_leader, 3).await;
    let code = h.core.issue_invitation_code(leader).await.unwrap();
    let err = h
        .core
        .accept_group_invitation(&code.code, other_leader)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyInGroup(_)));

    let err = h
        .core
        .accept_group_invitation(&code.code, h.user().await)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::GroupFull(_)));
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_leave_group() {
    let h = TestHarness::new().await;
    let leader = h.user().await;
    let group = h.group_led_by(leader, 3).await;
    let member = h.join(leader).await;
    let other = h.join(leader).await;

    assert_eq!(h.core.leave_group(member).await.unwrap(), LeaveOutcome::Left);
    assert!(h.core.my_group(member).await.unwrap().is_none());
    assert!(h.core.get_group(group.id).await.unwrap().group.is_active);

    assert_eq!(
        h.core.leave_group(leader).await.unwrap(),
        LeaveOutcome::GroupClosed
    );
    let detail = h.core.get_group(group.id).await.unwrap();
    assert!(!detail.group.is_active);
    assert!(detail.members.is_empty());
    assert!(h.core.my_group(other).await.unwrap().is_none());

    let err = h.core.leave_group(member).await.unwrap_err();
    assert!(matches!(err, DomainError::NotInGroup(_)));
}

#[tokio::test]
async fn test_disband_deactivates_open_requests() {
    let h = TestHarness::new().await;
    let a = h.user().await;
    let b = h.user().await;
    let ga = h.group_led_by(a, 0).await;
    let gb = h.group_led_by(b, 3).await;
    let request = h.core.submit_match_request(ga.id, gb.id, a).await.unwrap();

    let member = h.join(b).await;
    let err = h.core.disband_group(member).await.unwrap_err();
    assert!(matches!(err, DomainError::NotLeader(_)));

    assert_eq!(h.core.disband_group(b).await.unwrap(), gb.id);

    let stored = h.store.match_requests().await;
    assert!(stored.iter().all(|r| !r.is_active));
    let err = h.core.cancel_match_request(request.id, a).await.unwrap_err();
    assert!(matches!(err, DomainError::RequestInactive(_)));
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_list_groups_excludes_callers_own() {
    let h = TestHarness::new().await;
    let a = h.user().await;
    let b = h.user().await;
    let c = h.user().await;
    let ga = h.group_led_by(a, 3).await;
    let gb = h.group_led_by(b, 3).await;
    let gc = h.group_led_by(c, 3).await;
    h.core.disband_group(c).await.unwrap();

    let listed = h
        .core
        .list_groups_in_hotplace(a, h.hotplace.id)
        .await
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![gb.id]);
    assert!(!ids.contains(&ga.id));
    assert!(!ids.contains(&gc.id));

    let err = h
        .core
        .list_groups_in_hotplace(a, 9_999)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Points
// ============================================================================

#[tokio::test]
async fn test_credit_is_idempotent_per_key() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let first = h.core.credit_points(a, 5, "support:1").await.unwrap();
    let again = h.core.credit_points(a, 5, "support:1").await.unwrap();

    assert_eq!(first, CreditOutcome::Applied { balance: 15 });
    assert_eq!(again, CreditOutcome::AlreadyApplied { balance: 15 });
    assert_eq!(h.balance(a).await, 15);
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_debit_cannot_overdraw() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let err = h.core.debit_points(a, 11).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientBalance {
            required: 11,
            available: 10
        }
    ));
    assert_eq!(h.core.debit_points(a, 10).await.unwrap(), 0);
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_debit_then_credit_restores_balance() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    h.core.debit_points(a, 4).await.unwrap();
    h.core.credit_points(a, 4, "refund:1").await.unwrap();

    let statement = h.core.point_statement(a).await.unwrap();
    assert_eq!(statement.balance, 10);
    assert_eq!(statement.history.len(), 3);
    assert_eq!(statement.net_history(), statement.balance);
}

#[tokio::test]
async fn test_statement_lists_match_debits() {
    let h = TestHarness::new().await;
    let a = h.user().await;
    let b = h.user().await;
    let ga = h.group_led_by(a, 0).await;
    let gb = h.group_led_by(b, 3).await;
    h.core.submit_match_request(ga.id, gb.id, a).await.unwrap();

    let statement = h.core.point_statement(a).await.unwrap();
    assert_eq!(statement.balance, 7);
    assert!(statement
        .history
        .iter()
        .any(|e| e.reason == PointReason::MatchRequest && e.amount == 3));
    assert_eq!(statement.net_history(), 7);
}

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_applies_once() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let first = h
        .core
        .apply_validated_purchase(purchase(a, "txn-1", "points_5"))
        .await
        .unwrap();
    let again = h
        .core
        .apply_validated_purchase(purchase(a, "txn-1", "points_5"))
        .await
        .unwrap();

    assert!(matches!(
        first,
        PurchaseOutcome::Applied {
            grant: ProductGrant::Points { points: 5, .. }
        }
    ));
    assert_eq!(again, PurchaseOutcome::AlreadyApplied);
    assert_eq!(h.balance(a).await, 15);
    assert_eq!(h.store.purchases().await.len(), 1);

    let purchase_entries = h
        .store
        .ledger_entries(a)
        .await
        .into_iter()
        .filter(|e| e.reason == PointReason::Purchase)
        .count();
    assert_eq!(purchase_entries, 1);
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_purchase_bonus_points_and_free_pass() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    h.core
        .apply_validated_purchase(purchase(a, "txn-30", "points_30"))
        .await
        .unwrap();
    assert_eq!(h.balance(a).await, 40);

    h.core
        .apply_validated_purchase(purchase(a, "txn-pass", "free_pass_24h"))
        .await
        .unwrap();
    let user = h.core.get_user(a).await.unwrap();
    assert!(user.has_active_free_pass(Utc::now() + Duration::hours(23)));
    assert!(!user.has_active_free_pass(Utc::now() + Duration::hours(25)));
    assert_eq!(h.balance(a).await, 40);
}

#[tokio::test]
async fn test_unknown_product_is_rejected() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let err = h
        .core
        .apply_validated_purchase(purchase(a, "txn-x", "diamonds"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UnknownProduct(ref p) if p == "diamonds"));
    assert!(h.store.purchases().await.is_empty());
}

// ============================================================================
// Scheduled deletion
// ============================================================================

#[tokio::test]
async fn test_scheduled_deletion_tears_everything_down() {
    let h = TestHarness::new().await;
    let a = h.user_with_balance(10).await;
    let b = h.user().await;
    let c = h.user().await;
    let ga = h.group_led_by(a, 0).await;
    let gb = h.group_led_by(b, 3).await;
    let gc = h.group_led_by(c, 3).await;

    let to_b = h.core.submit_match_request(ga.id, gb.id, a).await.unwrap();
    let handle = h.core.accept_match_request(to_b.id, b).await.unwrap();
    h.core.submit_match_request(ga.id, gc.id, a).await.unwrap();

    let schedule = h.core.schedule_user_deletion(a, None).await.unwrap();
    assert!(schedule.scheduled_at > Utc::now() + Duration::hours(71));

    let early = h.core.run_due_deletions(Utc::now()).await.unwrap();
    assert!(early.completed.is_empty());

    let due = schedule.scheduled_at + Duration::seconds(1);
    let summary = h.core.run_due_deletions(due).await.unwrap();
    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.failed, 0);
    let report = &summary.completed[0];
    assert_eq!(report.disbanded_group_id, Some(ga.id));
    assert_eq!(report.deactivated_requests, 2);
    assert_eq!(report.channel_cids, vec![handle.channel_cid.clone()]);

    assert_eq!(h.chat.deleted(), vec![handle.channel_cid.clone()]);
    assert!(h.core.get_user(a).await.unwrap().is_deleted);
    assert!(!h.core.get_group(ga.id).await.unwrap().group.is_active);
    assert!(h
        .store
        .match_requests()
        .await
        .iter()
        .filter(|r| r.involves(ga.id))
        .all(|r| !r.is_active));
    assert!(h.store.bindings().await.iter().all(|b| !b.is_active));

    // A second pass finds nothing left to do.
    let rerun = h.core.run_due_deletions(due).await.unwrap();
    assert!(rerun.completed.is_empty());
    assert_eq!(h.chat.deleted().len(), 1);

    let err = h.core.credit_points(a, 1, "late").await.unwrap_err();
    assert!(matches!(err, DomainError::UserDeleted(_)));
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_deleting_a_member_keeps_the_group() {
    let h = TestHarness::new().await;
    let leader = h.user().await;
    let group = h.group_led_by(leader, 3).await;
    let member = h.join(leader).await;

    let schedule = h.core.schedule_user_deletion(member, None).await.unwrap();
    let summary = h
        .core
        .run_due_deletions(schedule.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.completed[0].disbanded_group_id, None);
    let detail = h.core.get_group(group.id).await.unwrap();
    assert!(detail.group.is_active);
    assert_eq!(detail.members.len(), 1);
    h.assert_invariants().await;
}

#[tokio::test]
async fn test_deletion_schedule_and_cancel() {
    let h = TestHarness::new().await;
    let a = h.user().await;

    let err = h.core.cancel_user_deletion(a).await.unwrap_err();
    assert!(matches!(err, DomainError::NoPendingDeletion(_)));

    let schedule = h
        .core
        .schedule_user_deletion(a, Some("moving away".to_string()))
        .await
        .unwrap();
    let err = h.core.schedule_user_deletion(a, None).await.unwrap_err();
    assert!(matches!(err, DomainError::DeletionAlreadyScheduled(_)));

    h.core.cancel_user_deletion(a).await.unwrap();
    let summary = h
        .core
        .run_due_deletions(schedule.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();
    assert!(summary.completed.is_empty());
    assert!(!h.core.get_user(a).await.unwrap().is_deleted);
}

#[tokio::test]
async fn test_failed_channel_teardown_is_recorded_as_orphan() {
    let h = TestHarness::with_chat(MockChatProvider::new(WEBHOOK_SECRET).failing_delete()).await;
    let a = h.user().await;
    let b = h.user().await;
    let ga = h.group_led_by(a, 0).await;
    let gb = h.group_led_by(b, 3).await;
    let request = h.core.submit_match_request(ga.id, gb.id, a).await.unwrap();
    let handle = h.core.accept_match_request(request.id, b).await.unwrap();

    let schedule = h.core.schedule_user_deletion(a, None).await.unwrap();
    let summary = h
        .core
        .run_due_deletions(schedule.scheduled_at + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(summary.completed.len(), 1);

    let orphans = h.store.orphans().await;
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].channel_cid, handle.channel_cid);
    assert!(orphans[0].resolved_at.is_none());

    let report = h.core.reconcile_chat_channels(Utc::now()).await.unwrap();
    assert_eq!(report.recorded_resolved, 0);
    assert!(report.failed >= 1);
    assert!(h.store.orphans().await[0].resolved_at.is_none());
}

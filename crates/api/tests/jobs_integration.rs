//! Integration tests for the background jobs over the in-memory store.

mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use domain::models::chat::ChannelSummary;
use domain::services::MockChatProvider;
use meetup_api::jobs::{Job, JobFrequency, OrphanChannelsJob, ScheduledDeletionJob};

#[tokio::test]
async fn test_deletion_job_waits_for_grace_period() {
    let app = TestApp::new().await;
    let user = app.user().await;
    app.core
        .schedule_user_deletion(user, Some("moving away".to_string()))
        .await
        .unwrap();

    let job = ScheduledDeletionJob::new(app.core.clone(), 60);
    assert_eq!(job.name(), "scheduled_deletion");
    assert_eq!(job.frequency(), JobFrequency::Minutes(60));

    let early = job.run_at(Utc::now()).await.unwrap();
    assert!(early.completed.is_empty());

    let due = job.run_at(Utc::now() + Duration::hours(73)).await.unwrap();
    assert_eq!(due.completed.len(), 1);
    assert_eq!(due.completed[0].user_id, user);
    assert!(app.core.get_user(user).await.unwrap().is_deleted);

    let rerun = job.run_at(Utc::now() + Duration::hours(74)).await.unwrap();
    assert!(rerun.completed.is_empty());
}

#[tokio::test]
async fn test_deletion_job_tears_down_matched_channel() {
    let app = TestApp::new().await;
    let pair = app.matched_pair().await;
    app.core
        .schedule_user_deletion(pair.receiver_leader, None)
        .await
        .unwrap();

    let job = ScheduledDeletionJob::new(app.core.clone(), 60);
    let summary = job.run_at(Utc::now() + Duration::hours(73)).await.unwrap();

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(
        summary.completed[0].channel_cids,
        vec![pair.channel.channel_cid.clone()]
    );
    assert!(app.chat.deleted().contains(&pair.channel.channel_cid));
}

#[tokio::test]
async fn test_orphan_job_sweeps_stale_unbound_channels() {
    let app = TestApp::new().await;
    let pair = app.matched_pair().await;
    app.chat.seed_channel(ChannelSummary {
        channel_id: "stray".to_string(),
        channel_cid: "messaging:stray".to_string(),
        channel_type: "messaging".to_string(),
        created_at: Some(Utc::now() - Duration::hours(2)),
    });

    let job = OrphanChannelsJob::new(app.core.clone(), 15);
    let report = job.run_at(Utc::now() + Duration::hours(1)).await.unwrap();

    assert_eq!(report.stale_deleted, 1);
    assert_eq!(report.failed, 0);
    assert!(app.chat.deleted().contains(&"messaging:stray".to_string()));
    assert!(!app.chat.deleted().contains(&pair.channel.channel_cid));
}

#[tokio::test]
async fn test_orphan_job_execute_tolerates_provider_failure() {
    let chat = MockChatProvider::new(common::WEBHOOK_SECRET).failing_delete();
    let app = TestApp::with_chat(chat).await;
    app.chat.seed_channel(ChannelSummary {
        channel_id: "stray".to_string(),
        channel_cid: "messaging:stray".to_string(),
        channel_type: "messaging".to_string(),
        created_at: Some(Utc::now() - Duration::hours(2)),
    });

    let job = OrphanChannelsJob::new(app.core.clone(), 15);
    let report = job.run_at(Utc::now()).await.unwrap();
    assert!(report.failed >= 1);
    assert!(job.execute().await.is_ok());
}

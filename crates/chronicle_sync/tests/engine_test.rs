//! Integration tests for the synchronization engine.
//!
//! Run with: `cargo test --test engine_test -- --ignored` against a
//! disposable PostgreSQL database.


use chronicle_error::{GatewayError, GatewayErrorKind};
use chronicle_sync::{
    ChannelRecord, GuildRecord, MessageKind, TrackingStatus, add_channel, add_guild, add_member,
    apply_permission_transition, bulk_delete_messages, channel_status, delete_message,
    guild_status, insert_message, regenerate, remove_guild, remove_member, update_message,
};
use engine_test_helpers::*;
use std::collections::HashSet;

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn duplicate_message_insert_stores_one_row() {
    let ctx = test_context();
    const GUILD: i64 = 910_001;
    const CHANNEL: i64 = 910_101;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);
    track_channel(&ctx, CHANNEL, GUILD, false);

    let msg = sample_message(910_201, GUILD, CHANNEL);
    assert!(insert_message(&ctx, &msg).await.unwrap());
    assert!(!insert_message(&ctx, &msg).await.unwrap());
    assert_eq!(count_messages(&ctx, CHANNEL), 1);

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn deleting_missing_message_is_a_noop() {
    let ctx = test_context();
    assert!(!delete_message(&ctx, 920_001).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn add_guild_imports_members_and_readable_channels() {
    let ctx = test_context();
    const GUILD: i64 = 930_001;
    const READABLE: i64 = 930_101;
    const RESTRICTED: i64 = 930_102;
    reset_guild(&ctx, GUILD);

    let history = (0..5)
        .map(|i| Ok(sample_message(930_500 + i, GUILD, READABLE)))
        .chain(std::iter::once(Ok(sample_message_of_kind(
            930_590,
            GUILD,
            READABLE,
            MessageKind::Other,
        ))))
        .collect();
    let gateway = MockGateway::empty()
        .with_member(GUILD, 930_301)
        .with_member(GUILD, 930_302)
        .with_channel(ChannelRecord::new(READABLE, GUILD), true)
        .with_channel(ChannelRecord::new(RESTRICTED, GUILD), false)
        .with_history(READABLE, history);

    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::NotTracked
    );

    let guild = GuildRecord::new(GUILD);
    let stats = add_guild(&ctx, &guild, &gateway)
        .await
        .unwrap()
        .expect("guild should import");
    assert_eq!(*stats.members(), 2);
    assert_eq!(*stats.channels(), 1);
    assert_eq!(*stats.skipped_channels(), 1);
    assert_eq!(*stats.messages(), 5);

    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::Available
    );
    assert_eq!(
        channel_status(&ctx, READABLE).await.unwrap(),
        TrackingStatus::Available
    );
    assert_eq!(
        channel_status(&ctx, RESTRICTED).await.unwrap(),
        TrackingStatus::NotTracked
    );
    assert!(membership_exists(&ctx, GUILD, 930_301));
    assert!(membership_exists(&ctx, GUILD, 930_302));
    assert_eq!(count_messages(&ctx, READABLE), 5);

    // Re-adding a tracked guild is rejected without touching the store.
    assert!(add_guild(&ctx, &guild, &gateway).await.unwrap().is_none());
    assert_eq!(count_messages(&ctx, READABLE), 5);

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn bulk_delete_skips_unknown_ids() {
    let ctx = test_context();
    const GUILD: i64 = 940_001;
    const CHANNEL: i64 = 940_101;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);
    track_channel(&ctx, CHANNEL, GUILD, false);

    let kept = sample_message(940_201, GUILD, CHANNEL);
    let doomed = sample_message(940_202, GUILD, CHANNEL);
    insert_message(&ctx, &kept).await.unwrap();
    insert_message(&ctx, &doomed).await.unwrap();

    let ids: HashSet<i64> = [940_202, 940_999].into_iter().collect();
    let deleted = bulk_delete_messages(&ctx, &ids).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(message_row(&ctx, 940_201).is_some());
    assert!(message_row(&ctx, 940_202).is_none());

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn channel_backfill_batches_large_history() {
    let ctx = test_context();
    const GUILD: i64 = 950_001;
    const CHANNEL: i64 = 950_101;
    const BASE: i64 = 1_950_000_000;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);

    // 10,500 eligible messages with a few system notices sprinkled in.
    let mut history = Vec::with_capacity(10_507);
    for i in 0..10_500 {
        history.push(Ok(sample_message(BASE + i, GUILD, CHANNEL)));
        if i % 1_500 == 0 && i < 10_500 {
            history.push(Ok(sample_message_of_kind(
                BASE + 20_000 + i,
                GUILD,
                CHANNEL,
                MessageKind::Other,
            )));
        }
    }

    let gateway = MockGateway::empty().with_history(CHANNEL, history);
    let channel = ChannelRecord::new(CHANNEL, GUILD);
    let stats = add_channel(&ctx, &channel, &gateway)
        .await
        .unwrap()
        .expect("channel should import");

    assert_eq!(*stats.inserted(), 10_500);
    assert_eq!(*stats.skipped(), 7);
    // Ten full batches plus one 500-row remainder flush.
    assert_eq!(*stats.batches(), 11);
    assert_eq!(count_messages(&ctx, CHANNEL), 10_500);
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::Available
    );

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn add_channel_requires_tracked_guild() {
    let ctx = test_context();
    const GUILD: i64 = 960_001;
    const CHANNEL: i64 = 960_101;
    reset_guild(&ctx, GUILD);

    let gateway = MockGateway::empty();
    let channel = ChannelRecord::new(CHANNEL, GUILD);
    let outcome = add_channel(&ctx, &channel, &gateway).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::NotTracked
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn edit_updates_content_and_timestamp_only() {
    let ctx = test_context();
    const GUILD: i64 = 970_001;
    const CHANNEL: i64 = 970_101;
    const MESSAGE: i64 = 970_201;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);
    track_channel(&ctx, CHANNEL, GUILD, false);

    let msg = sample_message(MESSAGE, GUILD, CHANNEL);
    insert_message(&ctx, &msg).await.unwrap();

    let edited_at = sample_timestamp() + chrono::Duration::hours(2);
    assert!(
        update_message(&ctx, MESSAGE, "edited body", Some(edited_at))
            .await
            .unwrap()
    );

    let row = message_row(&ctx, MESSAGE).expect("message row");
    assert_eq!(row.content, "edited body");
    assert_eq!(row.edited_at, Some(edited_at));
    assert_eq!(row.created_at, msg.created_at);
    assert_eq!(row.attachments, msg.attachments);

    // Edits never create rows.
    assert!(!update_message(&ctx, 970_999, "ghost", None).await.unwrap());
    assert!(message_row(&ctx, 970_999).is_none());

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn membership_writes_are_idempotent() {
    let ctx = test_context();
    const GUILD: i64 = 980_001;
    const USER: i64 = 980_301;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);

    let member = chronicle_sync::MemberRecord::new(GUILD, USER);
    assert!(add_member(&ctx, &member).await.unwrap());
    // Second join event lands as an idempotent no-op.
    assert!(add_member(&ctx, &member).await.unwrap());
    assert!(membership_exists(&ctx, GUILD, USER));

    assert!(remove_member(&ctx, &member).await.unwrap());
    assert!(!membership_exists(&ctx, GUILD, USER));
    // The global user row survives departure.
    assert!(user_exists(&ctx, USER));
    // Removing again is silently accepted.
    assert!(remove_member(&ctx, &member).await.unwrap());

    // Membership events for untracked guilds are dropped.
    let stranger = chronicle_sync::MemberRecord::new(980_900, USER);
    assert!(!add_member(&ctx, &stranger).await.unwrap());
    assert!(!remove_member(&ctx, &stranger).await.unwrap());

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn remove_guild_purges_dependent_rows() {
    let ctx = test_context();
    const GUILD: i64 = 990_001;
    const CHANNEL: i64 = 990_101;
    const USER: i64 = 990_301;
    reset_guild(&ctx, GUILD);

    let gateway = MockGateway::empty()
        .with_member(GUILD, USER)
        .with_channel(ChannelRecord::new(CHANNEL, GUILD), true)
        .with_history(
            CHANNEL,
            vec![Ok(sample_message(990_201, GUILD, CHANNEL))],
        );
    add_guild(&ctx, &GuildRecord::new(GUILD), &gateway)
        .await
        .unwrap()
        .expect("guild should import");

    assert!(remove_guild(&ctx, GUILD).await.unwrap());
    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::NotTracked
    );
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::NotTracked
    );
    assert!(!membership_exists(&ctx, GUILD, USER));
    assert_eq!(count_messages(&ctx, CHANNEL), 0);
    // User identity is global and survives guild teardown.
    assert!(user_exists(&ctx, USER));

    assert!(!remove_guild(&ctx, GUILD).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn regenerate_rebuilds_tracked_guilds_only() {
    let ctx = test_context();
    const GUILD: i64 = 11_000_001;
    const UNTRACKED: i64 = 11_000_002;
    const CHANNEL: i64 = 11_000_101;
    reset_guild(&ctx, GUILD);
    reset_guild(&ctx, UNTRACKED);

    let first = MockGateway::empty()
        .with_member(GUILD, 11_000_301)
        .with_channel(ChannelRecord::new(CHANNEL, GUILD), true)
        .with_history(
            CHANNEL,
            (0..3)
                .map(|i| Ok(sample_message(11_000_500 + i, GUILD, CHANNEL)))
                .collect(),
        );
    add_guild(&ctx, &GuildRecord::new(GUILD), &first)
        .await
        .unwrap()
        .expect("guild should import");

    // Simulate a crash that left the guild wedged mid-import.
    {
        let mut conn = chronicle_database::checkout(ctx.pool()).unwrap();
        chronicle_database::set_guild_importing(&mut conn, GUILD, true).unwrap();
    }
    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::Importing
    );

    let second = MockGateway::empty()
        .with_member(GUILD, 11_000_301)
        .with_member(GUILD, 11_000_302)
        .with_channel(ChannelRecord::new(CHANNEL, GUILD), true)
        .with_history(
            CHANNEL,
            (0..5)
                .map(|i| Ok(sample_message(11_000_600 + i, GUILD, CHANNEL)))
                .collect(),
        );
    let guilds = [GuildRecord::new(GUILD), GuildRecord::new(UNTRACKED)];
    let rebuilt = regenerate(&ctx, &guilds, &second).await.unwrap();
    assert_eq!(rebuilt, 1);

    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::Available
    );
    assert_eq!(
        guild_status(&ctx, UNTRACKED).await.unwrap(),
        TrackingStatus::NotTracked
    );
    assert!(membership_exists(&ctx, GUILD, 11_000_302));
    assert_eq!(count_messages(&ctx, CHANNEL), 5);
    assert!(message_row(&ctx, 11_000_500).is_none());

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn ineligible_and_orphan_messages_are_dropped() {
    let ctx = test_context();
    const GUILD: i64 = 12_000_001;
    const CHANNEL: i64 = 12_000_101;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);
    track_channel(&ctx, CHANNEL, GUILD, false);

    let notice = sample_message_of_kind(12_000_201, GUILD, CHANNEL, MessageKind::Other);
    assert!(!insert_message(&ctx, &notice).await.unwrap());
    assert!(message_row(&ctx, 12_000_201).is_none());

    let orphan_channel = sample_message(12_000_202, GUILD, 12_000_999);
    assert!(!insert_message(&ctx, &orphan_channel).await.unwrap());

    let orphan_guild = sample_message(12_000_203, 12_000_998, CHANNEL);
    assert!(!insert_message(&ctx, &orphan_guild).await.unwrap());

    assert_eq!(count_messages(&ctx, CHANNEL), 0);

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn permission_transitions_drive_channel_tracking() {
    let ctx = test_context();
    const GUILD: i64 = 13_000_001;
    const CHANNEL: i64 = 13_000_101;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);

    let gateway = MockGateway::empty().with_history(
        CHANNEL,
        (0..2)
            .map(|i| Ok(sample_message(13_000_500 + i, GUILD, CHANNEL)))
            .collect(),
    );
    let channel = ChannelRecord::new(CHANNEL, GUILD);

    // Unchanged capability is a no-op.
    apply_permission_transition(&ctx, &channel, &gateway, true, true)
        .await
        .unwrap();
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::NotTracked
    );

    apply_permission_transition(&ctx, &channel, &gateway, false, true)
        .await
        .unwrap();
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::Available
    );
    assert_eq!(count_messages(&ctx, CHANNEL), 2);

    apply_permission_transition(&ctx, &channel, &gateway, true, false)
        .await
        .unwrap();
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::NotTracked
    );

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn gateway_failure_rolls_back_channel_import() {
    let ctx = test_context();
    const GUILD: i64 = 14_000_001;
    const CHANNEL: i64 = 14_000_101;
    reset_guild(&ctx, GUILD);
    track_guild(&ctx, GUILD, false);

    let history = vec![
        Ok(sample_message(14_000_500, GUILD, CHANNEL)),
        Ok(sample_message(14_000_501, GUILD, CHANNEL)),
        Err(GatewayError::new(GatewayErrorKind::Transport(
            "history fetch interrupted".to_string(),
        ))),
    ];
    let gateway = MockGateway::empty().with_history(CHANNEL, history);
    let channel = ChannelRecord::new(CHANNEL, GUILD);

    assert!(add_channel(&ctx, &channel, &gateway).await.is_err());
    // The whole transaction rolled back: no channel row, no messages.
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::NotTracked
    );
    assert_eq!(count_messages(&ctx, CHANNEL), 0);

    reset_guild(&ctx, GUILD);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database (set DATABASE_URL)"]
async fn failed_guild_import_stays_importing() {
    let ctx = test_context();
    const GUILD: i64 = 15_000_001;
    const CHANNEL: i64 = 15_000_101;
    reset_guild(&ctx, GUILD);

    let history = vec![
        Ok(sample_message(15_000_500, GUILD, CHANNEL)),
        Err(GatewayError::new(GatewayErrorKind::Transport(
            "history fetch interrupted".to_string(),
        ))),
    ];
    let gateway = MockGateway::empty()
        .with_member(GUILD, 15_000_301)
        .with_channel(ChannelRecord::new(CHANNEL, GUILD), true)
        .with_history(CHANNEL, history);

    assert!(
        add_guild(&ctx, &GuildRecord::new(GUILD), &gateway)
            .await
            .is_err()
    );
    // The guild bootstrap committed before the history import failed: this
    // is the stuck state that regenerate recovers.
    assert_eq!(
        guild_status(&ctx, GUILD).await.unwrap(),
        TrackingStatus::Importing
    );
    assert_eq!(
        channel_status(&ctx, CHANNEL).await.unwrap(),
        TrackingStatus::Importing
    );
    assert!(membership_exists(&ctx, GUILD, 15_000_301));

    reset_guild(&ctx, GUILD);
}

mod common;

use chrono::{Duration, Utc};
use wodbook::{error::AppError, service::week_start};

#[tokio::test]
async fn plan_limit_caps_bookings_per_week() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "WOD", 20).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    common::assign_plan(&ctx, alice.id, 2).await?;

    let this_week = week_start(Utc::now());
    let s1 = common::create_session_at(&ctx, class.id, this_week + Duration::hours(9)).await?;
    let s2 = common::create_session_at(&ctx, class.id, this_week + Duration::days(2)).await?;
    let s3 = common::create_session_at(&ctx, class.id, this_week + Duration::days(4)).await?;
    let s4 = common::create_session_at(&ctx, class.id, this_week + Duration::days(8)).await?;

    ctx.quota_service.book_session(s1.id, alice.id).await?;
    ctx.quota_service.book_session(s2.id, alice.id).await?;

    let err = ctx.quota_service.book_session(s3.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded(_)));

    // The next week has a fresh allowance.
    ctx.quota_service.book_session(s4.id, alice.id).await?;

    let usage = ctx.quota_service.weekly_usage(alice.id, this_week).await?;
    assert_eq!(usage.used, 2);
    assert_eq!(usage.limit, 2);
    assert_eq!(usage.remaining, 0);
    assert_eq!(usage.week_start, this_week);

    Ok(())
}

#[tokio::test]
async fn duplicate_booking_for_same_session_conflicts() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "WOD", 20).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    common::assign_plan(&ctx, alice.id, 3).await?;

    let this_week = week_start(Utc::now());
    let session = common::create_session_at(&ctx, class.id, this_week + Duration::hours(9)).await?;

    ctx.quota_service.book_session(session.id, alice.id).await?;
    let err = ctx.quota_service.book_session(session.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn reinstatement_frees_a_quota_slot() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "WOD", 20).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    common::assign_plan(&ctx, alice.id, 1).await?;

    let this_week = week_start(Utc::now());
    let s1 = common::create_session_at(&ctx, class.id, this_week + Duration::hours(9)).await?;
    let s2 = common::create_session_at(&ctx, class.id, this_week + Duration::days(2)).await?;

    ctx.quota_service.book_session(s1.id, alice.id).await?;
    let err = ctx.quota_service.book_session(s2.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded(_)));

    ctx.quota_service
        .reinstate_for_week(alice.id, this_week, 1, Some("missed Monday".to_string()))
        .await?;

    let usage = ctx.quota_service.weekly_usage(alice.id, this_week).await?;
    assert_eq!(usage.used, 0);
    assert_eq!(usage.remaining, 1);

    ctx.quota_service.book_session(s2.id, alice.id).await?;

    Ok(())
}

#[tokio::test]
async fn cancelling_a_booking_frees_the_slot() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "WOD", 20).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    common::assign_plan(&ctx, alice.id, 1).await?;

    let this_week = week_start(Utc::now());
    let s1 = common::create_session_at(&ctx, class.id, this_week + Duration::hours(9)).await?;
    let s2 = common::create_session_at(&ctx, class.id, this_week + Duration::days(2)).await?;

    let booking = ctx.quota_service.book_session(s1.id, alice.id).await?;
    let err = ctx.quota_service.book_session(s2.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded(_)));

    ctx.quota_service.cancel_booking(booking.id).await?;

    let usage = ctx.quota_service.weekly_usage(alice.id, this_week).await?;
    assert_eq!(usage.used, 0);
    assert_eq!(usage.remaining, 1);

    ctx.quota_service.book_session(s2.id, alice.id).await?;

    Ok(())
}

#[tokio::test]
async fn no_active_plan_means_no_quota() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "WOD", 20).await?;
    let alice = common::create_student(&ctx, "Alice").await?;

    let this_week = week_start(Utc::now());
    let session = common::create_session_at(&ctx, class.id, this_week + Duration::hours(9)).await?;

    let usage = ctx.quota_service.weekly_usage(alice.id, Utc::now()).await?;
    assert_eq!(usage.limit, 0);
    assert_eq!(usage.remaining, 0);

    let err = ctx.quota_service.book_session(session.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded(_)));

    Ok(())
}

#[tokio::test]
async fn positive_amount_required_for_reinstatement() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;
    let alice = common::create_student(&ctx, "Alice").await?;

    let err = ctx
        .quota_service
        .reinstate_for_week(alice.id, Utc::now(), 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

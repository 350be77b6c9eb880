mod common;

use chrono::{Duration, Utc};
use wodbook::{
    domain::{BillingStatus, WebhookOutcome},
    error::AppError,
};

#[tokio::test]
async fn check_in_requires_settled_billing() -> anyhow::Result<()> {
    let (pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Barbell Club", 5).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    let enrollment_id = outcome.enrollment.id;

    // Push the enrollment fee past due.
    let payment = ctx.payment_repo.latest_for_enrollment(enrollment_id).await?.unwrap();
    let past = (Utc::now() - Duration::days(2)).naive_utc();
    sqlx::query("UPDATE payments SET due_date = ? WHERE id = ?")
        .bind(past)
        .bind(payment.id.to_string())
        .execute(&pool)
        .await?;

    let err = ctx
        .enrollment_service
        .record_check_in(enrollment_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentRequired(_)));

    let roster = ctx.roster_service.roster_for(class.id).await?;
    assert_eq!(roster[0].payment_status, BillingStatus::Overdue);

    // Settle the charge through the pipeline, then the same check-in works.
    let intent = ctx
        .payment_service
        .intent_for_payment(payment.id, payment.method)
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;
    ctx.payment_service
        .process_webhook(session.id, WebhookOutcome::Succeeded, None)
        .await?;

    let attendance = ctx.enrollment_service.record_check_in(enrollment_id, None).await?;
    assert_eq!(attendance.enrollment_id, enrollment_id);

    let roster = ctx.roster_service.roster_for(class.id).await?;
    assert_eq!(roster[0].payment_status, BillingStatus::Paid);
    assert!(roster[0].attendance.is_some());

    Ok(())
}

#[tokio::test]
async fn pending_charge_blocks_check_in_before_due_date() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Barbell Club", 5).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    // The fee is not yet due, but it is also not paid.
    let err = ctx
        .enrollment_service
        .record_check_in(outcome.enrollment.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentRequired(_)));

    let roster = ctx.roster_service.roster_for(class.id).await?;
    assert_eq!(roster[0].payment_status, BillingStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn enrollment_without_charges_passes_the_gate() -> anyhow::Result<()> {
    let (pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Barbell Club", 5).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    // Simulate a comped enrollment by removing its billing records.
    sqlx::query("DELETE FROM invoices WHERE payment_id IN (SELECT id FROM payments WHERE enrollment_id = ?)")
        .bind(outcome.enrollment.id.to_string())
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM payments WHERE enrollment_id = ?")
        .bind(outcome.enrollment.id.to_string())
        .execute(&pool)
        .await?;

    let attendance = ctx
        .enrollment_service
        .record_check_in(outcome.enrollment.id, None)
        .await?;
    assert_eq!(attendance.enrollment_id, outcome.enrollment.id);

    let roster = ctx.roster_service.roster_for(class.id).await?;
    assert_eq!(roster[0].payment_status, BillingStatus::Paid);
    assert_eq!(roster[0].payment_label, "No active charge");

    Ok(())
}

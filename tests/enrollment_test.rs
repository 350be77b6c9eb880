mod common;

use wodbook::domain::EnrollmentStatus;

#[tokio::test]
async fn first_student_takes_seat_second_waitlisted() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Strength 101", 1).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let bob = common::create_student(&ctx, "Bob").await?;

    let first = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    assert_eq!(first.enrollment.status, EnrollmentStatus::Active);
    assert!(!first.is_waitlist);
    assert!(!first.already_enrolled);

    let second = ctx.enrollment_service.enroll_student(bob.id, class.id).await?;
    assert_eq!(second.enrollment.status, EnrollmentStatus::Waitlist);
    assert!(second.is_waitlist);

    let usage = ctx.enrollment_service.capacity_usage(class.id).await?;
    assert_eq!(usage.active, 1);
    assert_eq!(usage.capacity, 1);
    assert_eq!(usage.available, 0);

    Ok(())
}

#[tokio::test]
async fn enroll_is_idempotent_and_creates_one_charge() -> anyhow::Result<()> {
    let (pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Mobility", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;

    let first = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    let second = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    assert_eq!(first.enrollment.id, second.enrollment.id);
    assert!(!first.already_enrolled);
    assert!(second.already_enrolled);

    // Exactly one Payment and one Invoice came out of the two calls.
    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE enrollment_id = ?")
        .bind(first.enrollment.id.to_string())
        .fetch_one(&pool)
        .await?;
    assert_eq!(payments, 1);

    let invoices: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM invoices WHERE payment_id IN (SELECT id FROM payments WHERE enrollment_id = ?)",
    )
    .bind(first.enrollment.id.to_string())
    .fetch_one(&pool)
    .await?;
    assert_eq!(invoices, 1);

    Ok(())
}

#[tokio::test]
async fn cancelling_active_enrollment_promotes_oldest_waitlisted() -> anyhow::Result<()> {
    let (pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Oly Lifting", 1).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let bob = common::create_student(&ctx, "Bob").await?;
    let cara = common::create_student(&ctx, "Cara").await?;

    let alice_enrollment = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    let bob_enrollment = ctx.enrollment_service.enroll_student(bob.id, class.id).await?;
    let cara_enrollment = ctx.enrollment_service.enroll_student(cara.id, class.id).await?;
    assert_eq!(bob_enrollment.enrollment.status, EnrollmentStatus::Waitlist);
    assert_eq!(cara_enrollment.enrollment.status, EnrollmentStatus::Waitlist);

    ctx.enrollment_service
        .update_enrollment_status(alice_enrollment.enrollment.id, EnrollmentStatus::Cancelled)
        .await?;

    // Bob waited longest and takes the freed seat; Cara stays waitlisted.
    let bob_now = ctx.enrollment_repo.find_by_id(bob_enrollment.enrollment.id).await?.unwrap();
    assert_eq!(bob_now.status, EnrollmentStatus::Active);
    let cara_now = ctx.enrollment_repo.find_by_id(cara_enrollment.enrollment.id).await?.unwrap();
    assert_eq!(cara_now.status, EnrollmentStatus::Waitlist);

    // Promotion created Bob's billing obligation.
    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE enrollment_id = ?")
        .bind(bob_now.id.to_string())
        .fetch_one(&pool)
        .await?;
    assert_eq!(payments, 1);

    let usage = ctx.enrollment_service.capacity_usage(class.id).await?;
    assert_eq!(usage.active, 1);
    assert_eq!(usage.available, 0);

    Ok(())
}

#[tokio::test]
async fn promotion_declines_while_the_seat_is_taken() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Oly Lifting", 1).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let bob = common::create_student(&ctx, "Bob").await?;

    ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    let bob_enrollment = ctx.enrollment_service.enroll_student(bob.id, class.id).await?;
    assert_eq!(bob_enrollment.enrollment.status, EnrollmentStatus::Waitlist);

    // The seat check and the promotion are one unit: with Alice still
    // active nothing moves, even though Bob is first in line.
    let promoted = ctx
        .enrollment_repo
        .promote_oldest_waitlisted(class.id, class.capacity)
        .await?;
    assert!(promoted.is_none());

    let bob_now = ctx.enrollment_repo.find_by_id(bob_enrollment.enrollment.id).await?.unwrap();
    assert_eq!(bob_now.status, EnrollmentStatus::Waitlist);

    Ok(())
}

#[tokio::test]
async fn racing_enrollments_collapse_to_one_row() -> anyhow::Result<()> {
    let (pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Mobility", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;

    // Two inserts for the same student, as when racing requests both pass
    // the existing-enrollment lookup. The loser hits the live-row unique
    // index and hands back the winner's row instead of erroring.
    let first = ctx
        .enrollment_repo
        .create_with_capacity_check(alice.id, class.id, class.capacity)
        .await?;
    let second = ctx
        .enrollment_repo
        .create_with_capacity_check(alice.id, class.id, class.capacity)
        .await?;
    assert_eq!(first.id, second.id);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND class_id = ?",
    )
    .bind(alice.id.to_string())
    .bind(class.id.to_string())
    .fetch_one(&pool)
    .await?;
    assert_eq!(rows, 1);

    Ok(())
}

#[tokio::test]
async fn roster_lists_enrollments_in_creation_order() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Conditioning", 2).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let bob = common::create_student(&ctx, "Bob").await?;

    ctx.enrollment_service.enroll_student(alice.id, class.id).await?;
    ctx.enrollment_service.enroll_student(bob.id, class.id).await?;

    let roster = ctx.roster_service.roster_for(class.id).await?;
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].student.id, alice.id);
    assert_eq!(roster[1].student.id, bob.id);
    // Fresh enrollments owe their fee, so the gate reports pending.
    assert_eq!(roster[0].payment_label, "Payment pending");

    Ok(())
}

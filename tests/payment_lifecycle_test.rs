mod common;

use chrono::Utc;
use uuid::Uuid;
use wodbook::{
    domain::{
        IntentStatus, InvoiceStatus, PaymentMethod, PaymentStatus, Receipt, SessionStatus,
        Settlement, WebhookOutcome,
    },
    error::AppError,
};

#[tokio::test]
async fn checkout_pipeline_settles_payment() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            9500,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);

    let session = ctx.payment_service.start_session(intent.id, None).await?;
    assert_eq!(session.status, SessionStatus::Open);
    assert!(session.checkout_url.contains("/checkout/"));

    let intent_now = ctx.payment_repo.find_intent(intent.id).await?.unwrap();
    assert_eq!(intent_now.status, IntentStatus::Processing);

    let session = ctx
        .payment_service
        .process_webhook(session.id, WebhookOutcome::Succeeded, None)
        .await?;
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.last_webhook_status, Some(WebhookOutcome::Succeeded));

    let payment = ctx.payment_repo.find_payment(intent.payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(payment.paid_at.is_some());

    let invoice = ctx.payment_repo.invoice_for_payment(payment.id).await?.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);

    let receipts = ctx.payment_repo.receipts_for_payment(payment.id).await?;
    assert_eq!(receipts.len(), 1);

    // 5% settlement fee in cents: 9500 gross -> 475 fees, 9025 net.
    let settlements = ctx.payment_repo.list_settlements().await?;
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].gross_cents, 9500);
    assert_eq!(settlements[0].fees_cents, 475);
    assert_eq!(settlements[0].net_cents, 9025);
    assert_eq!(settlements[0].receipt_id, receipts[0].id);

    Ok(())
}

#[tokio::test]
async fn duplicate_webhook_is_absorbed() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            4000,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;

    ctx.payment_service
        .process_webhook(session.id, WebhookOutcome::Succeeded, None)
        .await?;
    // Redelivery of the same event must not mint anything twice.
    let replay = ctx
        .payment_service
        .process_webhook(session.id, WebhookOutcome::Succeeded, None)
        .await?;
    assert_eq!(replay.status, SessionStatus::Completed);

    let receipts = ctx.payment_repo.receipts_for_payment(intent.payment_id).await?;
    assert_eq!(receipts.len(), 1);
    let settlements = ctx.payment_repo.list_settlements().await?;
    assert_eq!(settlements.len(), 1);

    Ok(())
}

#[tokio::test]
async fn settlement_rides_the_session_claim() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            9500,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;

    let records = |payment_id: Uuid| {
        let now = Utc::now();
        let receipt = Receipt {
            id: Uuid::new_v4(),
            payment_id,
            reference: "RCPT-TEST".to_string(),
            issued_at: now,
        };
        let settlement = Settlement {
            id: Uuid::new_v4(),
            period: "2026-08".to_string(),
            gross_cents: 9500,
            fees_cents: 475,
            net_cents: 9025,
            receipt_id: receipt.id,
            created_at: now,
        };
        (receipt, settlement)
    };

    // The claim and every payment-side effect commit together: the first
    // resolution wins the claim and lands the whole settlement with it.
    let claimed = ctx
        .payment_repo
        .resolve_session(
            session.id,
            intent.id,
            intent.payment_id,
            WebhookOutcome::Succeeded,
            None,
            None,
            Some(records(intent.payment_id)),
        )
        .await?;
    assert!(claimed);

    let session_now = ctx.payment_repo.find_session(session.id).await?.unwrap();
    assert_eq!(session_now.status, SessionStatus::Completed);
    let payment = ctx.payment_repo.find_payment(intent.payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    let receipts = ctx.payment_repo.receipts_for_payment(intent.payment_id).await?;
    assert_eq!(receipts.len(), 1);

    // A retry of the same delivery loses the claim and leaves no trace;
    // there is no window where the session is claimed but unsettled.
    let retried = ctx
        .payment_repo
        .resolve_session(
            session.id,
            intent.id,
            intent.payment_id,
            WebhookOutcome::Succeeded,
            None,
            None,
            Some(records(intent.payment_id)),
        )
        .await?;
    assert!(!retried);

    let payment = ctx.payment_repo.find_payment(intent.payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    let receipts = ctx.payment_repo.receipts_for_payment(intent.payment_id).await?;
    assert_eq!(receipts.len(), 1);
    assert_eq!(ctx.payment_repo.list_settlements().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn failed_webhook_leaves_invoice_open() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            4000,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;

    let session = ctx
        .payment_service
        .process_webhook(
            session.id,
            WebhookOutcome::Failed,
            Some("card_declined".to_string()),
        )
        .await?;
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.last_webhook_status, Some(WebhookOutcome::Failed));

    let payment = ctx.payment_repo.find_payment(intent.payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.description.contains("card_declined"));

    let invoice = ctx.payment_repo.invoice_for_payment(payment.id).await?.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Open);
    assert!(invoice.notes.unwrap().contains("card_declined"));

    let intent_now = ctx.payment_repo.find_intent(intent.id).await?.unwrap();
    assert_eq!(intent_now.status, IntentStatus::Failed);

    Ok(())
}

#[tokio::test]
async fn paid_state_is_never_reverted() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            4000,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;
    ctx.payment_service
        .process_webhook(session.id, WebhookOutcome::Succeeded, None)
        .await?;

    // A stray failure delivery on a later session cannot undo settlement.
    let late_session = ctx.payment_service.start_session(intent.id, None).await?;
    ctx.payment_service
        .process_webhook(
            late_session.id,
            WebhookOutcome::Failed,
            Some("late delivery".to_string()),
        )
        .await?;

    let payment = ctx.payment_repo.find_payment(intent.payment_id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    let intent_now = ctx.payment_repo.find_intent(intent.id).await?.unwrap();
    assert_eq!(intent_now.status, IntentStatus::Succeeded);
    let invoice = ctx.payment_repo.invoice_for_payment(payment.id).await?.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);

    Ok(())
}

#[tokio::test]
async fn pay_now_walks_the_whole_pipeline() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Endurance", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    // The enrollment fee is the outstanding payment.
    let payment = ctx
        .payment_repo
        .latest_for_enrollment(outcome.enrollment.id)
        .await?
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let (session, intent) = ctx.payment_service.pay_outstanding(payment.id).await?;
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(intent.status, IntentStatus::Succeeded);

    let payment = ctx.payment_repo.find_payment(payment.id).await?.unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);

    // A second pay-now on a settled payment is rejected.
    let err = ctx.payment_service.pay_outstanding(payment.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn shortcut_charges_skip_the_pipeline() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let alice = common::create_student(&ctx, "Alice").await?;

    let stored = ctx
        .payment_service
        .charge_stored_card(alice.id, 1500, "Protein bar".to_string())
        .await?;
    assert_eq!(stored.status, PaymentStatus::Paid);
    assert!(stored.paid_at.is_some());
    let invoice = ctx.payment_repo.invoice_for_payment(stored.id).await?.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);

    let card = ctx
        .payment_service
        .create_one_time_payment(alice.id, 2500, PaymentMethod::CreditCard, "Drop-in".to_string())
        .await?;
    assert_eq!(card.status, PaymentStatus::Paid);

    // Anything but a card stays pending for manual settlement.
    let cash = ctx
        .payment_service
        .create_one_time_payment(alice.id, 2500, PaymentMethod::Cash, "Drop-in".to_string())
        .await?;
    assert_eq!(cash.status, PaymentStatus::Pending);
    assert!(cash.paid_at.is_none());

    let outstanding = ctx.payment_service.outstanding_for_student(alice.id).await?;
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].id, cash.id);

    Ok(())
}

#[tokio::test]
async fn stale_open_sessions_are_swept() -> anyhow::Result<()> {
    let (_pool, ctx) = common::setup().await?;

    let class = common::create_class(&ctx, "Gymnastics", 10).await?;
    let alice = common::create_student(&ctx, "Alice").await?;
    let outcome = ctx.enrollment_service.enroll_student(alice.id, class.id).await?;

    let intent = ctx
        .payment_service
        .create_intent_for_enrollment(
            outcome.enrollment.id,
            4000,
            PaymentMethod::CreditCard,
            "Drop-in charge".to_string(),
        )
        .await?;
    let session = ctx.payment_service.start_session(intent.id, None).await?;

    // The session expires 30 minutes out; sweep as of an hour later.
    let later = session.expires_at + chrono::Duration::minutes(30);
    let expired = ctx.payment_service.expire_stale_sessions(later).await?;
    assert_eq!(expired, 1);

    let session = ctx.payment_repo.find_session(session.id).await?.unwrap();
    assert_eq!(session.status, SessionStatus::Expired);

    Ok(())
}

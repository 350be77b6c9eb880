use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::{
    config::BillingConfig,
    domain::{
        IntentStatus, Invoice, InvoiceStatus, Payment, PaymentIntent, PaymentMethod,
        PaymentSession, PaymentStatus, Receipt, SessionStatus, Settlement, WebhookOutcome,
    },
    error::{AppError, Result},
    repository::{EnrollmentRepository, PaymentRepository},
};

/// Owns the Payment -> Invoice -> PaymentIntent -> PaymentSession ->
/// webhook -> Receipt/Settlement pipeline, plus the synchronous shortcuts
/// that settle in one call.
pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    enrollment_repo: Arc<dyn EnrollmentRepository>,
    billing: BillingConfig,
    base_url: String,
}

impl PaymentService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        enrollment_repo: Arc<dyn EnrollmentRepository>,
        billing: BillingConfig,
        base_url: String,
    ) -> Self {
        Self { payment_repo, enrollment_repo, billing, base_url }
    }

    fn opaque_token(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn settlement_fees(&self, gross_cents: i64) -> i64 {
        gross_cents * self.billing.settlement_fee_bps / 10_000
    }

    /// Creates the pending Payment and open Invoice for a new obligation.
    pub async fn create_charge(
        &self,
        student_id: Uuid,
        enrollment_id: Option<Uuid>,
        amount_cents: i64,
        method: PaymentMethod,
        description: String,
    ) -> Result<(Payment, Invoice)> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            student_id,
            enrollment_id,
            amount_cents,
            status: PaymentStatus::Pending,
            method,
            description,
            due_date: now + Duration::days(self.billing.due_days),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        let payment = self.payment_repo.create_payment(payment).await?;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            status: InvoiceStatus::Open,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let invoice = self.payment_repo.create_invoice(invoice).await?;

        Ok((payment, invoice))
    }

    /// Ad-hoc charge against an enrollment: materializes Payment, Invoice
    /// and a fresh intent in RequiresPaymentMethod.
    pub async fn create_intent_for_enrollment(
        &self,
        enrollment_id: Uuid,
        amount_cents: i64,
        method: PaymentMethod,
        description: String,
    ) -> Result<PaymentIntent> {
        let enrollment = self.enrollment_repo.find_by_id(enrollment_id).await?
            .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

        let (payment, _invoice) = self
            .create_charge(
                enrollment.student_id,
                Some(enrollment_id),
                amount_cents,
                method,
                description.clone(),
            )
            .await?;

        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            status: IntentStatus::RequiresPaymentMethod,
            method,
            description,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.payment_repo.create_intent(intent).await
    }

    /// The live intent for a payment, creating one when none exists. This
    /// is what keeps "at most one live intent per payment" true: callers
    /// never mint intents directly.
    pub async fn intent_for_payment(&self, payment_id: Uuid, method: PaymentMethod) -> Result<PaymentIntent> {
        let payment = self.payment_repo.find_payment(payment_id).await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if let Some(intent) = self.payment_repo.live_intent_for_payment(payment_id).await? {
            return Ok(intent);
        }

        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            status: IntentStatus::RequiresPaymentMethod,
            method,
            description: payment.description,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.payment_repo.create_intent(intent).await
    }

    /// Opens a checkout session for an intent and moves it to Processing.
    /// A caller that created the intent but lost the race to persist it may
    /// hand the object in as `fallback`; it is stored before the session
    /// opens. With neither a persisted nor a fallback intent this fails.
    pub async fn start_session(
        &self,
        intent_id: Uuid,
        fallback: Option<PaymentIntent>,
    ) -> Result<PaymentSession> {
        let intent = match self.payment_repo.find_intent(intent_id).await? {
            Some(intent) => intent,
            None => match fallback {
                Some(fallback) => self.payment_repo.create_intent(fallback).await?,
                None => return Err(AppError::NotFound("Payment intent not found".to_string())),
            },
        };

        self.payment_repo
            .update_intent_status(intent.id, IntentStatus::Processing)
            .await?;

        let token = Self::opaque_token(32);
        let session = PaymentSession {
            id: Uuid::new_v4(),
            intent_id: intent.id,
            status: SessionStatus::Open,
            checkout_url: format!("{}/checkout/{}", self.base_url, token),
            expires_at: Utc::now() + Duration::minutes(self.billing.session_expiry_minutes),
            last_webhook_status: None,
            created_at: Utc::now(),
        };

        self.payment_repo.create_session(session).await
    }

    /// Resolves a checkout session from a webhook delivery. Single-fire per
    /// session: the repository claims the session and applies every
    /// payment-side effect in one transaction, so the session only leaves
    /// Open together with them. Later duplicates return the already
    /// resolved session without touching payment state.
    pub async fn process_webhook(
        &self,
        session_id: Uuid,
        outcome: WebhookOutcome,
        failure_reason: Option<String>,
    ) -> Result<PaymentSession> {
        let session = self.payment_repo.find_session(session_id).await?
            .ok_or_else(|| AppError::NotFound("Payment session not found".to_string()))?;

        let intent = self.payment_repo.find_intent(session.intent_id).await?
            .ok_or_else(|| AppError::InvalidState(
                "Webhook session has no resolvable intent".to_string(),
            ))?;
        let payment = self.payment_repo.find_payment(intent.payment_id).await?
            .ok_or_else(|| AppError::InvalidState(
                "Webhook intent has no resolvable payment".to_string(),
            ))?;

        let settlement = match outcome {
            WebhookOutcome::Succeeded => Some(self.settlement_records(&payment)),
            WebhookOutcome::Failed => None,
        };
        // The invoice stays open so the charge can be re-driven with a
        // fresh intent.
        let invoice_note = failure_reason
            .as_deref()
            .map(|r| format!("Checkout failed: {}", r));

        let claimed = self
            .payment_repo
            .resolve_session(
                session_id,
                intent.id,
                payment.id,
                outcome,
                failure_reason.as_deref(),
                invoice_note.as_deref(),
                settlement,
            )
            .await?;

        if !claimed {
            tracing::debug!(session_id = %session_id, "duplicate webhook delivery ignored");
        } else {
            match outcome {
                WebhookOutcome::Succeeded => tracing::info!(
                    payment_id = %payment.id,
                    amount_cents = payment.amount_cents,
                    "payment settled via webhook"
                ),
                WebhookOutcome::Failed => tracing::warn!(
                    payment_id = %payment.id,
                    reason = failure_reason.as_deref().unwrap_or("unspecified"),
                    "payment failed via webhook"
                ),
            }
        }

        self.refetch_session(session_id).await
    }

    async fn refetch_session(&self, session_id: Uuid) -> Result<PaymentSession> {
        self.payment_repo.find_session(session_id).await?.ok_or_else(|| {
            AppError::NotFound("Payment session not found".to_string())
        })
    }

    /// The Receipt and Settlement minted when a payment settles.
    fn settlement_records(&self, payment: &Payment) -> (Receipt, Settlement) {
        let now = Utc::now();
        let receipt = Receipt {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            reference: format!("RCPT-{}", Self::opaque_token(12).to_uppercase()),
            issued_at: now,
        };

        let fees = self.settlement_fees(payment.amount_cents);
        let settlement = Settlement {
            id: Uuid::new_v4(),
            period: now.format("%Y-%m").to_string(),
            gross_cents: payment.amount_cents,
            fees_cents: fees,
            net_cents: payment.amount_cents - fees,
            receipt_id: receipt.id,
            created_at: now,
        };
        (receipt, settlement)
    }

    /// "Pay now": finds or creates a live intent, opens a session, and
    /// immediately drives the webhook to success. The asynchronous checkout
    /// path stays available for callers that want the separation.
    pub async fn pay_outstanding(&self, payment_id: Uuid) -> Result<(PaymentSession, PaymentIntent)> {
        let payment = self.payment_repo.find_payment(payment_id).await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::InvalidState(
                "Payment is already resolved".to_string(),
            ));
        }

        let intent = self.intent_for_payment(payment_id, payment.method).await?;
        let session = self.start_session(intent.id, None).await?;
        let session = self
            .process_webhook(session.id, WebhookOutcome::Succeeded, None)
            .await?;

        let intent = self.payment_repo.find_intent(intent.id).await?
            .ok_or_else(|| AppError::NotFound("Payment intent not found".to_string()))?;

        Ok((session, intent))
    }

    /// Direct on-file charge: the payment lands already paid, with its
    /// invoice mirroring, and never touches the intent/session pipeline.
    pub async fn charge_stored_card(
        &self,
        student_id: Uuid,
        amount_cents: i64,
        description: String,
    ) -> Result<Payment> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            student_id,
            enrollment_id: None,
            amount_cents,
            status: PaymentStatus::Paid,
            method: PaymentMethod::CreditCard,
            description,
            due_date: now,
            paid_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let payment = self.payment_repo.create_payment(payment).await?;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            status: InvoiceStatus::Paid,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.payment_repo.create_invoice(invoice).await?;

        tracing::info!(payment_id = %payment.id, "stored card charged");
        Ok(payment)
    }

    /// One-off charge that settles immediately only for card payments;
    /// anything else stays pending for manual settlement.
    pub async fn create_one_time_payment(
        &self,
        student_id: Uuid,
        amount_cents: i64,
        method: PaymentMethod,
        description: String,
    ) -> Result<Payment> {
        let now = Utc::now();
        let settled = method == PaymentMethod::CreditCard;
        let payment = Payment {
            id: Uuid::new_v4(),
            student_id,
            enrollment_id: None,
            amount_cents,
            status: if settled { PaymentStatus::Paid } else { PaymentStatus::Pending },
            method,
            description,
            due_date: now + Duration::days(self.billing.due_days),
            paid_at: if settled { Some(now) } else { None },
            created_at: now,
            updated_at: now,
        };
        let payment = self.payment_repo.create_payment(payment).await?;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            status: if settled { InvoiceStatus::Paid } else { InvoiceStatus::Open },
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.payment_repo.create_invoice(invoice).await?;

        Ok(payment)
    }

    /// Pending payments for a student, oldest due first.
    pub async fn outstanding_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>> {
        self.payment_repo.list_pending_for_student(student_id).await
    }

    /// Marks open sessions past their expiry as Expired. Expiry is a data
    /// attribute, not a live timer; ops calls this sweep.
    pub async fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let expired = self.payment_repo.expire_open_sessions(now).await?;
        if expired > 0 {
            tracing::info!(expired, "expired stale checkout sessions");
        }
        Ok(expired)
    }
}

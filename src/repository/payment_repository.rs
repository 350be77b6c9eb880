use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        IntentStatus, Invoice, InvoiceStatus, Payment, PaymentIntent, PaymentMethod,
        PaymentSession, PaymentStatus, Receipt, SessionStatus, Settlement, WebhookOutcome,
    },
    error::{AppError, Result},
    repository::PaymentRepository,
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    student_id: String,
    enrollment_id: Option<String>,
    amount_cents: i64,
    status: String,
    method: String,
    description: String,
    due_date: NaiveDateTime,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct InvoiceRow {
    id: String,
    payment_id: String,
    status: String,
    notes: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct IntentRow {
    id: String,
    payment_id: String,
    status: String,
    method: String,
    description: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    intent_id: String,
    status: String,
    checkout_url: String,
    expires_at: NaiveDateTime,
    last_webhook_status: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct ReceiptRow {
    id: String,
    payment_id: String,
    reference: String,
    issued_at: NaiveDateTime,
}

#[derive(FromRow)]
struct SettlementRow {
    id: String,
    period: String,
    gross_cents: i64,
    fees_cents: i64,
    net_cents: i64,
    receipt_id: String,
    created_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_uuid(s: &str) -> Result<Uuid> {
        Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        let enrollment_id = match row.enrollment_id {
            Some(s) => Some(Self::parse_uuid(&s)?),
            None => None,
        };
        Ok(Payment {
            id: Self::parse_uuid(&row.id)?,
            student_id: Self::parse_uuid(&row.student_id)?,
            enrollment_id,
            amount_cents: row.amount_cents,
            status: Self::parse_payment_status(&row.status)?,
            method: Self::parse_method(&row.method)?,
            description: row.description,
            due_date: DateTime::from_naive_utc_and_offset(row.due_date, Utc),
            paid_at: row.paid_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_invoice(row: InvoiceRow) -> Result<Invoice> {
        Ok(Invoice {
            id: Self::parse_uuid(&row.id)?,
            payment_id: Self::parse_uuid(&row.payment_id)?,
            status: Self::parse_invoice_status(&row.status)?,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_intent(row: IntentRow) -> Result<PaymentIntent> {
        Ok(PaymentIntent {
            id: Self::parse_uuid(&row.id)?,
            payment_id: Self::parse_uuid(&row.payment_id)?,
            status: Self::parse_intent_status(&row.status)?,
            method: Self::parse_method(&row.method)?,
            description: row.description,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_session(row: SessionRow) -> Result<PaymentSession> {
        let last_webhook_status = match row.last_webhook_status.as_deref() {
            Some(s) => Some(Self::parse_outcome(s)?),
            None => None,
        };
        Ok(PaymentSession {
            id: Self::parse_uuid(&row.id)?,
            intent_id: Self::parse_uuid(&row.intent_id)?,
            status: Self::parse_session_status(&row.status)?,
            checkout_url: row.checkout_url,
            expires_at: DateTime::from_naive_utc_and_offset(row.expires_at, Utc),
            last_webhook_status,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_receipt(row: ReceiptRow) -> Result<Receipt> {
        Ok(Receipt {
            id: Self::parse_uuid(&row.id)?,
            payment_id: Self::parse_uuid(&row.payment_id)?,
            reference: row.reference,
            issued_at: DateTime::from_naive_utc_and_offset(row.issued_at, Utc),
        })
    }

    fn row_to_settlement(row: SettlementRow) -> Result<Settlement> {
        Ok(Settlement {
            id: Self::parse_uuid(&row.id)?,
            period: row.period,
            gross_cents: row.gross_cents,
            fees_cents: row.fees_cents,
            net_cents: row.net_cents,
            receipt_id: Self::parse_uuid(&row.receipt_id)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Failed" => Ok(PaymentStatus::Failed),
            _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
        }
    }

    fn payment_status_to_str(status: &PaymentStatus) -> &'static str {
        match status {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
        }
    }

    fn parse_invoice_status(s: &str) -> Result<InvoiceStatus> {
        match s {
            "Open" => Ok(InvoiceStatus::Open),
            "Paid" => Ok(InvoiceStatus::Paid),
            "Void" => Ok(InvoiceStatus::Void),
            _ => Err(AppError::Database(format!("Invalid invoice status: {}", s))),
        }
    }

    fn invoice_status_to_str(status: &InvoiceStatus) -> &'static str {
        match status {
            InvoiceStatus::Open => "Open",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Void => "Void",
        }
    }

    fn parse_intent_status(s: &str) -> Result<IntentStatus> {
        match s {
            "RequiresPaymentMethod" => Ok(IntentStatus::RequiresPaymentMethod),
            "Processing" => Ok(IntentStatus::Processing),
            "Succeeded" => Ok(IntentStatus::Succeeded),
            "Failed" => Ok(IntentStatus::Failed),
            "Canceled" => Ok(IntentStatus::Canceled),
            _ => Err(AppError::Database(format!("Invalid intent status: {}", s))),
        }
    }

    fn intent_status_to_str(status: &IntentStatus) -> &'static str {
        match status {
            IntentStatus::RequiresPaymentMethod => "RequiresPaymentMethod",
            IntentStatus::Processing => "Processing",
            IntentStatus::Succeeded => "Succeeded",
            IntentStatus::Failed => "Failed",
            IntentStatus::Canceled => "Canceled",
        }
    }

    fn parse_session_status(s: &str) -> Result<SessionStatus> {
        match s {
            "Open" => Ok(SessionStatus::Open),
            "Completed" => Ok(SessionStatus::Completed),
            "Expired" => Ok(SessionStatus::Expired),
            _ => Err(AppError::Database(format!("Invalid session status: {}", s))),
        }
    }

    fn session_status_to_str(status: &SessionStatus) -> &'static str {
        match status {
            SessionStatus::Open => "Open",
            SessionStatus::Completed => "Completed",
            SessionStatus::Expired => "Expired",
        }
    }

    fn parse_method(s: &str) -> Result<PaymentMethod> {
        match s {
            "CreditCard" => Ok(PaymentMethod::CreditCard),
            "BankTransfer" => Ok(PaymentMethod::BankTransfer),
            "Cash" => Ok(PaymentMethod::Cash),
            _ => Err(AppError::Database(format!("Invalid payment method: {}", s))),
        }
    }

    fn method_to_str(method: &PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::CreditCard => "CreditCard",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::Cash => "Cash",
        }
    }

    fn parse_outcome(s: &str) -> Result<WebhookOutcome> {
        match s {
            "Succeeded" => Ok(WebhookOutcome::Succeeded),
            "Failed" => Ok(WebhookOutcome::Failed),
            _ => Err(AppError::Database(format!("Invalid webhook outcome: {}", s))),
        }
    }

    fn outcome_to_str(outcome: &WebhookOutcome) -> &'static str {
        match outcome {
            WebhookOutcome::Succeeded => "Succeeded",
            WebhookOutcome::Failed => "Failed",
        }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create_payment(&self, payment: Payment) -> Result<Payment> {
        let enrollment_id_str = payment.enrollment_id.map(|id| id.to_string());
        let paid_at_naive = payment.paid_at.map(|dt| dt.naive_utc());
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, student_id, enrollment_id, amount_cents, status, method,
                description, due_date, paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.student_id.to_string())
        .bind(&enrollment_id_str)
        .bind(payment.amount_cents)
        .bind(Self::payment_status_to_str(&payment.status))
        .bind(Self::method_to_str(&payment.method))
        .bind(&payment.description)
        .bind(payment.due_date.naive_utc())
        .bind(paid_at_naive)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_payment(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, student_id, enrollment_id, amount_cents, status, method,
                   description, due_date, paid_at, created_at, updated_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn latest_for_enrollment(&self, enrollment_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, student_id, enrollment_id, amount_cents, status, method,
                   description, due_date, paid_at, created_at, updated_at
            FROM payments
            WHERE enrollment_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(enrollment_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn exists_for_enrollment(&self, enrollment_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payments WHERE enrollment_id = ?
            "#,
        )
        .bind(enrollment_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn list_pending_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, student_id, enrollment_id, amount_cents, status, method,
                   description, due_date, paid_at, created_at, updated_at
            FROM payments
            WHERE student_id = ? AND status = 'Pending'
            ORDER BY due_date
            "#,
        )
        .bind(student_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn create_invoice(&self, invoice: Invoice) -> Result<Invoice> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO invoices (id, payment_id, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.id.to_string())
        .bind(invoice.payment_id.to_string())
        .bind(Self::invoice_status_to_str(&invoice.status))
        .bind(&invoice.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.invoice_for_payment(invoice.payment_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created invoice".to_string())
        })
    }

    async fn invoice_for_payment(&self, payment_id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, payment_id, status, notes, created_at, updated_at
            FROM invoices
            WHERE payment_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(payment_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_invoice(r)?)),
            None => Ok(None),
        }
    }

    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payment_intents (
                id, payment_id, status, method, description, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(intent.id.to_string())
        .bind(intent.payment_id.to_string())
        .bind(Self::intent_status_to_str(&intent.status))
        .bind(Self::method_to_str(&intent.method))
        .bind(&intent.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_intent(intent.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created intent".to_string())
        })
    }

    async fn find_intent(&self, id: Uuid) -> Result<Option<PaymentIntent>> {
        let row = sqlx::query_as::<_, IntentRow>(
            r#"
            SELECT id, payment_id, status, method, description, created_at, updated_at
            FROM payment_intents
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_intent(r)?)),
            None => Ok(None),
        }
    }

    async fn live_intent_for_payment(&self, payment_id: Uuid) -> Result<Option<PaymentIntent>> {
        let row = sqlx::query_as::<_, IntentRow>(
            r#"
            SELECT id, payment_id, status, method, description, created_at, updated_at
            FROM payment_intents
            WHERE payment_id = ? AND status NOT IN ('Succeeded', 'Canceled')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(payment_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_intent(r)?)),
            None => Ok(None),
        }
    }

    async fn update_intent_status(&self, id: Uuid, status: IntentStatus) -> Result<PaymentIntent> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        // Succeeded is terminal for intents as well.
        sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = ?, updated_at = ?
            WHERE id = ? AND status != 'Succeeded'
            "#,
        )
        .bind(Self::intent_status_to_str(&status))
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_intent(id).await?.ok_or_else(|| {
            AppError::NotFound("Payment intent not found".to_string())
        })
    }

    async fn create_session(&self, session: PaymentSession) -> Result<PaymentSession> {
        let last_webhook = session.last_webhook_status.as_ref().map(Self::outcome_to_str);

        sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                id, intent_id, status, checkout_url, expires_at,
                last_webhook_status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.intent_id.to_string())
        .bind(Self::session_status_to_str(&session.status))
        .bind(&session.checkout_url)
        .bind(session.expires_at.naive_utc())
        .bind(last_webhook)
        .bind(session.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_session(session.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment session".to_string())
        })
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<PaymentSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, intent_id, status, checkout_url, expires_at,
                   last_webhook_status, created_at
            FROM payment_sessions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn resolve_session(
        &self,
        session_id: Uuid,
        intent_id: Uuid,
        payment_id: Uuid,
        outcome: WebhookOutcome,
        failure_reason: Option<&str>,
        invoice_note: Option<&str>,
        settlement: Option<(Receipt, Settlement)>,
    ) -> Result<bool> {
        let payment_id_str = payment_id.to_string();
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await.map_err(|e| AppError::Database(e.to_string()))?;

        // Only one delivery can move the session out of Open; everything
        // below commits or rolls back with that claim.
        let claimed = sqlx::query(
            r#"
            UPDATE payment_sessions
            SET status = 'Completed', last_webhook_status = ?
            WHERE id = ? AND status = 'Open'
            "#,
        )
        .bind(Self::outcome_to_str(&outcome))
        .bind(session_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .rows_affected()
            > 0;

        if !claimed {
            return Ok(false);
        }

        match outcome {
            WebhookOutcome::Succeeded => {
                // Succeeded is terminal for intents.
                sqlx::query(
                    r#"
                    UPDATE payment_intents
                    SET status = 'Succeeded', updated_at = ?
                    WHERE id = ? AND status != 'Succeeded'
                    "#,
                )
                .bind(now)
                .bind(intent_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

                // Paid is terminal: the guard keeps a resolved payment
                // untouched, and nothing downstream mints twice.
                let paid = sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = 'Paid', paid_at = ?, updated_at = ?
                    WHERE id = ? AND status = 'Pending'
                    "#,
                )
                .bind(now)
                .bind(now)
                .bind(&payment_id_str)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected()
                    > 0;

                if paid {
                    sqlx::query(
                        r#"
                        UPDATE invoices
                        SET status = 'Paid', updated_at = ?
                        WHERE payment_id = ?
                        "#,
                    )
                    .bind(now)
                    .bind(&payment_id_str)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                    if let Some((receipt, settlement)) = settlement {
                        sqlx::query(
                            r#"
                            INSERT INTO receipts (id, payment_id, reference, issued_at)
                            VALUES (?, ?, ?, ?)
                            "#,
                        )
                        .bind(receipt.id.to_string())
                        .bind(receipt.payment_id.to_string())
                        .bind(&receipt.reference)
                        .bind(receipt.issued_at.naive_utc())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                        sqlx::query(
                            r#"
                            INSERT INTO settlements (
                                id, period, gross_cents, fees_cents, net_cents, receipt_id, created_at
                            ) VALUES (?, ?, ?, ?, ?, ?, ?)
                            "#,
                        )
                        .bind(settlement.id.to_string())
                        .bind(&settlement.period)
                        .bind(settlement.gross_cents)
                        .bind(settlement.fees_cents)
                        .bind(settlement.net_cents)
                        .bind(settlement.receipt_id.to_string())
                        .bind(settlement.created_at.naive_utc())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                    }
                }
            }
            WebhookOutcome::Failed => {
                sqlx::query(
                    r#"
                    UPDATE payment_intents
                    SET status = 'Failed', updated_at = ?
                    WHERE id = ? AND status != 'Succeeded'
                    "#,
                )
                .bind(now)
                .bind(intent_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

                let failed = sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = 'Failed',
                        description = CASE
                            WHEN ? IS NULL THEN description
                            ELSE description || ' (failed: ' || ? || ')'
                        END,
                        updated_at = ?
                    WHERE id = ? AND status = 'Pending'
                    "#,
                )
                .bind(failure_reason)
                .bind(failure_reason)
                .bind(now)
                .bind(&payment_id_str)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected()
                    > 0;

                // Only a payment that actually failed reopens its invoice,
                // so a settled invoice is never reverted.
                if failed {
                    sqlx::query(
                        r#"
                        UPDATE invoices
                        SET status = 'Open', notes = COALESCE(?, notes), updated_at = ?
                        WHERE payment_id = ?
                        "#,
                    )
                    .bind(invoice_note)
                    .bind(now)
                    .bind(&payment_id_str)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                }
            }
        }

        tx.commit().await.map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn expire_open_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payment_sessions
            SET status = 'Expired'
            WHERE status = 'Open' AND expires_at < ?
            "#,
        )
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn receipts_for_payment(&self, payment_id: Uuid) -> Result<Vec<Receipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            r#"
            SELECT id, payment_id, reference, issued_at
            FROM receipts
            WHERE payment_id = ?
            ORDER BY issued_at
            "#,
        )
        .bind(payment_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_receipt).collect()
    }

    async fn list_settlements(&self) -> Result<Vec<Settlement>> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r#"
            SELECT id, period, gross_cents, fees_cents, net_cents, receipt_id, created_at
            FROM settlements
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_settlement).collect()
    }
}

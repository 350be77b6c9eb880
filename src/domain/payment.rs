use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An amount owed by a student, optionally tied to an enrollment. All
/// amounts are integer cents. Status only moves Pending -> Paid/Failed;
/// Paid is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub enrollment_id: Option<Uuid>,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
    Cash,
}

/// Billing record attached to one payment; mirrors the payment's status
/// once settlement lands.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Void,
}

/// A checkout attempt for a payment. At most one live (neither succeeded
/// nor canceled) intent exists per payment at a time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub status: IntentStatus,
    pub method: PaymentMethod,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

/// A checkout session tied to one intent, resolved exactly once by a
/// webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentSession {
    pub id: Uuid,
    pub intent_id: Uuid,
    pub status: SessionStatus,
    pub checkout_url: String,
    pub expires_at: DateTime<Utc>,
    pub last_webhook_status: Option<WebhookOutcome>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum SessionStatus {
    Open,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Succeeded,
    Failed,
}

/// Proof of a settled payment, minted once per successful webhook.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Receipt {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub reference: String,
    pub issued_at: DateTime<Utc>,
}

/// Payout record for one settled payment: net = gross - fees.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Settlement {
    pub id: Uuid,
    pub period: String,
    pub gross_cents: i64,
    pub fees_cents: i64,
    pub net_cents: i64,
    pub receipt_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Billing-gate classification of an enrollment's most recent payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Paid,
    Pending,
    Overdue,
}

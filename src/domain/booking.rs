use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student's claim on one concrete session. Consumes weekly quota;
/// `week_start` is always the Monday 00:00 UTC of the session's week.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionBooking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub session_id: Uuid,
    pub week_start: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

/// A manual weekly-quota credit, granted by an instructor to hand back a
/// missed or cancelled slot. Append-only; never reconciled against a
/// specific prior booking.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditReinstatement {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_start: DateTime<Utc>,
    pub amount: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How much of the weekly allowance a student has used for one week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyUsage {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    pub week_start: DateTime<Utc>,
}

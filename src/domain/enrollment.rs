use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BillingStatus, Student};

/// A student's claim on a recurring class. At most one non-cancelled
/// enrollment exists per (student, class); cancellation is a soft delete so
/// payments keep a valid reference.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Waitlist,
    Cancelled,
}

/// A recorded check-in against an enrollment, optionally tied to the
/// session the student walked into.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub session_id: Option<Uuid>,
    pub checked_in_at: DateTime<Utc>,
}

/// One line of the per-class roster instructors and students see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub enrollment: Enrollment,
    pub student: Student,
    pub attendance: Option<Attendance>,
    pub payment_status: BillingStatus,
    pub payment_label: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring class offering. The capacity here is what enrollment is
/// checked against; individual sessions may override it for one-off venues.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingClass {
    pub id: Uuid,
    pub name: String,
    pub capacity: i64,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One concrete occurrence of a class.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClassSession {
    pub id: Uuid,
    pub class_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClassRequest {
    pub name: String,
    pub capacity: i64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub location: Option<String>,
}

/// Seat usage for one class: `available` never goes negative even when
/// admin overrides push active enrollments past capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityUsage {
    pub active: i64,
    pub capacity: i64,
    pub available: i64,
}

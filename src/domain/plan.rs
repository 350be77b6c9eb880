use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subscription tier in the catalog: how many sessions a week it entitles
/// the student to, over how many months, at which price.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlanOption {
    pub id: Uuid,
    pub name: String,
    pub weekly_classes: i64,
    pub duration_months: i64,
    pub price_monthly_cents: i64,
    pub price_upfront_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A student's chosen instance of a plan option. At most one active plan
/// per student; assigning a new one expires the previous.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentPlan {
    pub id: Uuid,
    pub student_id: Uuid,
    pub plan_option_id: Uuid,
    pub billing: PlanBilling,
    pub status: PlanStatus,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum PlanBilling {
    Upfront,
    Recurring,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum PlanStatus {
    Active,
    Expired,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanOptionRequest {
    pub name: String,
    pub weekly_classes: i64,
    pub duration_months: i64,
    pub price_monthly_cents: i64,
    pub price_upfront_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPlanRequest {
    pub plan_option_id: Uuid,
    pub billing: PlanBilling,
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{
        AssignPlanRequest, CreditReinstatement, Payment, PaymentMethod, PlanStatus,
        ResolveStudentRequest, Student, StudentPlan, WeeklyUsage,
    },
    error::{AppError, Result},
};

/// Identity-resolver seam: maps the provider subject to a student record,
/// creating one on first contact.
pub async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveStudentRequest>,
) -> Result<Json<Student>> {
    let ctx = &state.service_context;

    if let Some(existing) = ctx.student_repo.find_by_subject(&request.subject).await? {
        return Ok(Json(existing));
    }

    let student = ctx.student_repo.create(request).await?;
    Ok(Json(student))
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>> {
    let students = state
        .service_context
        .student_repo
        .list(params.limit.unwrap_or(50), params.offset.unwrap_or(0))
        .await?;
    Ok(Json(students))
}

#[derive(Deserialize)]
pub struct WeeklyUsageParams {
    pub date: Option<DateTime<Utc>>,
}

pub async fn weekly_usage(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Query(params): Query<WeeklyUsageParams>,
) -> Result<Json<WeeklyUsage>> {
    let reference = params.date.unwrap_or_else(Utc::now);
    let usage = state
        .service_context
        .quota_service
        .weekly_usage(student_id, reference)
        .await?;
    Ok(Json(usage))
}

pub async fn outstanding(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>> {
    let payments = state
        .service_context
        .payment_service
        .outstanding_for_student(student_id)
        .await?;
    Ok(Json(payments))
}

#[derive(Deserialize)]
pub struct ReinstateRequest {
    pub week_start: DateTime<Utc>,
    pub amount: i64,
    pub note: Option<String>,
}

pub async fn reinstate(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<ReinstateRequest>,
) -> Result<Json<CreditReinstatement>> {
    let credit = state
        .service_context
        .quota_service
        .reinstate_for_week(student_id, request.week_start, request.amount, request.note)
        .await?;
    Ok(Json(credit))
}

pub async fn assign_plan(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<AssignPlanRequest>,
) -> Result<Json<StudentPlan>> {
    let ctx = &state.service_context;

    ctx.student_repo.find_by_id(student_id).await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
    ctx.plan_repo.find_option(request.plan_option_id).await?
        .ok_or_else(|| AppError::NotFound("Plan option not found".to_string()))?;

    let now = Utc::now();
    let plan = StudentPlan {
        id: Uuid::new_v4(),
        student_id,
        plan_option_id: request.plan_option_id,
        billing: request.billing,
        status: PlanStatus::Active,
        started_at: now,
        created_at: now,
        updated_at: now,
    };

    let plan = ctx.plan_repo.assign_plan(plan).await?;
    Ok(Json(plan))
}

#[derive(Deserialize)]
pub struct ChargeRequest {
    pub amount_cents: i64,
    pub description: String,
    pub method: Option<PaymentMethod>,
}

/// One-off charge; settles immediately only for card payments.
pub async fn charge(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<Payment>> {
    let method = request.method.unwrap_or(PaymentMethod::CreditCard);
    let payment = state
        .service_context
        .payment_service
        .create_one_time_payment(student_id, request.amount_cents, method, request.description)
        .await?;
    Ok(Json(payment))
}

#[derive(Deserialize)]
pub struct StoredCardChargeRequest {
    pub amount_cents: i64,
    pub description: String,
}

/// Direct on-file card charge that bypasses the checkout pipeline.
pub async fn charge_stored_card(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<StoredCardChargeRequest>,
) -> Result<Json<Payment>> {
    let payment = state
        .service_context
        .payment_service
        .charge_stored_card(student_id, request.amount_cents, request.description)
        .await?;
    Ok(Json(payment))
}
